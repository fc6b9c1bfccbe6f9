use clap::Parser;
use std::process;

use pomotask::cli::commands::{Cli, Commands};
use pomotask::cli::{self, Ctx};
use pomotask::logging;

fn main() {
    let cli_args = Cli::parse();
    logging::init();

    let ctx = Ctx {
        json: cli_args.json,
        account: cli_args.account.as_deref(),
    };

    let exit_code = match cli_args.command {
        Commands::Init => cli::init::run(ctx),
        Commands::Account(cmd) => cli::account::run(cmd, ctx),
        Commands::Task(cmd) => cli::task::run(cmd, ctx),
        Commands::Session(cmd) => cli::session::run(cmd, ctx),
        Commands::Stats(cmd) => cli::stats::run(cmd, ctx),
        Commands::Settings(cmd) => cli::settings::run(cmd, ctx),
        Commands::Sync(cmd) => cli::sync::run(cmd, ctx),
    };

    process::exit(exit_code);
}
