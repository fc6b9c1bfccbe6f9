pub mod account;
pub mod commands;
pub mod init;
pub mod session;
pub mod settings;
pub mod stats;
pub mod sync;
pub mod task;

pub use commands::*;

use rusqlite::Connection;
use serde_json::Value;

use crate::config::AppConfig;
use crate::db::account_repo;
use crate::error::PomoError;
use crate::models::Account;
use crate::output;

/// Flags shared by every subcommand.
#[derive(Debug, Clone, Copy)]
pub struct Ctx<'a> {
    pub json: bool,
    pub account: Option<&'a str>,
}

/// Account to act as: `--account` if given, otherwise the active one from
/// config. A configured ID that no longer exists is reported as not found.
pub fn resolve_account(conn: &Connection, account_flag: Option<&str>) -> Result<Account, PomoError> {
    if let Some(reference) = account_flag {
        return account_repo::resolve_account(conn, reference);
    }
    let id = AppConfig::load()?
        .active_account_id
        .ok_or_else(PomoError::no_active_account)?;
    account_repo::get_account_by_id(conn, &id)
}

/// Print the success envelope in JSON mode, or run `text` otherwise.
pub fn emit(ctx: Ctx<'_>, data: Value, text: impl FnOnce()) {
    if ctx.json {
        output::json::print(&output::json::success(data));
    } else {
        text();
    }
}

/// Turn a command result into an exit code, printing the error envelope on
/// failure. Conflicts exit with 2.
pub fn finish(result: Result<i32, PomoError>, json_output: bool) -> i32 {
    match result {
        Ok(code) => code,
        Err(e) => {
            if json_output {
                output::json::print(&output::json::error(&e));
            } else {
                eprintln!("Error: {}", e.message);
            }
            if e.code.is_conflict() {
                2
            } else {
                1
            }
        }
    }
}
