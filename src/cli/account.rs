use serde_json::json;

use crate::clock::{Clock, SystemClock};
use crate::config::AppConfig;
use crate::db::{account_repo, connection};
use crate::error::PomoError;
use crate::models::parse_timezone;
use crate::output;

use super::commands::AccountCommands;
use super::{emit, finish, resolve_account, Ctx};

pub fn run(cmd: AccountCommands, ctx: Ctx<'_>) -> i32 {
    let result = match cmd {
        AccountCommands::Create { name, timezone } => run_create(&name, &timezone, ctx),
        AccountCommands::List => run_list(ctx),
        AccountCommands::Use { reference } => run_use(&reference, ctx),
        AccountCommands::Show { reference } => run_show(reference.as_deref(), ctx),
    };
    finish(result, ctx.json)
}

fn run_create(name: &str, timezone: &str, ctx: Ctx<'_>) -> Result<i32, PomoError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(PomoError::validation("account name must not be empty"));
    }
    parse_timezone(timezone)?;

    let conn = connection::open_db()?;
    let id = ulid::Ulid::new().to_string();
    let account = account_repo::create_account(&conn, &id, name, timezone, SystemClock.now())?;

    // The first account becomes active so the other commands work right away.
    let mut config = AppConfig::load()?;
    let activated = config.active_account_id.is_none();
    if activated {
        config.active_account_id = Some(account.id.clone());
        config.save()?;
    }
    tracing::info!(account_id = %account.id, activated, "account created");

    emit(
        ctx,
        json!({ "account": output::json::record(&account), "active": activated }),
        || {
            println!("Created account: {} ({})", account.name, account.id);
            if activated {
                println!("Active account set to: {}", account.name);
            }
        },
    );
    Ok(0)
}

fn run_list(ctx: Ctx<'_>) -> Result<i32, PomoError> {
    let conn = connection::open_db()?;
    let accounts = account_repo::list_accounts(&conn)?;
    let config = AppConfig::load()?;
    let active_id = config.active_account_id.as_deref();

    let items: Vec<_> = accounts
        .iter()
        .map(|a| {
            let mut v = output::json::record(a);
            v["active"] = json!(active_id == Some(a.id.as_str()));
            v
        })
        .collect();
    emit(ctx, json!({ "accounts": items }), || {
        output::text::print_account_list(&accounts, active_id);
    });
    Ok(0)
}

fn run_use(reference: &str, ctx: Ctx<'_>) -> Result<i32, PomoError> {
    let conn = connection::open_db()?;
    let account = account_repo::resolve_account(&conn, reference)?;
    let mut config = AppConfig::load()?;
    config.active_account_id = Some(account.id.clone());
    config.save()?;

    emit(ctx, json!({ "active_account": output::json::record(&account) }), || {
        println!("Active account: {} ({})", account.name, account.id);
    });
    Ok(0)
}

fn run_show(reference: Option<&str>, ctx: Ctx<'_>) -> Result<i32, PomoError> {
    let conn = connection::open_db()?;
    let account = resolve_account(&conn, reference.or(ctx.account))?;
    let active = AppConfig::load()?.active_account_id.as_deref() == Some(account.id.as_str());

    emit(
        ctx,
        json!({ "account": output::json::record(&account), "active": active }),
        || output::text::print_account(&account, active),
    );
    Ok(0)
}
