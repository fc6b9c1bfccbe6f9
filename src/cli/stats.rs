use crate::clock::{Clock, SystemClock};
use crate::db::connection;
use crate::engine::{calendar, StatsAggregator};
use crate::error::PomoError;
use crate::output;

use super::commands::StatsCommands;
use super::{emit, finish, resolve_account, Ctx};

pub fn run(cmd: StatsCommands, ctx: Ctx<'_>) -> i32 {
    let result = match cmd {
        StatsCommands::Daily { date } => run_daily(date.as_deref(), ctx),
        StatsCommands::Weekly { start } => run_weekly(start.as_deref(), ctx),
    };
    finish(result, ctx.json)
}

fn run_daily(date: Option<&str>, ctx: Ctx<'_>) -> Result<i32, PomoError> {
    let conn = connection::open_db()?;
    let account = resolve_account(&conn, ctx.account)?;
    let tz = account.tz()?;
    let date = match date {
        Some(s) => calendar::parse_date(s)?,
        None => calendar::local_date(SystemClock.now(), tz),
    };
    let stats = StatsAggregator::new(&conn).daily(&account.id, date, tz)?;

    emit(ctx, output::json::record(&stats), || {
        output::text::print_daily(&stats);
    });
    Ok(0)
}

fn run_weekly(start: Option<&str>, ctx: Ctx<'_>) -> Result<i32, PomoError> {
    let conn = connection::open_db()?;
    let account = resolve_account(&conn, ctx.account)?;
    let tz = account.tz()?;
    let start = match start {
        Some(s) => calendar::parse_date(s)?,
        None => calendar::local_date(SystemClock.now(), tz) - chrono::Days::new(6),
    };
    let stats = StatsAggregator::new(&conn).weekly(&account.id, start, tz)?;

    emit(ctx, output::json::record(&stats), || {
        output::text::print_weekly(&stats);
    });
    Ok(0)
}
