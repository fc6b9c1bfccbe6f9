use std::thread;
use std::time::Duration;

use rusqlite::Connection;

use crate::clock::SystemClock;
use crate::config::AppConfig;
use crate::db::connection;
use crate::engine::sync_guard::{self, Fingerprint, PollResult, SyncOutcome, TaskView};
use crate::engine::TaskStore;
use crate::error::PomoError;
use crate::output;

use super::commands::SyncCommands;
use super::{emit, finish, resolve_account, Ctx};

pub fn run(cmd: SyncCommands, ctx: Ctx<'_>) -> i32 {
    let result = match cmd {
        SyncCommands::Check { since } => run_check(since, ctx),
        SyncCommands::Watch {
            interval,
            iterations,
        } => run_watch(interval, iterations, ctx),
    };
    finish(result, ctx.json)
}

fn poll_once(
    conn: &Connection,
    owner_id: &str,
    last: Option<&Fingerprint>,
    view: &mut TaskView,
) -> Result<(PollResult, usize), PomoError> {
    let fetched = TaskStore::new(conn, &SystemClock).all(owner_id)?;
    let count = fetched.len();
    Ok((sync_guard::poll(last, fetched, view), count))
}

fn print_poll_text(result: &PollResult, task_count: usize) {
    match result.outcome {
        SyncOutcome::Baseline => println!("Baseline: {task_count} task(s)"),
        SyncOutcome::Unchanged => println!("Unchanged: {task_count} task(s)"),
        SyncOutcome::Stale(ref notice) => {
            output::text::print_stale_notice(notice);
            println!("Changed: {task_count} task(s)");
        }
    }
    println!("Fingerprint: {}", result.fingerprint);
}

fn run_check(since: Option<String>, ctx: Ctx<'_>) -> Result<i32, PomoError> {
    let conn = connection::open_db()?;
    let account = resolve_account(&conn, ctx.account)?;
    let last = since.map(Fingerprint::from_raw);

    let mut view = TaskView::new();
    let (result, count) = poll_once(&conn, &account.id, last.as_ref(), &mut view)?;
    emit(ctx, output::json::poll_result(&result, count), || {
        print_poll_text(&result, count);
    });
    Ok(0)
}

fn run_watch(interval: Option<u64>, iterations: Option<u64>, ctx: Ctx<'_>) -> Result<i32, PomoError> {
    let interval = match interval {
        Some(secs) => secs,
        None => AppConfig::load()?.poll_interval_secs,
    };
    if interval == 0 {
        return Err(PomoError::validation("interval must be >= 1 second"));
    }
    let conn = connection::open_db()?;
    let account = resolve_account(&conn, ctx.account)?;
    tracing::info!(account_id = %account.id, interval, "watching for task changes");

    let mut view = TaskView::new();
    let mut last: Option<Fingerprint> = None;
    let mut polls = 0u64;
    loop {
        let (result, count) = poll_once(&conn, &account.id, last.as_ref(), &mut view)?;
        if ctx.json {
            // One envelope per line so a consumer can stream them.
            println!("{}", output::json::success(output::json::poll_result(&result, count)));
        } else {
            print_poll_text(&result, count);
        }
        last = Some(result.fingerprint);

        polls += 1;
        if iterations.is_some_and(|n| polls >= n) {
            break;
        }
        thread::sleep(Duration::from_secs(interval));
    }
    Ok(0)
}
