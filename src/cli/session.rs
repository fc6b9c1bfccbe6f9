use serde_json::json;

use crate::clock::{Clock, SystemClock};
use crate::db::connection;
use crate::engine::{calendar, RecoveryReconciler, SessionEngine, StartSession};
use crate::error::PomoError;
use crate::models::{PageRequest, SessionType};
use crate::output;

use super::commands::SessionCommands;
use super::{emit, finish, resolve_account, Ctx};

pub fn run(cmd: SessionCommands, ctx: Ctx<'_>) -> i32 {
    let result = match cmd {
        SessionCommands::Start {
            task,
            session_type,
            duration_sec,
            started_at,
        } => run_start(task, &session_type, duration_sec, started_at.as_deref(), ctx),
        SessionCommands::Complete { id, ended_at } => run_complete(&id, ended_at.as_deref(), ctx),
        SessionCommands::Cancel { id } => run_cancel(&id, ctx),
        SessionCommands::Active => run_active(ctx),
        SessionCommands::Recover => run_recover(ctx),
        SessionCommands::List {
            from,
            to,
            page,
            page_size,
        } => run_list(from.as_deref(), to.as_deref(), page, page_size, ctx),
    };
    finish(result, ctx.json)
}

fn run_start(
    task: Option<String>,
    session_type: &str,
    duration_sec: Option<i64>,
    started_at: Option<&str>,
    ctx: Ctx<'_>,
) -> Result<i32, PomoError> {
    let session_type = SessionType::from_str(session_type).ok_or_else(|| {
        PomoError::validation(format!(
            "Invalid session type '{session_type}'. Use: focus, short_break, long_break"
        ))
    })?;
    let req = StartSession {
        task_id: task,
        session_type,
        duration_sec,
        started_at: started_at.map(calendar::parse_timestamp).transpose()?,
    };

    let conn = connection::open_db()?;
    let account = resolve_account(&conn, ctx.account)?;
    let session = SessionEngine::new(&conn, &SystemClock).start(&account.id, req)?;

    emit(ctx, json!({ "session": output::json::record(&session) }), || {
        println!(
            "Started {} session ({}) for {}s",
            session.session_type.as_str(),
            session.id,
            session.duration_sec
        );
    });
    Ok(0)
}

fn run_complete(reference: &str, ended_at: Option<&str>, ctx: Ctx<'_>) -> Result<i32, PomoError> {
    let ended_at = ended_at.map(calendar::parse_timestamp).transpose()?;

    let conn = connection::open_db()?;
    let account = resolve_account(&conn, ctx.account)?;
    let completed = SessionEngine::new(&conn, &SystemClock).complete(&account.id, reference, ended_at)?;

    emit(ctx, output::json::completed_session(&completed), || {
        println!("Completed session: {}", completed.session.id);
        if let Some(ref task) = completed.task {
            println!(
                "  {}: {}/{} pomodoros",
                task.title, task.completed_pomodoros, task.estimate_pomodoros
            );
        }
    });
    Ok(0)
}

fn run_cancel(reference: &str, ctx: Ctx<'_>) -> Result<i32, PomoError> {
    let conn = connection::open_db()?;
    let account = resolve_account(&conn, ctx.account)?;
    let session = SessionEngine::new(&conn, &SystemClock).cancel(&account.id, reference)?;

    emit(ctx, json!({ "session": output::json::record(&session) }), || {
        println!("Cancelled session: {}", session.id);
    });
    Ok(0)
}

fn run_active(ctx: Ctx<'_>) -> Result<i32, PomoError> {
    let conn = connection::open_db()?;
    let account = resolve_account(&conn, ctx.account)?;
    let session = SessionEngine::new(&conn, &SystemClock).active(&account.id)?;

    emit(
        ctx,
        json!({ "session": session.as_ref().map(output::json::record) }),
        || match session {
            Some(ref s) => output::text::print_session(s),
            None => println!("No session in progress."),
        },
    );
    Ok(0)
}

fn run_recover(ctx: Ctx<'_>) -> Result<i32, PomoError> {
    let conn = connection::open_db()?;
    let account = resolve_account(&conn, ctx.account)?;
    let report = RecoveryReconciler::new(&conn, &SystemClock).reset(&account.id)?;

    emit(ctx, output::json::record(&report), || {
        output::text::print_recovery(&report);
    });
    Ok(0)
}

fn run_list(
    from: Option<&str>,
    to: Option<&str>,
    page: i64,
    page_size: i64,
    ctx: Ctx<'_>,
) -> Result<i32, PomoError> {
    let page = PageRequest::new(page, page_size)?;
    let conn = connection::open_db()?;
    let account = resolve_account(&conn, ctx.account)?;

    let from = match from {
        Some(s) => calendar::parse_date(s)?,
        None => calendar::local_date(SystemClock.now(), account.tz()?),
    };
    let to = match to {
        Some(s) => calendar::parse_date(s)?,
        None => from + chrono::Days::new(1),
    };
    let sessions = SessionEngine::new(&conn, &SystemClock).list(&account, from, to, page)?;

    emit(ctx, output::json::record(&sessions), || {
        output::text::print_session_list(&sessions);
    });
    Ok(0)
}
