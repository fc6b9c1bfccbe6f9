use serde_json::json;

use crate::clock::SystemClock;
use crate::db::connection;
use crate::engine::{calendar, TaskFilter, TaskStore};
use crate::error::PomoError;
use crate::models::{NewTask, PageRequest, TaskPatch, TaskPriority, TaskStatus};
use crate::output;

use super::commands::TaskCommands;
use super::{emit, finish, resolve_account, Ctx};

pub fn run(cmd: TaskCommands, ctx: Ctx<'_>) -> i32 {
    let result = match cmd {
        TaskCommands::Add {
            title,
            description,
            priority,
            planned_date,
            estimate,
        } => run_add(title, description, &priority, planned_date.as_deref(), estimate, ctx),
        TaskCommands::List {
            filter,
            page,
            page_size,
        } => run_list(&filter, page, page_size, ctx),
        TaskCommands::Show { id } => run_show(&id, ctx),
        TaskCommands::Update {
            id,
            expected_version,
            title,
            description,
            clear_description,
            priority,
            status,
            planned_date,
            clear_planned_date,
            estimate,
            completed_pomodoros,
        } => build_patch(
            title,
            description,
            clear_description,
            priority.as_deref(),
            status.as_deref(),
            planned_date.as_deref(),
            clear_planned_date,
            estimate,
            completed_pomodoros,
        )
        .and_then(|patch| run_update(&id, expected_version, &patch, ctx)),
        TaskCommands::Delete { id } => run_delete(&id, ctx),
    };
    finish(result, ctx.json)
}

fn parse_priority(s: &str) -> Result<TaskPriority, PomoError> {
    TaskPriority::from_str(s).ok_or_else(|| {
        PomoError::validation(format!("Invalid priority '{s}'. Use: low, medium, high"))
    })
}

fn parse_status(s: &str) -> Result<TaskStatus, PomoError> {
    TaskStatus::from_str(s).ok_or_else(|| {
        PomoError::validation(format!("Invalid status '{s}'. Use: todo, in_progress, done"))
    })
}

fn run_add(
    title: String,
    description: Option<String>,
    priority: &str,
    planned_date: Option<&str>,
    estimate: i64,
    ctx: Ctx<'_>,
) -> Result<i32, PomoError> {
    let new = NewTask {
        title,
        description,
        priority: parse_priority(priority)?,
        planned_date: planned_date.map(calendar::parse_date).transpose()?,
        estimate_pomodoros: estimate,
    };

    let conn = connection::open_db()?;
    let account = resolve_account(&conn, ctx.account)?;
    let task = TaskStore::new(&conn, &SystemClock).create(&account.id, new)?;

    emit(ctx, json!({ "task": output::json::record(&task) }), || {
        println!("Added task: {} ({})", task.title, task.id);
    });
    Ok(0)
}

fn run_list(filter: &str, page: i64, page_size: i64, ctx: Ctx<'_>) -> Result<i32, PomoError> {
    let filter = TaskFilter::from_str(filter).ok_or_else(|| {
        PomoError::validation(format!(
            "Invalid filter '{filter}'. Use: all, today, tomorrow, completed"
        ))
    })?;
    let page = PageRequest::new(page, page_size)?;

    let conn = connection::open_db()?;
    let account = resolve_account(&conn, ctx.account)?;
    let tasks = TaskStore::new(&conn, &SystemClock).list(&account, filter, page)?;

    emit(ctx, output::json::record(&tasks), || {
        output::text::print_task_list(&tasks);
    });
    Ok(0)
}

fn run_show(reference: &str, ctx: Ctx<'_>) -> Result<i32, PomoError> {
    let conn = connection::open_db()?;
    let account = resolve_account(&conn, ctx.account)?;
    let task = TaskStore::new(&conn, &SystemClock).get(&account.id, reference)?;

    emit(ctx, json!({ "task": output::json::record(&task) }), || {
        output::text::print_task(&task);
    });
    Ok(0)
}

#[allow(clippy::too_many_arguments)]
fn build_patch(
    title: Option<String>,
    description: Option<String>,
    clear_description: bool,
    priority: Option<&str>,
    status: Option<&str>,
    planned_date: Option<&str>,
    clear_planned_date: bool,
    estimate: Option<i64>,
    completed_pomodoros: Option<i64>,
) -> Result<TaskPatch, PomoError> {
    let description = if clear_description {
        Some(None)
    } else {
        description.map(Some)
    };
    let planned_date = if clear_planned_date {
        Some(None)
    } else {
        planned_date
            .map(calendar::parse_date)
            .transpose()?
            .map(Some)
    };
    Ok(TaskPatch {
        title,
        description,
        priority: priority.map(parse_priority).transpose()?,
        status: status.map(parse_status).transpose()?,
        planned_date,
        estimate_pomodoros: estimate,
        completed_pomodoros,
    })
}

fn run_update(
    reference: &str,
    expected_version: i64,
    patch: &TaskPatch,
    ctx: Ctx<'_>,
) -> Result<i32, PomoError> {
    let conn = connection::open_db()?;
    let account = resolve_account(&conn, ctx.account)?;
    let store = TaskStore::new(&conn, &SystemClock);
    let id = store.get(&account.id, reference)?.id;
    let task = store
        .update(&account.id, &id, expected_version, patch)?
        .into_result(reference)?;

    emit(ctx, json!({ "task": output::json::record(&task) }), || {
        println!("Updated task: {} ({}) -> v{}", task.title, task.id, task.version);
    });
    Ok(0)
}

fn run_delete(reference: &str, ctx: Ctx<'_>) -> Result<i32, PomoError> {
    let conn = connection::open_db()?;
    let account = resolve_account(&conn, ctx.account)?;
    let store = TaskStore::new(&conn, &SystemClock);
    let id = store.get(&account.id, reference)?.id;
    let deleted = store.delete(&account.id, &id)?;

    emit(ctx, output::json::deleted_task(&deleted), || {
        println!(
            "Deleted task: {} ({}), {} session(s) removed",
            deleted.task.title, deleted.task.id, deleted.sessions_removed
        );
    });
    Ok(0)
}
