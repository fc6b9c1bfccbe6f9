use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::db::convert;
use crate::error::PomoError;
use crate::models::{Task, TaskPriority, TaskStatus};

const COLUMNS: &str = "id, owner_id, title, description, priority, status, planned_date,
                       estimate_pomodoros, completed_pomodoros, version,
                       completed_at_ms, created_at_ms, updated_at_ms";

/// Row filter for task listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskSelection {
    All,
    /// Not done and planned for the given local date.
    PlannedOn(NaiveDate),
    Completed,
}

impl TaskSelection {
    fn where_clause(&self) -> &'static str {
        match self {
            Self::All => "owner_id = ?1",
            Self::PlannedOn(_) => "owner_id = ?1 AND planned_date = ?2 AND status != 'done'",
            Self::Completed => "owner_id = ?1 AND status = 'done'",
        }
    }

    fn date_param(&self) -> Option<NaiveDate> {
        match self {
            Self::PlannedOn(date) => Some(*date),
            Self::All | Self::Completed => None,
        }
    }
}

pub fn insert_task(conn: &Connection, task: &Task) -> Result<(), PomoError> {
    conn.execute(
        &format!("INSERT INTO tasks ({COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)"),
        params![
            task.id,
            task.owner_id,
            task.title,
            task.description,
            task.priority.as_str(),
            task.status.as_str(),
            task.planned_date,
            task.estimate_pomodoros,
            task.completed_pomodoros,
            task.version,
            task.completed_at.map(convert::to_ms),
            convert::to_ms(task.created_at),
            convert::to_ms(task.updated_at),
        ],
    )?;
    Ok(())
}

pub fn find_task(conn: &Connection, owner_id: &str, id: &str) -> Result<Option<Task>, PomoError> {
    let task = conn
        .query_row(
            &format!("SELECT {COLUMNS} FROM tasks WHERE owner_id = ?1 AND id = ?2"),
            params![owner_id, id],
            row_to_task,
        )
        .optional()?;
    Ok(task)
}

pub fn get_task_by_id(conn: &Connection, owner_id: &str, id: &str) -> Result<Task, PomoError> {
    find_task(conn, owner_id, id)?.ok_or_else(|| PomoError::task_not_found(id))
}

/// Resolve task by exact ID or unique ID prefix within an owner.
pub fn resolve_task(conn: &Connection, owner_id: &str, reference: &str) -> Result<Task, PomoError> {
    if let Some(task) = find_task(conn, owner_id, reference)? {
        return Ok(task);
    }

    let mut stmt = conn.prepare(&format!(
        "SELECT {COLUMNS} FROM tasks WHERE owner_id = ?1 AND id LIKE ?2 ESCAPE '\\'"
    ))?;
    let prefix = convert::like_prefix(reference);
    let mut tasks: Vec<Task> = stmt
        .query_map(params![owner_id, prefix], row_to_task)?
        .collect::<Result<Vec<_>, _>>()?;

    match tasks.len() {
        0 => Err(PomoError::task_not_found(reference)),
        1 => Ok(tasks.remove(0)),
        _ => {
            let candidates: Vec<String> = tasks.iter().map(|t| format!("{} ({})", t.title, t.id)).collect();
            Err(PomoError::ambiguous_ref(reference, &candidates))
        }
    }
}

/// One page of tasks ordered todo, in_progress, done, then most recently updated first.
pub fn list_tasks(
    conn: &Connection,
    owner_id: &str,
    selection: TaskSelection,
    limit: i64,
    offset: i64,
) -> Result<Vec<Task>, PomoError> {
    // ?2 may be absent from the filter; SQLite sizes parameters by highest index.
    let sql = format!(
        "SELECT {COLUMNS} FROM tasks WHERE {}
         ORDER BY CASE status WHEN 'todo' THEN 0 WHEN 'in_progress' THEN 1 ELSE 2 END ASC,
                  updated_at_ms DESC, id ASC
         LIMIT ?3 OFFSET ?4",
        selection.where_clause()
    );
    let mut stmt = conn.prepare(&sql)?;
    let tasks = stmt
        .query_map(
            params![owner_id, selection.date_param(), limit, offset],
            row_to_task,
        )?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(tasks)
}

pub fn count_tasks(conn: &Connection, owner_id: &str, selection: TaskSelection) -> Result<i64, PomoError> {
    let sql = format!("SELECT COUNT(*) FROM tasks WHERE {}", selection.where_clause());
    let count = match selection.date_param() {
        Some(date) => conn.query_row(&sql, params![owner_id, date], |row| row.get(0))?,
        None => conn.query_row(&sql, params![owner_id], |row| row.get(0))?,
    };
    Ok(count)
}

/// Compare-and-write: stores `next` only if the row still carries
/// `expected_version`. Returns the number of rows written (0 or 1).
pub fn compare_and_write(conn: &Connection, next: &Task, expected_version: i64) -> Result<usize, PomoError> {
    let changed = conn.execute(
        "UPDATE tasks SET
             title = ?1, description = ?2, priority = ?3, status = ?4, planned_date = ?5,
             estimate_pomodoros = ?6, completed_pomodoros = ?7, version = ?8,
             completed_at_ms = ?9, updated_at_ms = ?10
         WHERE id = ?11 AND owner_id = ?12 AND version = ?13",
        params![
            next.title,
            next.description,
            next.priority.as_str(),
            next.status.as_str(),
            next.planned_date,
            next.estimate_pomodoros,
            next.completed_pomodoros,
            next.version,
            next.completed_at.map(convert::to_ms),
            convert::to_ms(next.updated_at),
            next.id,
            next.owner_id,
            expected_version,
        ],
    )?;
    Ok(changed)
}

/// Bump completedPomodoros and version by one, as a focus session completes.
pub fn increment_completed_pomodoros(
    conn: &Connection,
    owner_id: &str,
    id: &str,
    now: DateTime<Utc>,
) -> Result<usize, PomoError> {
    let changed = conn.execute(
        "UPDATE tasks SET
             completed_pomodoros = completed_pomodoros + 1,
             version = version + 1,
             updated_at_ms = MAX(?1, updated_at_ms + 1)
         WHERE id = ?2 AND owner_id = ?3",
        params![convert::to_ms(now), id, owner_id],
    )?;
    Ok(changed)
}

pub fn delete_task(conn: &Connection, owner_id: &str, id: &str) -> Result<usize, PomoError> {
    let changed = conn.execute(
        "DELETE FROM tasks WHERE id = ?1 AND owner_id = ?2",
        params![id, owner_id],
    )?;
    Ok(changed)
}

/// Count tasks that reached done within [start, end).
pub fn count_completed_between(
    conn: &Connection,
    owner_id: &str,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<i64, PomoError> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM tasks
         WHERE owner_id = ?1 AND status = 'done'
           AND completed_at_ms >= ?2 AND completed_at_ms < ?3",
        params![owner_id, convert::to_ms(start), convert::to_ms(end)],
        |row| row.get(0),
    )?;
    Ok(count)
}

fn row_to_task(row: &rusqlite::Row) -> rusqlite::Result<Task> {
    let priority: String = row.get(4)?;
    let status: String = row.get(5)?;
    Ok(Task {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        priority: TaskPriority::from_str(&priority).ok_or_else(|| convert::bad_value(4, &priority))?,
        status: TaskStatus::from_str(&status).ok_or_else(|| convert::bad_value(5, &status))?,
        planned_date: row.get(6)?,
        estimate_pomodoros: row.get(7)?,
        completed_pomodoros: row.get(8)?,
        version: row.get(9)?,
        completed_at: convert::get_ts_opt(row, 10)?,
        created_at: convert::get_ts(row, 11)?,
        updated_at: convert::get_ts(row, 12)?,
    })
}
