use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::db::convert;
use crate::error::PomoError;
use crate::models::{CancelledBy, Session, SessionState, SessionStatus, SessionType};

const COLUMNS: &str = "id, owner_id, task_id, session_type, duration_sec,
                       started_at_ms, ended_at_ms, status, cancelled_by";

pub fn insert_session(conn: &Connection, session: &Session) -> Result<(), PomoError> {
    conn.execute(
        &format!("INSERT INTO sessions ({COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"),
        params![
            session.id,
            session.owner_id,
            session.task_id,
            session.session_type.as_str(),
            session.duration_sec,
            convert::to_ms(session.started_at),
            session.state.ended_at().map(convert::to_ms),
            session.state.status().as_str(),
            session.state.cancelled_by().map(|by| by.as_str()),
        ],
    )?;
    Ok(())
}

pub fn find_session(conn: &Connection, owner_id: &str, id: &str) -> Result<Option<Session>, PomoError> {
    let session = conn
        .query_row(
            &format!("SELECT {COLUMNS} FROM sessions WHERE owner_id = ?1 AND id = ?2"),
            params![owner_id, id],
            row_to_session,
        )
        .optional()?;
    Ok(session)
}

/// Resolve session by exact ID or unique ID prefix within an owner.
pub fn resolve_session(conn: &Connection, owner_id: &str, reference: &str) -> Result<Session, PomoError> {
    if let Some(session) = find_session(conn, owner_id, reference)? {
        return Ok(session);
    }

    let mut stmt = conn.prepare(&format!(
        "SELECT {COLUMNS} FROM sessions WHERE owner_id = ?1 AND id LIKE ?2 ESCAPE '\\'"
    ))?;
    let mut sessions: Vec<Session> = stmt
        .query_map(params![owner_id, convert::like_prefix(reference)], row_to_session)?
        .collect::<Result<Vec<_>, _>>()?;

    match sessions.len() {
        0 => Err(PomoError::session_not_found(reference)),
        1 => Ok(sessions.remove(0)),
        _ => {
            let candidates: Vec<String> = sessions
                .iter()
                .map(|s| format!("{} ({})", s.session_type.as_str(), s.id))
                .collect();
            Err(PomoError::ambiguous_ref(reference, &candidates))
        }
    }
}

pub fn active_session(conn: &Connection, owner_id: &str) -> Result<Option<Session>, PomoError> {
    let session = conn
        .query_row(
            &format!("SELECT {COLUMNS} FROM sessions WHERE owner_id = ?1 AND status = 'in_progress'"),
            params![owner_id],
            row_to_session,
        )
        .optional()?;
    Ok(session)
}

/// Persist a terminal state, but only while the stored row is still
/// in_progress. Returns 0 when another writer finalized it first.
pub fn finalize_session(conn: &Connection, session: &Session) -> Result<usize, PomoError> {
    let changed = conn.execute(
        "UPDATE sessions SET status = ?1, ended_at_ms = ?2, cancelled_by = ?3
         WHERE id = ?4 AND owner_id = ?5 AND status = 'in_progress'",
        params![
            session.state.status().as_str(),
            session.state.ended_at().map(convert::to_ms),
            session.state.cancelled_by().map(|by| by.as_str()),
            session.id,
            session.owner_id,
        ],
    )?;
    Ok(changed)
}

/// Cancel every in_progress session of an owner in one statement.
pub fn cancel_all_in_progress(
    conn: &Connection,
    owner_id: &str,
    by: CancelledBy,
    now: DateTime<Utc>,
) -> Result<usize, PomoError> {
    let changed = conn.execute(
        "UPDATE sessions SET status = 'cancelled', cancelled_by = ?1, ended_at_ms = ?2
         WHERE owner_id = ?3 AND status = 'in_progress'",
        params![by.as_str(), convert::to_ms(now), owner_id],
    )?;
    Ok(changed)
}

pub fn delete_sessions_for_task(conn: &Connection, owner_id: &str, task_id: &str) -> Result<usize, PomoError> {
    let changed = conn.execute(
        "DELETE FROM sessions WHERE owner_id = ?1 AND task_id = ?2",
        params![owner_id, task_id],
    )?;
    Ok(changed)
}

pub fn count_sessions_for_task(conn: &Connection, owner_id: &str, task_id: &str) -> Result<i64, PomoError> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM sessions WHERE owner_id = ?1 AND task_id = ?2",
        params![owner_id, task_id],
        |row| row.get(0),
    )?;
    Ok(count)
}

/// Sessions started within [start, end), newest first.
pub fn list_sessions_started_between(
    conn: &Connection,
    owner_id: &str,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    limit: i64,
    offset: i64,
) -> Result<Vec<Session>, PomoError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {COLUMNS} FROM sessions
         WHERE owner_id = ?1 AND started_at_ms >= ?2 AND started_at_ms < ?3
         ORDER BY started_at_ms DESC, id DESC
         LIMIT ?4 OFFSET ?5"
    ))?;
    let sessions = stmt
        .query_map(
            params![owner_id, convert::to_ms(start), convert::to_ms(end), limit, offset],
            row_to_session,
        )?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(sessions)
}

pub fn count_sessions_started_between(
    conn: &Connection,
    owner_id: &str,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<i64, PomoError> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM sessions
         WHERE owner_id = ?1 AND started_at_ms >= ?2 AND started_at_ms < ?3",
        params![owner_id, convert::to_ms(start), convert::to_ms(end)],
        |row| row.get(0),
    )?;
    Ok(count)
}

/// (endedAt, durationSec) of completed focus sessions that ended within
/// [start, end).
pub fn completed_focus_between(
    conn: &Connection,
    owner_id: &str,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<Vec<(DateTime<Utc>, i64)>, PomoError> {
    completed_focus_where(conn, owner_id, "ended_at_ms >= ?2 AND ended_at_ms < ?3", start, end)
}

/// Like [`completed_focus_between`] but over (start, end]: a session ending
/// exactly on a boundary belongs to the interval it ran in.
pub fn completed_focus_ending_within(
    conn: &Connection,
    owner_id: &str,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<Vec<(DateTime<Utc>, i64)>, PomoError> {
    completed_focus_where(conn, owner_id, "ended_at_ms > ?2 AND ended_at_ms <= ?3", start, end)
}

fn completed_focus_where(
    conn: &Connection,
    owner_id: &str,
    range: &str,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<Vec<(DateTime<Utc>, i64)>, PomoError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT ended_at_ms, duration_sec FROM sessions
         WHERE owner_id = ?1 AND status = 'completed' AND session_type = 'focus'
           AND {range}
         ORDER BY ended_at_ms ASC"
    ))?;
    let rows = stmt
        .query_map(
            params![owner_id, convert::to_ms(start), convert::to_ms(end)],
            |row| Ok((convert::get_ts(row, 0)?, row.get::<_, i64>(1)?)),
        )?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn row_to_session(row: &rusqlite::Row) -> rusqlite::Result<Session> {
    let session_type: String = row.get(3)?;
    let status: String = row.get(7)?;
    let cancelled_by: Option<String> = row.get(8)?;

    let status = SessionStatus::from_str(&status).ok_or_else(|| convert::bad_value(7, &status))?;
    let cancelled_by = cancelled_by
        .map(|s| CancelledBy::from_str(&s).ok_or_else(|| convert::bad_value(8, &s)))
        .transpose()?;
    let ended_at = convert::get_ts_opt(row, 6)?;
    let state = SessionState::from_parts(status, ended_at, cancelled_by)
        .ok_or_else(|| convert::bad_value(7, status.as_str()))?;

    Ok(Session {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        task_id: row.get(2)?,
        session_type: SessionType::from_str(&session_type)
            .ok_or_else(|| convert::bad_value(3, &session_type))?,
        duration_sec: row.get(4)?,
        started_at: convert::get_ts(row, 5)?,
        state,
    })
}
