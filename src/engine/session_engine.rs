use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::Connection;

use crate::clock::{self, Clock};
use crate::db::{session_repo, settings_repo, task_repo, UnitOfWork};
use crate::engine::calendar;
use crate::error::PomoError;
use crate::models::{
    Account, CancelledBy, Page, PageRequest, Session, SessionState, SessionType, Task,
};

/// Longest session accepted by `start`: one day.
pub const MAX_DURATION_SEC: i64 = 24 * 60 * 60;

#[derive(Debug, Clone)]
pub struct StartSession {
    /// Full ID or unique prefix of a task owned by the caller.
    pub task_id: Option<String>,
    pub session_type: SessionType,
    /// Defaults to the account's configured length for `session_type`.
    pub duration_sec: Option<i64>,
    /// Defaults to now.
    pub started_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedSession {
    pub session: Session,
    /// The linked task after its counter was bumped, for focus sessions.
    pub task: Option<Task>,
}

/// Session lifecycle: in_progress -> completed | cancelled, never back.
pub struct SessionEngine<'a> {
    conn: &'a Connection,
    clock: &'a dyn Clock,
}

impl<'a> SessionEngine<'a> {
    pub fn new(conn: &'a Connection, clock: &'a dyn Clock) -> Self {
        Self { conn, clock }
    }

    pub fn start(&self, owner_id: &str, req: StartSession) -> Result<Session, PomoError> {
        let uow = UnitOfWork::begin(self.conn)?;

        let task_id = match req.task_id.as_deref() {
            Some(reference) => Some(task_repo::resolve_task(uow.conn(), owner_id, reference)?.id),
            None => None,
        };
        let duration_sec = match req.duration_sec {
            Some(d) => d,
            None => settings_repo::get_settings(uow.conn(), owner_id)?.duration_sec(req.session_type),
        };
        if !(1..=MAX_DURATION_SEC).contains(&duration_sec) {
            return Err(PomoError::validation(format!(
                "duration_sec must be between 1 and {MAX_DURATION_SEC}"
            )));
        }
        if let Some(active) = session_repo::active_session(uow.conn(), owner_id)? {
            tracing::warn!(session_id = %active.id, "start rejected, session already in progress");
            return Err(PomoError::session_already_active());
        }

        let session = Session {
            id: ulid::Ulid::new().to_string(),
            owner_id: owner_id.to_string(),
            task_id,
            session_type: req.session_type,
            duration_sec,
            started_at: req
                .started_at
                .map(clock::truncate_millis)
                .unwrap_or_else(|| self.clock.now()),
            state: SessionState::InProgress,
        };
        session_repo::insert_session(uow.conn(), &session)?;
        uow.commit()?;

        tracing::info!(
            session_id = %session.id,
            session_type = session.session_type.as_str(),
            duration_sec,
            "session started"
        );
        Ok(session)
    }

    /// Close a running session. For a focus session linked to a task, the
    /// task's completedPomodoros and version each go up by one in the same
    /// unit of work, so either both land or neither does.
    pub fn complete(
        &self,
        owner_id: &str,
        reference: &str,
        ended_at: Option<DateTime<Utc>>,
    ) -> Result<CompletedSession, PomoError> {
        let uow = UnitOfWork::begin(self.conn)?;
        let session = session_repo::resolve_session(uow.conn(), owner_id, reference)?;

        let ended_at = ended_at
            .map(clock::truncate_millis)
            .unwrap_or_else(|| self.clock.now());
        let state = session
            .state
            .complete(ended_at)
            .map_err(|status| PomoError::session_finalized(&session.id, status.as_str()))?;
        if ended_at <= session.started_at {
            return Err(PomoError::validation("ended_at must be after started_at"));
        }

        let closed = Session { state, ..session };
        if session_repo::finalize_session(uow.conn(), &closed)? == 0 {
            return Err(PomoError::session_finalized(&closed.id, "finalized"));
        }

        let task = match (&closed.session_type, closed.task_id.as_deref()) {
            (SessionType::Focus, Some(task_id)) => {
                if task_repo::increment_completed_pomodoros(uow.conn(), owner_id, task_id, self.clock.now())? == 0 {
                    return Err(PomoError::task_not_found(task_id));
                }
                Some(task_repo::get_task_by_id(uow.conn(), owner_id, task_id)?)
            }
            _ => None,
        };
        uow.commit()?;

        tracing::info!(
            session_id = %closed.id,
            task_id = closed.task_id.as_deref().unwrap_or(""),
            "session completed"
        );
        Ok(CompletedSession {
            session: closed,
            task,
        })
    }

    pub fn cancel(&self, owner_id: &str, reference: &str) -> Result<Session, PomoError> {
        let uow = UnitOfWork::begin(self.conn)?;
        let session = session_repo::resolve_session(uow.conn(), owner_id, reference)?;

        let state = session
            .state
            .cancel(self.clock.now(), CancelledBy::User)
            .map_err(|status| PomoError::session_finalized(&session.id, status.as_str()))?;
        let cancelled = Session { state, ..session };
        if session_repo::finalize_session(uow.conn(), &cancelled)? == 0 {
            return Err(PomoError::session_finalized(&cancelled.id, "finalized"));
        }
        uow.commit()?;

        tracing::info!(session_id = %cancelled.id, "session cancelled");
        Ok(cancelled)
    }

    pub fn get(&self, owner_id: &str, reference: &str) -> Result<Session, PomoError> {
        session_repo::resolve_session(self.conn, owner_id, reference)
    }

    pub fn active(&self, owner_id: &str) -> Result<Option<Session>, PomoError> {
        session_repo::active_session(self.conn, owner_id)
    }

    /// Sessions started on local days [from, to) in the account's timezone.
    pub fn list(
        &self,
        owner: &Account,
        from: NaiveDate,
        to: NaiveDate,
        page: PageRequest,
    ) -> Result<Page<Session>, PomoError> {
        if to <= from {
            return Err(PomoError::validation("'to' must be after 'from'"));
        }
        let tz = owner.tz()?;
        let start = calendar::local_day_start(from, tz);
        let end = calendar::local_day_start(to, tz);

        let items = session_repo::list_sessions_started_between(
            self.conn,
            &owner.id,
            start,
            end,
            page.page_size,
            page.offset(),
        )?;
        let total = session_repo::count_sessions_started_between(self.conn, &owner.id, start, end)?;
        Ok(Page {
            items,
            page: page.page,
            page_size: page.page_size,
            total,
        })
    }
}
