use rusqlite::Connection;
use serde::Serialize;

use crate::clock::Clock;
use crate::db::{session_repo, UnitOfWork};
use crate::error::PomoError;
use crate::models::{CancelledBy, SessionType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RecoveryReport {
    pub reset_count: usize,
    /// Mode the client timer resumes in after recovery.
    pub timer_state: SessionType,
}

/// Repairs sessions a crashed or reloaded client left in_progress. Run once
/// per client bootstrap; a second run with nothing left to repair is a no-op.
pub struct RecoveryReconciler<'a> {
    conn: &'a Connection,
    clock: &'a dyn Clock,
}

impl<'a> RecoveryReconciler<'a> {
    pub fn new(conn: &'a Connection, clock: &'a dyn Clock) -> Self {
        Self { conn, clock }
    }

    pub fn reset(&self, owner_id: &str) -> Result<RecoveryReport, PomoError> {
        let uow = UnitOfWork::begin(self.conn)?;
        let reset_count = session_repo::cancel_all_in_progress(
            uow.conn(),
            owner_id,
            CancelledBy::Recovery,
            self.clock.now(),
        )?;
        uow.commit()?;

        if reset_count > 0 {
            tracing::info!(owner_id, reset_count, "recovered orphaned sessions");
        } else {
            tracing::debug!(owner_id, "no orphaned sessions");
        }
        Ok(RecoveryReport {
            reset_count,
            timer_state: SessionType::ShortBreak,
        })
    }
}
