use rusqlite::{Connection, Transaction, TransactionBehavior};

use crate::error::PomoError;

/// An explicit atomic unit: begin, apply any number of writes through
/// [`UnitOfWork::conn`], then [`UnitOfWork::commit`]. Dropping it without
/// committing rolls every write back.
///
/// Begins with `BEGIN IMMEDIATE` so the write lock is taken up front and
/// a concurrent writer fails fast instead of deadlocking on upgrade.
pub struct UnitOfWork<'c> {
    tx: Transaction<'c>,
}

impl<'c> UnitOfWork<'c> {
    pub fn begin(conn: &'c Connection) -> Result<Self, PomoError> {
        let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?;
        Ok(Self { tx })
    }

    pub fn conn(&self) -> &Connection {
        &self.tx
    }

    pub fn commit(self) -> Result<(), PomoError> {
        self.tx
            .commit()
            .map_err(|e| PomoError::transient(format!("Could not commit: {e}")))
    }

    pub fn rollback(self) -> Result<(), PomoError> {
        self.tx.rollback()?;
        Ok(())
    }
}
