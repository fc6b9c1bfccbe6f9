use std::env;
use std::fs;
use std::path::PathBuf;

use rusqlite::Connection;

use crate::error::PomoError;

use super::migrations;

pub const HOME_ENV: &str = "POMOTASK_HOME";

/// Data directory: `$POMOTASK_HOME`, or `~/.pomotask`.
pub fn data_dir() -> Result<PathBuf, PomoError> {
    if let Ok(home) = env::var(HOME_ENV) {
        if !home.trim().is_empty() {
            return Ok(PathBuf::from(home));
        }
    }
    let home = dirs::home_dir()
        .ok_or_else(|| PomoError::database("Cannot determine home directory; set POMOTASK_HOME"))?;
    Ok(home.join(".pomotask"))
}

/// Get the path to the pomotask database.
pub fn db_path() -> Result<PathBuf, PomoError> {
    Ok(data_dir()?.join("pomotask.db"))
}

/// Get the config file path.
pub fn config_path() -> Result<PathBuf, PomoError> {
    Ok(data_dir()?.join("config.json"))
}

/// Open a connection to the database. Returns error if not initialized.
pub fn open_db() -> Result<Connection, PomoError> {
    let path = db_path()?;
    if !path.exists() {
        return Err(PomoError::not_initialized());
    }
    let conn = Connection::open(&path)?;
    configure_connection(&conn)?;
    tracing::debug!(path = %path.display(), "opened database");
    Ok(conn)
}

/// Initialize the database: create directories, database, and run migrations.
pub fn init_db() -> Result<PathBuf, PomoError> {
    let path = db_path()?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let conn = Connection::open(&path)?;
    configure_connection(&conn)?;
    migrations::run_migrations(&conn)?;
    tracing::info!(path = %path.display(), "initialized database");
    Ok(path)
}

/// Fresh migrated in-memory database, for embedding and tests.
pub fn open_in_memory() -> Result<Connection, PomoError> {
    let conn = Connection::open_in_memory()?;
    conn.execute_batch("PRAGMA foreign_keys=ON;")?;
    migrations::run_migrations(&conn)?;
    Ok(conn)
}

fn configure_connection(conn: &Connection) -> Result<(), PomoError> {
    conn.execute_batch(
        "PRAGMA journal_mode=WAL;
         PRAGMA busy_timeout=5000;
         PRAGMA foreign_keys=ON;",
    )?;
    Ok(())
}
