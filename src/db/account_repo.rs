use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::db::convert;
use crate::error::PomoError;
use crate::models::Account;

const COLUMNS: &str = "id, name, timezone, created_at_ms";

pub fn create_account(
    conn: &Connection,
    id: &str,
    name: &str,
    timezone: &str,
    now: DateTime<Utc>,
) -> Result<Account, PomoError> {
    if find_account_by_name(conn, name)?.is_some() {
        return Err(PomoError::account_name_conflict(name));
    }

    conn.execute(
        "INSERT INTO accounts (id, name, timezone, created_at_ms) VALUES (?1, ?2, ?3, ?4)",
        params![id, name, timezone, convert::to_ms(now)],
    )?;

    get_account_by_id(conn, id)
}

pub fn get_account_by_id(conn: &Connection, id: &str) -> Result<Account, PomoError> {
    conn.query_row(
        &format!("SELECT {COLUMNS} FROM accounts WHERE id = ?1"),
        params![id],
        row_to_account,
    )
    .map_err(|e| match e {
        rusqlite::Error::QueryReturnedNoRows => PomoError::account_not_found(id),
        _ => PomoError::from(e),
    })
}

pub fn find_account_by_name(conn: &Connection, name: &str) -> Result<Option<Account>, PomoError> {
    let account = conn
        .query_row(
            &format!("SELECT {COLUMNS} FROM accounts WHERE name = ?1"),
            params![name],
            row_to_account,
        )
        .optional()?;
    Ok(account)
}

/// Resolve an account reference: exact name, then ULID prefix.
pub fn resolve_account(conn: &Connection, reference: &str) -> Result<Account, PomoError> {
    if let Some(account) = find_account_by_name(conn, reference)? {
        return Ok(account);
    }

    let mut stmt = conn.prepare(&format!(
        "SELECT {COLUMNS} FROM accounts WHERE id LIKE ?1 ESCAPE '\\'"
    ))?;
    let mut accounts: Vec<Account> = stmt
        .query_map(params![convert::like_prefix(reference)], row_to_account)?
        .collect::<Result<Vec<_>, _>>()?;

    match accounts.len() {
        0 => Err(PomoError::account_not_found(reference)),
        1 => Ok(accounts.remove(0)),
        _ => {
            let candidates: Vec<String> = accounts
                .iter()
                .map(|a| format!("{} ({})", a.name, a.id))
                .collect();
            Err(PomoError::ambiguous_ref(reference, &candidates))
        }
    }
}

pub fn list_accounts(conn: &Connection) -> Result<Vec<Account>, PomoError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {COLUMNS} FROM accounts ORDER BY created_at_ms ASC, name ASC"
    ))?;
    let accounts = stmt
        .query_map([], row_to_account)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(accounts)
}

pub fn update_timezone(conn: &Connection, id: &str, timezone: &str) -> Result<(), PomoError> {
    let changed = conn.execute(
        "UPDATE accounts SET timezone = ?1 WHERE id = ?2",
        params![timezone, id],
    )?;
    if changed == 0 {
        return Err(PomoError::account_not_found(id));
    }
    Ok(())
}

fn row_to_account(row: &rusqlite::Row) -> rusqlite::Result<Account> {
    Ok(Account {
        id: row.get(0)?,
        name: row.get(1)?,
        timezone: row.get(2)?,
        created_at: convert::get_ts(row, 3)?,
    })
}
