use rusqlite::{params, Connection, OptionalExtension};

use crate::db::account_repo;
use crate::error::PomoError;
use crate::models::Settings;

/// Settings for an account, falling back to defaults when none were saved.
/// The timezone always comes from the account row.
pub fn get_settings(conn: &Connection, account_id: &str) -> Result<Settings, PomoError> {
    let account = account_repo::get_account_by_id(conn, account_id)?;
    let stored = conn
        .query_row(
            "SELECT focus_min, short_break_min, long_break_min, long_break_interval,
                    auto_start_break, auto_start_focus, sound_enabled
             FROM settings WHERE account_id = ?1",
            params![account_id],
            |row| {
                Ok(Settings {
                    focus_min: row.get(0)?,
                    short_break_min: row.get(1)?,
                    long_break_min: row.get(2)?,
                    long_break_interval: row.get(3)?,
                    auto_start_break: row.get(4)?,
                    auto_start_focus: row.get(5)?,
                    sound_enabled: row.get(6)?,
                    timezone: account.timezone.clone(),
                })
            },
        )
        .optional()?;
    Ok(stored.unwrap_or_else(|| Settings::defaults(account.timezone)))
}

/// Insert or replace the settings row. Does not touch the account timezone.
pub fn upsert_settings(
    conn: &Connection,
    account_id: &str,
    settings: &Settings,
) -> Result<(), PomoError> {
    conn.execute(
        "INSERT INTO settings (account_id, focus_min, short_break_min, long_break_min,
                               long_break_interval, auto_start_break, auto_start_focus, sound_enabled)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
         ON CONFLICT(account_id) DO UPDATE SET
             focus_min = excluded.focus_min,
             short_break_min = excluded.short_break_min,
             long_break_min = excluded.long_break_min,
             long_break_interval = excluded.long_break_interval,
             auto_start_break = excluded.auto_start_break,
             auto_start_focus = excluded.auto_start_focus,
             sound_enabled = excluded.sound_enabled",
        params![
            account_id,
            settings.focus_min,
            settings.short_break_min,
            settings.long_break_min,
            settings.long_break_interval,
            settings.auto_start_break,
            settings.auto_start_focus,
            settings.sound_enabled,
        ],
    )?;
    Ok(())
}
