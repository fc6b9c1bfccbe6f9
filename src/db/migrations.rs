use rusqlite::Connection;

use crate::error::PomoError;

pub fn run_migrations(conn: &Connection) -> Result<(), PomoError> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS accounts (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            timezone TEXT NOT NULL DEFAULT 'Asia/Seoul',
            created_at_ms INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS settings (
            account_id TEXT PRIMARY KEY REFERENCES accounts(id) ON DELETE CASCADE,
            focus_min INTEGER NOT NULL DEFAULT 25 CHECK (focus_min BETWEEN 1 AND 120),
            short_break_min INTEGER NOT NULL DEFAULT 5 CHECK (short_break_min BETWEEN 1 AND 60),
            long_break_min INTEGER NOT NULL DEFAULT 15 CHECK (long_break_min BETWEEN 1 AND 120),
            long_break_interval INTEGER NOT NULL DEFAULT 4 CHECK (long_break_interval BETWEEN 2 AND 10),
            auto_start_break INTEGER NOT NULL DEFAULT 0,
            auto_start_focus INTEGER NOT NULL DEFAULT 0,
            sound_enabled INTEGER NOT NULL DEFAULT 1
        );

        CREATE TABLE IF NOT EXISTS tasks (
            id TEXT PRIMARY KEY,
            owner_id TEXT NOT NULL REFERENCES accounts(id) ON DELETE CASCADE,
            title TEXT NOT NULL,
            description TEXT,
            priority TEXT NOT NULL DEFAULT 'medium'
                CHECK (priority IN ('low', 'medium', 'high')),
            status TEXT NOT NULL DEFAULT 'todo'
                CHECK (status IN ('todo', 'in_progress', 'done')),
            planned_date TEXT,
            estimate_pomodoros INTEGER NOT NULL DEFAULT 1 CHECK (estimate_pomodoros >= 0),
            completed_pomodoros INTEGER NOT NULL DEFAULT 0 CHECK (completed_pomodoros >= 0),
            version INTEGER NOT NULL DEFAULT 1 CHECK (version >= 1),
            completed_at_ms INTEGER,
            created_at_ms INTEGER NOT NULL,
            updated_at_ms INTEGER NOT NULL,
            CHECK ((status = 'done') = (completed_at_ms IS NOT NULL))
        );

        -- task_id has no ON DELETE CASCADE: deleting a task must remove its
        -- sessions explicitly inside the same unit of work.
        CREATE TABLE IF NOT EXISTS sessions (
            id TEXT PRIMARY KEY,
            owner_id TEXT NOT NULL REFERENCES accounts(id) ON DELETE CASCADE,
            task_id TEXT REFERENCES tasks(id),
            session_type TEXT NOT NULL
                CHECK (session_type IN ('focus', 'short_break', 'long_break')),
            duration_sec INTEGER NOT NULL CHECK (duration_sec > 0),
            started_at_ms INTEGER NOT NULL,
            ended_at_ms INTEGER,
            status TEXT NOT NULL DEFAULT 'in_progress'
                CHECK (status IN ('in_progress', 'completed', 'cancelled')),
            cancelled_by TEXT CHECK (cancelled_by IN ('user', 'recovery')),
            CHECK ((status = 'in_progress') = (ended_at_ms IS NULL)),
            CHECK ((status = 'cancelled') = (cancelled_by IS NOT NULL))
        );

        CREATE INDEX IF NOT EXISTS idx_tasks_owner_status ON tasks(owner_id, status);
        CREATE INDEX IF NOT EXISTS idx_tasks_owner_completed ON tasks(owner_id, completed_at_ms)
            WHERE status = 'done';
        CREATE INDEX IF NOT EXISTS idx_sessions_task ON sessions(task_id);
        CREATE INDEX IF NOT EXISTS idx_sessions_owner_started ON sessions(owner_id, started_at_ms);
        CREATE INDEX IF NOT EXISTS idx_sessions_owner_ended
            ON sessions(owner_id, status, session_type, ended_at_ms);
        CREATE UNIQUE INDEX IF NOT EXISTS idx_sessions_one_active ON sessions(owner_id)
            WHERE status = 'in_progress';
        ",
    )?;
    Ok(())
}
