use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "pomotask",
    version,
    about = "Focus timer and task tracker",
    after_help = "\
NOTE:
  Data lives in $POMOTASK_HOME (default ~/.pomotask). Run `pomotask init` first,
  then `pomotask account create <name>`; the first account becomes active.
  Log verbosity is read from POMOTASK_LOG (e.g. `debug`), written to stderr.

EXIT CODES:
  0  Success
  1  Error (not found, validation, database, etc.)
  2  Conflict (stale version, session already finalized or already running)

CONCURRENCY:
  `task update` requires --expected-version. On mismatch nothing is written and
  the error carries the latest stored record so you can re-apply your edit."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Act as this account (name or ID) instead of the active one
    #[arg(long, global = true)]
    pub account: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create the data directory and database
    Init,

    /// Account management
    #[command(subcommand)]
    Account(AccountCommands),

    /// Task management
    #[command(subcommand)]
    Task(TaskCommands),

    /// Focus and break sessions
    #[command(subcommand)]
    Session(SessionCommands),

    /// Focus statistics in the account's timezone
    #[command(subcommand)]
    Stats(StatsCommands),

    /// Timer settings
    #[command(subcommand)]
    Settings(SettingsCommands),

    /// Detect task changes made elsewhere
    #[command(subcommand)]
    Sync(SyncCommands),
}

#[derive(Subcommand)]
pub enum AccountCommands {
    /// Create an account
    Create {
        /// Unique account name
        name: String,
        /// IANA timezone, e.g. Europe/Berlin
        #[arg(long, default_value = crate::models::DEFAULT_TIMEZONE)]
        timezone: String,
    },
    /// List accounts
    List,
    /// Set the active account
    Use {
        /// Account name or ID
        reference: String,
    },
    /// Show an account (default: active)
    Show { reference: Option<String> },
}

#[derive(Subcommand)]
pub enum TaskCommands {
    /// Add a task
    Add {
        /// Task title
        title: String,
        #[arg(long)]
        description: Option<String>,
        /// low | medium | high
        #[arg(long, default_value = "medium")]
        priority: String,
        /// YYYY-MM-DD
        #[arg(long)]
        planned_date: Option<String>,
        #[arg(long, default_value = "1")]
        estimate: i64,
    },
    /// List tasks
    List {
        /// all | today | tomorrow | completed
        #[arg(long, default_value = "all")]
        filter: String,
        #[arg(long, default_value = "1")]
        page: i64,
        #[arg(long, default_value = "20")]
        page_size: i64,
    },
    /// Show task details
    Show {
        /// Task ID or prefix
        id: String,
    },
    /// Update a task if its version still matches
    #[command(after_help = "\
NOTE:
  Moving into `done` stamps completed_at; moving out of `done` clears it.
  Every successful update bumps the version by exactly one.")]
    Update {
        /// Task ID or prefix
        id: String,
        /// Version the edit was based on
        #[arg(long)]
        expected_version: i64,
        #[arg(long)]
        title: Option<String>,
        #[arg(long, conflicts_with = "clear_description")]
        description: Option<String>,
        #[arg(long)]
        clear_description: bool,
        /// low | medium | high
        #[arg(long)]
        priority: Option<String>,
        /// todo | in_progress | done
        #[arg(long)]
        status: Option<String>,
        /// YYYY-MM-DD
        #[arg(long, conflicts_with = "clear_planned_date")]
        planned_date: Option<String>,
        #[arg(long)]
        clear_planned_date: bool,
        #[arg(long)]
        estimate: Option<i64>,
        #[arg(long)]
        completed_pomodoros: Option<i64>,
    },
    /// Delete a task and its sessions
    Delete {
        /// Task ID or prefix
        id: String,
    },
}

#[derive(Subcommand)]
pub enum SessionCommands {
    /// Start a session
    Start {
        /// Task ID or prefix to attribute the session to
        #[arg(long)]
        task: Option<String>,
        /// focus | short_break | long_break
        #[arg(long = "type", default_value = "focus")]
        session_type: String,
        /// Defaults to the configured length for the type (max 86400)
        #[arg(long)]
        duration_sec: Option<i64>,
        /// RFC 3339; defaults to now
        #[arg(long)]
        started_at: Option<String>,
    },
    /// Complete a running session
    Complete {
        /// Session ID or prefix
        id: String,
        /// RFC 3339; defaults to now
        #[arg(long)]
        ended_at: Option<String>,
    },
    /// Cancel a running session
    Cancel {
        /// Session ID or prefix
        id: String,
    },
    /// Show the running session, if any
    Active,
    /// Cancel sessions left running by a crashed client
    Recover,
    /// List sessions started in a local date range
    List {
        /// YYYY-MM-DD, inclusive (default: today)
        #[arg(long)]
        from: Option<String>,
        /// YYYY-MM-DD, exclusive (default: the day after --from)
        #[arg(long)]
        to: Option<String>,
        #[arg(long, default_value = "1")]
        page: i64,
        #[arg(long, default_value = "20")]
        page_size: i64,
    },
}

#[derive(Subcommand)]
pub enum StatsCommands {
    /// One local day
    Daily {
        /// YYYY-MM-DD (default: today)
        #[arg(long)]
        date: Option<String>,
    },
    /// Seven local days
    Weekly {
        /// YYYY-MM-DD (default: six days before today)
        #[arg(long)]
        start: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum SettingsCommands {
    /// Show settings
    Show,
    /// Change settings
    Set {
        #[arg(long)]
        focus_min: Option<i64>,
        #[arg(long)]
        short_break_min: Option<i64>,
        #[arg(long)]
        long_break_min: Option<i64>,
        #[arg(long)]
        long_break_interval: Option<i64>,
        #[arg(long)]
        auto_start_break: Option<bool>,
        #[arg(long)]
        auto_start_focus: Option<bool>,
        #[arg(long)]
        sound_enabled: Option<bool>,
        /// IANA timezone
        #[arg(long)]
        timezone: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum SyncCommands {
    /// Poll once and compare against a previous fingerprint
    Check {
        /// Fingerprint printed by an earlier check
        #[arg(long)]
        since: Option<String>,
    },
    /// Poll repeatedly and report changes
    Watch {
        /// Seconds between polls (default: poll_interval_secs from config)
        #[arg(long)]
        interval: Option<u64>,
        /// Stop after this many polls
        #[arg(long)]
        iterations: Option<u64>,
    },
}
