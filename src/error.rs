use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    NotInitialized,
    NoActiveAccount,
    AccountNotFound,
    AccountNameConflict,
    TaskNotFound,
    SessionNotFound,
    AmbiguousRef,
    StaleData,
    SessionFinalized,
    SessionAlreadyActive,
    ValidationError,
    TransientFailure,
    DatabaseError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotInitialized => "NOT_INITIALIZED",
            Self::NoActiveAccount => "NO_ACTIVE_ACCOUNT",
            Self::AccountNotFound => "ACCOUNT_NOT_FOUND",
            Self::AccountNameConflict => "ACCOUNT_NAME_CONFLICT",
            Self::TaskNotFound => "TASK_NOT_FOUND",
            Self::SessionNotFound => "SESSION_NOT_FOUND",
            Self::AmbiguousRef => "AMBIGUOUS_REF",
            Self::StaleData => "STALE_DATA",
            Self::SessionFinalized => "SESSION_FINALIZED",
            Self::SessionAlreadyActive => "SESSION_ALREADY_ACTIVE",
            Self::ValidationError => "VALIDATION_ERROR",
            Self::TransientFailure => "TRANSIENT_FAILURE",
            Self::DatabaseError => "DATABASE_ERROR",
        }
    }

    /// Conflicts are resolved by re-reading and retrying, so the CLI gives them their own exit code.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            Self::StaleData | Self::SessionFinalized | Self::SessionAlreadyActive
        )
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::AccountNotFound | Self::TaskNotFound | Self::SessionNotFound
        )
    }
}

#[derive(Debug, Error)]
#[error("{message}")]
pub struct PomoError {
    pub code: ErrorCode,
    pub message: String,
    /// Authoritative record attached to a conflict so the caller can rebase without another read.
    pub latest: Option<Value>,
}

impl PomoError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            latest: None,
        }
    }

    pub fn with_latest(mut self, latest: Value) -> Self {
        self.latest = Some(latest);
        self
    }

    pub fn not_initialized() -> Self {
        Self::new(
            ErrorCode::NotInitialized,
            "pomotask is not initialized. Run `pomotask init` first.",
        )
    }

    pub fn no_active_account() -> Self {
        Self::new(
            ErrorCode::NoActiveAccount,
            "No active account. Use `pomotask account use <name>` or `--account <name>`.",
        )
    }

    pub fn account_not_found(reference: &str) -> Self {
        Self::new(
            ErrorCode::AccountNotFound,
            format!("Account not found: {reference}"),
        )
    }

    pub fn account_name_conflict(name: &str) -> Self {
        Self::new(
            ErrorCode::AccountNameConflict,
            format!("Account with name '{name}' already exists"),
        )
    }

    pub fn task_not_found(reference: &str) -> Self {
        Self::new(
            ErrorCode::TaskNotFound,
            format!("Task not found: {reference}"),
        )
    }

    pub fn session_not_found(reference: &str) -> Self {
        Self::new(
            ErrorCode::SessionNotFound,
            format!("Session not found: {reference}"),
        )
    }

    pub fn ambiguous_ref(reference: &str, candidates: &[String]) -> Self {
        Self::new(
            ErrorCode::AmbiguousRef,
            format!(
                "Ambiguous reference '{}'. Candidates: {}",
                reference,
                candidates.join(", ")
            ),
        )
    }

    pub fn stale_data(expected: i64, actual: i64) -> Self {
        Self::new(
            ErrorCode::StaleData,
            format!(
                "Task was changed elsewhere (expected version {expected}, stored version {actual}). Reload and retry."
            ),
        )
    }

    pub fn session_finalized(id: &str, status: &str) -> Self {
        Self::new(
            ErrorCode::SessionFinalized,
            format!("Session {id} is already {status}"),
        )
    }

    pub fn session_already_active() -> Self {
        Self::new(
            ErrorCode::SessionAlreadyActive,
            "Another session is already in progress. Complete, cancel or recover it first.",
        )
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ValidationError, message)
    }

    pub fn transient(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::TransientFailure, message)
    }

    pub fn database(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::DatabaseError, message)
    }
}

impl From<rusqlite::Error> for PomoError {
    fn from(e: rusqlite::Error) -> Self {
        match e.sqlite_error_code() {
            Some(rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked) => {
                Self::transient(e.to_string())
            }
            _ => Self::database(e.to_string()),
        }
    }
}

impl From<std::io::Error> for PomoError {
    fn from(e: std::io::Error) -> Self {
        Self::database(e.to_string())
    }
}
