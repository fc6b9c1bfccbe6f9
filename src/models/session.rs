use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionType {
    Focus,
    ShortBreak,
    LongBreak,
}

impl SessionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Focus => "focus",
            Self::ShortBreak => "short_break",
            Self::LongBreak => "long_break",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "focus" => Some(Self::Focus),
            "short_break" => Some(Self::ShortBreak),
            "long_break" => Some(Self::LongBreak),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    InProgress,
    Completed,
    Cancelled,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "in_progress" => Some(Self::InProgress),
            "completed" => Some(Self::Completed),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CancelledBy {
    User,
    Recovery,
}

impl CancelledBy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Recovery => "recovery",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "user" => Some(Self::User),
            "recovery" => Some(Self::Recovery),
            _ => None,
        }
    }
}

/// Lifecycle of a session. endedAt exists only in the terminal states and
/// cancelledBy only when cancelled, so neither can be set out of turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    InProgress,
    Completed {
        ended_at: DateTime<Utc>,
    },
    Cancelled {
        ended_at: DateTime<Utc>,
        by: CancelledBy,
    },
}

impl SessionState {
    pub fn status(&self) -> SessionStatus {
        match self {
            Self::InProgress => SessionStatus::InProgress,
            Self::Completed { .. } => SessionStatus::Completed,
            Self::Cancelled { .. } => SessionStatus::Cancelled,
        }
    }

    pub fn ended_at(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::InProgress => None,
            Self::Completed { ended_at } | Self::Cancelled { ended_at, .. } => Some(*ended_at),
        }
    }

    pub fn cancelled_by(&self) -> Option<CancelledBy> {
        match self {
            Self::Cancelled { by, .. } => Some(*by),
            Self::InProgress | Self::Completed { .. } => None,
        }
    }

    /// in_progress -> completed. A terminal state yields its status as the error.
    pub fn complete(&self, ended_at: DateTime<Utc>) -> Result<SessionState, SessionStatus> {
        match self {
            Self::InProgress => Ok(Self::Completed { ended_at }),
            Self::Completed { .. } | Self::Cancelled { .. } => Err(self.status()),
        }
    }

    /// in_progress -> cancelled.
    pub fn cancel(
        &self,
        ended_at: DateTime<Utc>,
        by: CancelledBy,
    ) -> Result<SessionState, SessionStatus> {
        match self {
            Self::InProgress => Ok(Self::Cancelled { ended_at, by }),
            Self::Completed { .. } | Self::Cancelled { .. } => Err(self.status()),
        }
    }

    /// Rebuild from the flat stored columns; `None` if they are inconsistent.
    pub fn from_parts(
        status: SessionStatus,
        ended_at: Option<DateTime<Utc>>,
        cancelled_by: Option<CancelledBy>,
    ) -> Option<Self> {
        match (status, ended_at, cancelled_by) {
            (SessionStatus::InProgress, None, None) => Some(Self::InProgress),
            (SessionStatus::Completed, Some(ended_at), None) => Some(Self::Completed { ended_at }),
            (SessionStatus::Cancelled, Some(ended_at), Some(by)) => {
                Some(Self::Cancelled { ended_at, by })
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub id: String,
    pub owner_id: String,
    pub task_id: Option<String>,
    pub session_type: SessionType,
    pub duration_sec: i64,
    pub started_at: DateTime<Utc>,
    pub state: SessionState,
}

impl Session {
    pub fn status(&self) -> SessionStatus {
        self.state.status()
    }

    pub fn ended_at(&self) -> Option<DateTime<Utc>> {
        self.state.ended_at()
    }
}

#[derive(Serialize)]
struct SessionRecord<'a> {
    id: &'a str,
    owner_id: &'a str,
    task_id: Option<&'a str>,
    session_type: SessionType,
    duration_sec: i64,
    started_at: DateTime<Utc>,
    ended_at: Option<DateTime<Utc>>,
    status: SessionStatus,
    cancelled_by: Option<CancelledBy>,
}

impl Serialize for Session {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        SessionRecord {
            id: &self.id,
            owner_id: &self.owner_id,
            task_id: self.task_id.as_deref(),
            session_type: self.session_type,
            duration_sec: self.duration_sec,
            started_at: self.started_at,
            ended_at: self.state.ended_at(),
            status: self.state.status(),
            cancelled_by: self.state.cancelled_by(),
        }
        .serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn terminal_states_reject_every_transition() {
        let t = Utc.with_ymd_and_hms(2024, 1, 1, 9, 25, 0).unwrap();
        let completed = SessionState::InProgress.complete(t).unwrap();
        assert!(completed.status().is_terminal());
        assert!(!SessionStatus::InProgress.is_terminal());
        assert_eq!(completed.complete(t), Err(SessionStatus::Completed));
        assert_eq!(
            completed.cancel(t, CancelledBy::User),
            Err(SessionStatus::Completed)
        );

        let cancelled = SessionState::InProgress
            .cancel(t, CancelledBy::Recovery)
            .unwrap();
        assert_eq!(cancelled.cancelled_by(), Some(CancelledBy::Recovery));
        assert_eq!(cancelled.complete(t), Err(SessionStatus::Cancelled));
    }

    #[test]
    fn inconsistent_columns_are_rejected() {
        let t = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();
        assert!(SessionState::from_parts(SessionStatus::InProgress, Some(t), None).is_none());
        assert!(SessionState::from_parts(SessionStatus::Completed, None, None).is_none());
        assert!(
            SessionState::from_parts(SessionStatus::Completed, Some(t), Some(CancelledBy::User))
                .is_none()
        );
    }
}
