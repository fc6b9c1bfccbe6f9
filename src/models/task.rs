use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::PomoError;

pub const MAX_TITLE_LEN: usize = 200;
pub const MAX_DESCRIPTION_LEN: usize = 2000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    Low,
    Medium,
    High,
}

impl TaskPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Todo,
    InProgress,
    Done,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Todo => "todo",
            Self::InProgress => "in_progress",
            Self::Done => "done",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "todo" => Some(Self::Todo),
            "in_progress" => Some(Self::InProgress),
            "done" => Some(Self::Done),
            _ => None,
        }
    }

    /// completedAt after moving from `self` to `next`: stamped on entry into
    /// done, kept while done, cleared for any other status.
    pub fn completed_at_after(
        &self,
        next: TaskStatus,
        current: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Option<DateTime<Utc>> {
        match (self, next) {
            (Self::Done, Self::Done) => current.or(Some(now)),
            (Self::Todo | Self::InProgress, Self::Done) => Some(now),
            (_, Self::Todo | Self::InProgress) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub owner_id: String,
    pub title: String,
    pub description: Option<String>,
    pub priority: TaskPriority,
    pub status: TaskStatus,
    pub planned_date: Option<NaiveDate>,
    pub estimate_pomodoros: i64,
    pub completed_pomodoros: i64,
    pub version: i64,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    pub priority: TaskPriority,
    pub planned_date: Option<NaiveDate>,
    pub estimate_pomodoros: i64,
}

impl NewTask {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: None,
            priority: TaskPriority::Medium,
            planned_date: None,
            estimate_pomodoros: 1,
        }
    }

    pub fn validate(&self) -> Result<(), PomoError> {
        validate_title(&self.title)?;
        validate_description(self.description.as_deref())?;
        validate_count("estimate_pomodoros", self.estimate_pomodoros)
    }
}

/// A partial edit. `None` leaves a field untouched; for nullable fields
/// `Some(None)` clears it.
#[derive(Debug, Clone, Default)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub priority: Option<TaskPriority>,
    pub status: Option<TaskStatus>,
    pub planned_date: Option<Option<NaiveDate>>,
    pub estimate_pomodoros: Option<i64>,
    pub completed_pomodoros: Option<i64>,
}

impl TaskPatch {
    pub fn validate(&self) -> Result<(), PomoError> {
        if let Some(ref title) = self.title {
            validate_title(title)?;
        }
        if let Some(ref description) = self.description {
            validate_description(description.as_deref())?;
        }
        if let Some(n) = self.estimate_pomodoros {
            validate_count("estimate_pomodoros", n)?;
        }
        if let Some(n) = self.completed_pomodoros {
            validate_count("completed_pomodoros", n)?;
        }
        Ok(())
    }

    /// The record that results from applying this patch to `current`, with the
    /// version bumped by one and updatedAt strictly after the previous value.
    pub fn apply(&self, current: &Task, now: DateTime<Utc>) -> Task {
        let status = self.status.unwrap_or(current.status);
        let completed_at = match self.status {
            Some(next) => current
                .status
                .completed_at_after(next, current.completed_at, now),
            None => current.completed_at,
        };
        Task {
            id: current.id.clone(),
            owner_id: current.owner_id.clone(),
            title: self.title.clone().unwrap_or_else(|| current.title.clone()),
            description: self
                .description
                .clone()
                .unwrap_or_else(|| current.description.clone()),
            priority: self.priority.unwrap_or(current.priority),
            status,
            planned_date: self.planned_date.unwrap_or(current.planned_date),
            estimate_pomodoros: self
                .estimate_pomodoros
                .unwrap_or(current.estimate_pomodoros),
            completed_pomodoros: self
                .completed_pomodoros
                .unwrap_or(current.completed_pomodoros),
            version: current.version + 1,
            completed_at,
            created_at: current.created_at,
            updated_at: now.max(current.updated_at + Duration::milliseconds(1)),
        }
    }
}

fn validate_title(title: &str) -> Result<(), PomoError> {
    let len = title.chars().count();
    if len == 0 || len > MAX_TITLE_LEN {
        return Err(PomoError::validation(format!(
            "title must be 1..={MAX_TITLE_LEN} characters"
        )));
    }
    Ok(())
}

fn validate_description(description: Option<&str>) -> Result<(), PomoError> {
    match description {
        Some(d) if d.chars().count() > MAX_DESCRIPTION_LEN => Err(PomoError::validation(
            format!("description must be at most {MAX_DESCRIPTION_LEN} characters"),
        )),
        _ => Ok(()),
    }
}

fn validate_count(field: &str, n: i64) -> Result<(), PomoError> {
    if n < 0 {
        return Err(PomoError::validation(format!("{field} must be >= 0")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, h, 0, 0).unwrap()
    }

    fn sample() -> Task {
        Task {
            id: "t1".into(),
            owner_id: "a1".into(),
            title: "Write report".into(),
            description: None,
            priority: TaskPriority::Medium,
            status: TaskStatus::Todo,
            planned_date: None,
            estimate_pomodoros: 2,
            completed_pomodoros: 0,
            version: 1,
            completed_at: None,
            created_at: at(8),
            updated_at: at(8),
        }
    }

    #[test]
    fn done_stamps_completed_at_and_reopen_clears_it() {
        let done = TaskPatch {
            status: Some(TaskStatus::Done),
            ..Default::default()
        }
        .apply(&sample(), at(9));
        assert_eq!(done.completed_at, Some(at(9)));
        assert_eq!(done.version, 2);

        let retitled = TaskPatch {
            title: Some("Renamed".into()),
            ..Default::default()
        }
        .apply(&done, at(10));
        assert_eq!(retitled.completed_at, Some(at(9)));

        let reopened = TaskPatch {
            status: Some(TaskStatus::InProgress),
            ..Default::default()
        }
        .apply(&retitled, at(11));
        assert_eq!(reopened.completed_at, None);
        assert_eq!(reopened.version, 4);
    }

    #[test]
    fn updated_at_advances_even_when_clock_stands_still() {
        let task = sample();
        let next = TaskPatch::default().apply(&task, task.updated_at);
        assert!(next.updated_at > task.updated_at);
    }

    #[test]
    fn patch_rejects_bad_fields() {
        let patch = TaskPatch {
            title: Some(String::new()),
            ..Default::default()
        };
        assert!(patch.validate().is_err());

        let patch = TaskPatch {
            completed_pomodoros: Some(-1),
            ..Default::default()
        };
        assert!(patch.validate().is_err());
    }
}
