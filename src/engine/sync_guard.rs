//! Detects task edits made by another client by comparing fingerprints
//! between polls.
//!
//! The last-known fingerprint is owned by the caller: each [`poll`] takes the
//! previous one and hands back the next, so the polling loop holds the only
//! copy.

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;

use crate::models::Task;

pub const STALE_NOTICE: &str = "Tasks were changed on another device. Showing the latest data.";

/// Ordered `id:version:updatedAt` of every visible task, joined with `|`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn of(tasks: &[Task]) -> Self {
        let parts: Vec<String> = tasks
            .iter()
            .map(|t| format!("{}:{}:{}", t.id, t.version, t.updated_at.timestamp_millis()))
            .collect();
        Self(parts.join("|"))
    }

    /// Rehydrate a fingerprint a caller kept from an earlier poll.
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What a client is showing: the last authoritative listing plus edits it
/// has applied optimistically and not yet seen confirmed.
#[derive(Debug, Clone, Default)]
pub struct TaskView {
    tasks: Vec<Task>,
    optimistic: HashMap<String, Task>,
}

impl TaskView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tasks as displayed, with optimistic edits laid over the server copy.
    pub fn tasks(&self) -> Vec<Task> {
        self.tasks
            .iter()
            .map(|t| self.optimistic.get(&t.id).unwrap_or(t).clone())
            .collect()
    }

    pub fn apply_optimistic(&mut self, task: Task) {
        self.optimistic.insert(task.id.clone(), task);
    }

    pub fn pending_edits(&self) -> usize {
        self.optimistic.len()
    }

    fn replace(&mut self, tasks: Vec<Task>) -> usize {
        let discarded = self.optimistic.len();
        self.optimistic.clear();
        self.tasks = tasks;
        discarded
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StaleNotice {
    pub message: &'static str,
    pub discarded_edits: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// First load; nothing to compare against.
    Baseline,
    Unchanged,
    /// Someone else changed the tasks. The view now holds the fresh listing.
    Stale(StaleNotice),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollResult {
    pub fingerprint: Fingerprint,
    pub outcome: SyncOutcome,
}

/// Compare a freshly fetched listing against the previous fingerprint and
/// update `view` accordingly.
pub fn poll(last: Option<&Fingerprint>, fetched: Vec<Task>, view: &mut TaskView) -> PollResult {
    let fingerprint = Fingerprint::of(&fetched);
    let outcome = match last {
        None => {
            view.replace(fetched);
            SyncOutcome::Baseline
        }
        Some(prev) if *prev == fingerprint => SyncOutcome::Unchanged,
        Some(_) => {
            let discarded_edits = view.replace(fetched);
            tracing::warn!(discarded_edits, "remote task changes detected");
            SyncOutcome::Stale(StaleNotice {
                message: STALE_NOTICE,
                discarded_edits,
            })
        }
    };
    PollResult {
        fingerprint,
        outcome,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{TaskPriority, TaskStatus};
    use chrono::{Duration, TimeZone, Utc};

    fn task(id: &str, version: i64) -> Task {
        let t = Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap() + Duration::seconds(version);
        Task {
            id: id.into(),
            owner_id: "a".into(),
            title: id.into(),
            description: None,
            priority: TaskPriority::Medium,
            status: TaskStatus::Todo,
            planned_date: None,
            estimate_pomodoros: 1,
            completed_pomodoros: 0,
            version,
            completed_at: None,
            created_at: t,
            updated_at: t,
        }
    }

    #[test]
    fn first_poll_is_silent_then_changes_are_flagged() {
        let mut view = TaskView::new();
        let first = poll(None, vec![task("a", 1), task("b", 1)], &mut view);
        assert_eq!(first.outcome, SyncOutcome::Baseline);

        let same = poll(Some(&first.fingerprint), vec![task("a", 1), task("b", 1)], &mut view);
        assert_eq!(same.outcome, SyncOutcome::Unchanged);
        assert_eq!(same.fingerprint, first.fingerprint);

        let mut edited = task("a", 1);
        edited.title = "mine".into();
        view.apply_optimistic(edited);
        assert_eq!(view.pending_edits(), 1);

        let changed = poll(Some(&same.fingerprint), vec![task("a", 2), task("b", 1)], &mut view);
        match changed.outcome {
            SyncOutcome::Stale(notice) => assert_eq!(notice.discarded_edits, 1),
            other => panic!("expected stale, got {other:?}"),
        }
        assert_eq!(view.pending_edits(), 0);
        assert_eq!(view.tasks()[0].version, 2);
    }

    #[test]
    fn unchanged_poll_keeps_optimistic_edits() {
        let mut view = TaskView::new();
        let first = poll(None, vec![task("a", 1)], &mut view);
        let mut edited = task("a", 1);
        edited.title = "draft".into();
        view.apply_optimistic(edited);

        poll(Some(&first.fingerprint), vec![task("a", 1)], &mut view);
        assert_eq!(view.tasks()[0].title, "draft");
    }
}
