//! Versioned task records with optimistic concurrency.
//!
//! Writers must present the version they last read. The conditional
//! `UPDATE ... WHERE version = ?` in [`task_repo::compare_and_write`] is the
//! only serialization point: of any number of racing updates against one
//! version exactly one lands, the rest come back as [`UpdateOutcome::Conflict`]
//! carrying the record that is actually stored.

use rusqlite::Connection;

use crate::clock::Clock;
use crate::db::task_repo::TaskSelection;
use crate::db::{session_repo, task_repo, UnitOfWork};
use crate::engine::calendar;
use crate::error::PomoError;
use crate::models::{Account, NewTask, Page, PageRequest, Task, TaskPatch, TaskStatus};

/// Listing filters, matching the client's tabs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskFilter {
    All,
    Today,
    Tomorrow,
    Completed,
}

impl TaskFilter {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Today => "today",
            Self::Tomorrow => "tomorrow",
            Self::Completed => "completed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "all" => Some(Self::All),
            "today" => Some(Self::Today),
            "tomorrow" => Some(Self::Tomorrow),
            "completed" => Some(Self::Completed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    Updated(Task),
    /// Nothing was written; `latest` is the stored record to rebase on.
    Conflict { expected: i64, latest: Task },
    NotFound,
}

impl UpdateOutcome {
    /// Collapse into a `Result`, turning a conflict into `STALE_DATA` with the
    /// latest record attached.
    pub fn into_result(self, reference: &str) -> Result<Task, PomoError> {
        match self {
            Self::Updated(task) => Ok(task),
            Self::Conflict { expected, latest } => {
                let err = PomoError::stale_data(expected, latest.version);
                Err(match serde_json::to_value(&latest) {
                    Ok(value) => err.with_latest(value),
                    Err(_) => err,
                })
            }
            Self::NotFound => Err(PomoError::task_not_found(reference)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletedTask {
    pub task: Task,
    pub sessions_removed: usize,
}

pub struct TaskStore<'a> {
    conn: &'a Connection,
    clock: &'a dyn Clock,
}

impl<'a> TaskStore<'a> {
    pub fn new(conn: &'a Connection, clock: &'a dyn Clock) -> Self {
        Self { conn, clock }
    }

    pub fn create(&self, owner_id: &str, new: NewTask) -> Result<Task, PomoError> {
        new.validate()?;
        let now = self.clock.now();
        let task = Task {
            id: ulid::Ulid::new().to_string(),
            owner_id: owner_id.to_string(),
            title: new.title,
            description: new.description,
            priority: new.priority,
            status: TaskStatus::Todo,
            planned_date: new.planned_date,
            estimate_pomodoros: new.estimate_pomodoros,
            completed_pomodoros: 0,
            version: 1,
            completed_at: None,
            created_at: now,
            updated_at: now,
        };
        task_repo::insert_task(self.conn, &task)?;
        tracing::info!(task_id = %task.id, owner_id, "task created");
        Ok(task)
    }

    /// Look up by full ID or unique prefix.
    pub fn get(&self, owner_id: &str, reference: &str) -> Result<Task, PomoError> {
        task_repo::resolve_task(self.conn, owner_id, reference)
    }

    pub fn list(
        &self,
        owner: &Account,
        filter: TaskFilter,
        page: PageRequest,
    ) -> Result<Page<Task>, PomoError> {
        let selection = match filter {
            TaskFilter::All => TaskSelection::All,
            TaskFilter::Completed => TaskSelection::Completed,
            TaskFilter::Today | TaskFilter::Tomorrow => {
                let today = calendar::local_date(self.clock.now(), owner.tz()?);
                let day = if filter == TaskFilter::Tomorrow {
                    today + chrono::Days::new(1)
                } else {
                    today
                };
                TaskSelection::PlannedOn(day)
            }
        };
        let items = task_repo::list_tasks(
            self.conn,
            &owner.id,
            selection,
            page.page_size,
            page.offset(),
        )?;
        let total = task_repo::count_tasks(self.conn, &owner.id, selection)?;
        tracing::debug!(owner_id = %owner.id, filter = filter.as_str(), total, "listed tasks");
        Ok(Page {
            items,
            page: page.page,
            page_size: page.page_size,
            total,
        })
    }

    /// Every task of the owner in listing order, unpaged. This is what a
    /// sync poll fingerprints.
    pub fn all(&self, owner_id: &str) -> Result<Vec<Task>, PomoError> {
        // LIMIT -1 is unbounded in SQLite.
        task_repo::list_tasks(self.conn, owner_id, TaskSelection::All, -1, 0)
    }

    /// Apply `patch` if the stored version still equals `expected_version`.
    /// `id` must be a full task ID.
    pub fn update(
        &self,
        owner_id: &str,
        id: &str,
        expected_version: i64,
        patch: &TaskPatch,
    ) -> Result<UpdateOutcome, PomoError> {
        if expected_version < 1 {
            return Err(PomoError::validation("version must be >= 1"));
        }
        patch.validate()?;

        let Some(current) = task_repo::find_task(self.conn, owner_id, id)? else {
            return Ok(UpdateOutcome::NotFound);
        };
        if current.version != expected_version {
            tracing::warn!(
                task_id = id,
                expected = expected_version,
                actual = current.version,
                "stale task update rejected"
            );
            return Ok(UpdateOutcome::Conflict {
                expected: expected_version,
                latest: current,
            });
        }

        let next = patch.apply(&current, self.clock.now());
        if task_repo::compare_and_write(self.conn, &next, expected_version)? == 0 {
            // Lost the race between read and write; report what won.
            return Ok(match task_repo::find_task(self.conn, owner_id, id)? {
                Some(latest) => {
                    tracing::warn!(task_id = id, expected = expected_version, "task update lost race");
                    UpdateOutcome::Conflict {
                        expected: expected_version,
                        latest,
                    }
                }
                None => UpdateOutcome::NotFound,
            });
        }

        tracing::info!(task_id = id, version = next.version, status = next.status.as_str(), "task updated");
        Ok(UpdateOutcome::Updated(next))
    }

    /// Delete a task together with every session that references it.
    pub fn delete(&self, owner_id: &str, id: &str) -> Result<DeletedTask, PomoError> {
        let uow = UnitOfWork::begin(self.conn)?;
        let task = task_repo::get_task_by_id(uow.conn(), owner_id, id)?;
        let sessions_removed = session_repo::delete_sessions_for_task(uow.conn(), owner_id, &task.id)?;
        if task_repo::delete_task(uow.conn(), owner_id, &task.id)? == 0 {
            return Err(PomoError::task_not_found(id));
        }
        uow.commit()?;

        tracing::info!(task_id = %task.id, sessions_removed, "task deleted");
        Ok(DeletedTask {
            task,
            sessions_removed,
        })
    }
}
