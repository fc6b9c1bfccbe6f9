pub mod calendar;
pub mod recovery;
pub mod session_engine;
pub mod stats;
pub mod sync_guard;
pub mod task_store;

pub use recovery::{RecoveryReconciler, RecoveryReport};
pub use session_engine::{CompletedSession, SessionEngine, StartSession};
pub use stats::{DailyStats, StatsAggregator, WeeklyStats};
pub use sync_guard::{Fingerprint, PollResult, StaleNotice, SyncOutcome, TaskView};
pub use task_store::{DeletedTask, TaskFilter, TaskStore, UpdateOutcome};
