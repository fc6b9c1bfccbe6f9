use serde::Serialize;
use serde_json::{json, Value};

use crate::engine::{CompletedSession, DeletedTask, PollResult, SyncOutcome};
use crate::error::PomoError;

pub fn success(data: Value) -> Value {
    json!({
        "success": true,
        "data": data
    })
}

pub fn error(err: &PomoError) -> Value {
    let mut body = json!({
        "code": err.code.as_str(),
        "message": err.message
    });
    if let Some(ref latest) = err.latest {
        body["latest"] = latest.clone();
    }
    json!({
        "success": false,
        "error": body
    })
}

/// Serialize any record; models only hold strings, numbers and timestamps.
pub fn record<T: Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

pub fn completed_session(c: &CompletedSession) -> Value {
    json!({
        "session": record(&c.session),
        "task": c.task.as_ref().map(record)
    })
}

pub fn deleted_task(d: &DeletedTask) -> Value {
    json!({
        "deleted": d.task.id,
        "sessions_removed": d.sessions_removed
    })
}

pub fn poll_result(p: &PollResult, task_count: usize) -> Value {
    let (outcome, notice) = match &p.outcome {
        SyncOutcome::Baseline => ("baseline", Value::Null),
        SyncOutcome::Unchanged => ("unchanged", Value::Null),
        SyncOutcome::Stale(notice) => ("stale", record(notice)),
    };
    json!({
        "fingerprint": p.fingerprint.as_str(),
        "outcome": outcome,
        "notice": notice,
        "task_count": task_count
    })
}

/// Print a value as pretty JSON on stdout.
pub fn print(value: &Value) {
    println!("{value:#}");
}
