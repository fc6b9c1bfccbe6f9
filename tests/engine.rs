use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;
use rusqlite::Connection;

use pomotask::clock::{Clock, FixedClock};
use pomotask::db::{account_repo, open_in_memory, session_repo, task_repo, UnitOfWork};
use pomotask::engine::session_engine::MAX_DURATION_SEC;
use pomotask::engine::{
    sync_guard, RecoveryReconciler, SessionEngine, StartSession, StatsAggregator, SyncOutcome,
    TaskFilter, TaskStore, TaskView, UpdateOutcome,
};
use pomotask::error::ErrorCode;
use pomotask::models::{
    Account, CancelledBy, NewTask, PageRequest, SessionStatus, SessionType, TaskPatch, TaskStatus,
};

// ─── helpers ───────────────────────────────────────────────────────

fn utc(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

struct Fixture {
    conn: Connection,
    clock: FixedClock,
    account: Account,
}

impl Fixture {
    fn new(timezone: &str) -> Self {
        let conn = open_in_memory().unwrap();
        let clock = FixedClock::new(Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap());
        let account =
            account_repo::create_account(&conn, "acc-1", "alice", timezone, utc("2024-01-01T00:00:00Z"))
                .unwrap();
        Self {
            conn,
            clock,
            account,
        }
    }

    fn tasks(&self) -> TaskStore<'_> {
        TaskStore::new(&self.conn, &self.clock)
    }

    fn sessions(&self) -> SessionEngine<'_> {
        SessionEngine::new(&self.conn, &self.clock)
    }

    fn tz(&self) -> Tz {
        self.account.tz().unwrap()
    }

    fn owner(&self) -> &str {
        &self.account.id
    }

    fn retitle(&self, id: &str, version: i64, title: &str) -> UpdateOutcome {
        let patch = TaskPatch {
            title: Some(title.to_string()),
            ..Default::default()
        };
        self.tasks().update(self.owner(), id, version, &patch).unwrap()
    }

    /// Start and complete a focus session between two instants.
    fn focus(&self, task_id: Option<&str>, started: &str, duration_sec: i64, ended: &str) {
        let session = self
            .sessions()
            .start(
                self.owner(),
                StartSession {
                    task_id: task_id.map(str::to_string),
                    session_type: SessionType::Focus,
                    duration_sec: Some(duration_sec),
                    started_at: Some(utc(started)),
                },
            )
            .unwrap();
        self.sessions()
            .complete(self.owner(), &session.id, Some(utc(ended)))
            .unwrap();
    }
}

// ─── TaskStore ─────────────────────────────────────────────────────

#[test]
fn version_grows_by_one_per_update() {
    let fx = Fixture::new("Asia/Seoul");
    let task = fx.tasks().create(fx.owner(), NewTask::titled("count me")).unwrap();
    assert_eq!(task.version, 1);

    let mut version = task.version;
    for i in 0..5 {
        fx.clock.advance(Duration::seconds(1));
        match fx.retitle(&task.id, version, &format!("v{i}")) {
            UpdateOutcome::Updated(t) => version = t.version,
            other => panic!("unexpected {other:?}"),
        }
    }
    assert_eq!(version, 6);
}

#[test]
fn stale_update_returns_latest_and_writes_nothing() {
    let fx = Fixture::new("Asia/Seoul");
    let task = fx.tasks().create(fx.owner(), NewTask::titled("shared")).unwrap();
    for v in 1..=3 {
        fx.retitle(&task.id, v, &format!("edit {v}"));
    }
    let stored = fx.tasks().get(fx.owner(), &task.id).unwrap();
    assert_eq!(stored.version, 4);

    match fx.retitle(&task.id, 3, "late edit") {
        UpdateOutcome::Conflict { expected, latest } => {
            assert_eq!(expected, 3);
            assert_eq!(latest.version, 4);
            assert_eq!(latest, stored);
        }
        other => panic!("expected conflict, got {other:?}"),
    }
    assert_eq!(fx.tasks().get(fx.owner(), &task.id).unwrap(), stored);

    let err = fx
        .retitle(&task.id, 3, "late edit")
        .into_result(&task.id)
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::StaleData);
    assert_eq!(err.latest.unwrap()["version"], 4);
}

#[test]
fn updated_at_strictly_increases_under_a_frozen_clock() {
    let fx = Fixture::new("Asia/Seoul");
    let task = fx.tasks().create(fx.owner(), NewTask::titled("frozen")).unwrap();
    let UpdateOutcome::Updated(next) = fx.retitle(&task.id, 1, "again") else {
        panic!("update failed");
    };
    assert!(next.updated_at > task.updated_at);
}

#[test]
fn completed_at_follows_done_status() {
    let fx = Fixture::new("Asia/Seoul");
    let task = fx.tasks().create(fx.owner(), NewTask::titled("finish")).unwrap();
    let set_status = |version, status| {
        let patch = TaskPatch {
            status: Some(status),
            ..Default::default()
        };
        match fx.tasks().update(fx.owner(), &task.id, version, &patch).unwrap() {
            UpdateOutcome::Updated(t) => t,
            other => panic!("unexpected {other:?}"),
        }
    };

    let done = set_status(1, TaskStatus::Done);
    assert_eq!(done.completed_at, Some(fx.clock.now()));

    fx.clock.advance(Duration::minutes(5));
    let retitled = match fx.retitle(&task.id, 2, "still done") {
        UpdateOutcome::Updated(t) => t,
        other => panic!("unexpected {other:?}"),
    };
    assert_eq!(retitled.completed_at, done.completed_at);

    let reopened = set_status(3, TaskStatus::InProgress);
    assert_eq!(reopened.completed_at, None);
}

#[test]
fn update_of_missing_task_is_not_found() {
    let fx = Fixture::new("Asia/Seoul");
    assert_eq!(fx.retitle("nope", 1, "x"), UpdateOutcome::NotFound);
    let err = fx.retitle("nope", 1, "x").into_result("nope").unwrap_err();
    assert!(err.code.is_not_found());
}

#[test]
fn id_prefix_wildcards_match_literally() {
    let fx = Fixture::new("Asia/Seoul");
    let task = fx.tasks().create(fx.owner(), NewTask::titled("only")).unwrap();

    for reference in ["%", "_", "__"] {
        let err = fx.tasks().get(fx.owner(), reference).unwrap_err();
        assert_eq!(err.code, ErrorCode::TaskNotFound, "reference {reference:?}");
    }
    assert_eq!(fx.tasks().get(fx.owner(), &task.id[..6]).unwrap(), task);
}

#[test]
fn invalid_patch_is_rejected_before_reading() {
    let fx = Fixture::new("Asia/Seoul");
    let task = fx.tasks().create(fx.owner(), NewTask::titled("ok")).unwrap();
    let patch = TaskPatch {
        title: Some(String::new()),
        ..Default::default()
    };
    let err = fx.tasks().update(fx.owner(), &task.id, 1, &patch).unwrap_err();
    assert_eq!(err.code, ErrorCode::ValidationError);
}

#[test]
fn today_and_tomorrow_use_the_account_timezone() {
    let fx = Fixture::new("Asia/Seoul");
    // 2024-06-01T16:00Z is already 2024-06-02 in Seoul.
    fx.clock.set(utc("2024-06-01T16:00:00Z"));

    let mut today = NewTask::titled("today");
    today.planned_date = Some(date(2024, 6, 2));
    fx.tasks().create(fx.owner(), today).unwrap();
    let mut tomorrow = NewTask::titled("tomorrow");
    tomorrow.planned_date = Some(date(2024, 6, 3));
    fx.tasks().create(fx.owner(), tomorrow).unwrap();

    let page = PageRequest::new(1, 20).unwrap();
    let listed = fx.tasks().list(&fx.account, TaskFilter::Today, page).unwrap();
    assert_eq!(listed.total, 1);
    assert_eq!(listed.items[0].title, "today");

    let listed = fx.tasks().list(&fx.account, TaskFilter::Tomorrow, page).unwrap();
    assert_eq!(listed.items[0].title, "tomorrow");
}

#[test]
fn delete_removes_only_that_tasks_sessions() {
    let fx = Fixture::new("Asia/Seoul");
    let doomed = fx.tasks().create(fx.owner(), NewTask::titled("doomed")).unwrap();
    let kept = fx.tasks().create(fx.owner(), NewTask::titled("kept")).unwrap();
    fx.focus(Some(&doomed.id), "2024-05-01T00:00:00Z", 60, "2024-05-01T00:01:00Z");
    fx.focus(Some(&kept.id), "2024-05-01T01:00:00Z", 60, "2024-05-01T01:01:00Z");

    let deleted = fx.tasks().delete(fx.owner(), &doomed.id).unwrap();
    assert_eq!(deleted.sessions_removed, 1);
    assert_eq!(
        session_repo::count_sessions_for_task(&fx.conn, fx.owner(), &kept.id).unwrap(),
        1
    );
    assert!(task_repo::find_task(&fx.conn, fx.owner(), &doomed.id).unwrap().is_none());
}

// ─── SessionEngine ─────────────────────────────────────────────────

#[test]
fn focus_completion_bumps_counter_and_version_once() {
    let fx = Fixture::new("Asia/Seoul");
    let task = fx.tasks().create(fx.owner(), NewTask::titled("deep work")).unwrap();
    let session = fx
        .sessions()
        .start(
            fx.owner(),
            StartSession {
                task_id: Some(task.id.clone()),
                session_type: SessionType::Focus,
                duration_sec: None,
                started_at: Some(utc("2024-01-01T00:00:00Z")),
            },
        )
        .unwrap();
    assert_eq!(session.duration_sec, 1500);

    let done = fx
        .sessions()
        .complete(fx.owner(), &session.id, Some(utc("2024-01-01T00:25:00Z")))
        .unwrap();
    assert_eq!(done.session.status(), SessionStatus::Completed);
    let after = done.task.unwrap();
    assert_eq!(after.completed_pomodoros, task.completed_pomodoros + 1);
    assert_eq!(after.version, task.version + 1);
}

#[test]
fn terminal_sessions_reject_complete_and_cancel() {
    let fx = Fixture::new("Asia/Seoul");
    let session = fx
        .sessions()
        .start(
            fx.owner(),
            StartSession {
                task_id: None,
                session_type: SessionType::ShortBreak,
                duration_sec: None,
                started_at: None,
            },
        )
        .unwrap();
    fx.clock.advance(Duration::minutes(1));
    let cancelled = fx.sessions().cancel(fx.owner(), &session.id).unwrap();
    assert_eq!(cancelled.status(), SessionStatus::Cancelled);

    let err = fx.sessions().complete(fx.owner(), &session.id, None).unwrap_err();
    assert_eq!(err.code, ErrorCode::SessionFinalized);
    let err = fx.sessions().cancel(fx.owner(), &session.id).unwrap_err();
    assert_eq!(err.code, ErrorCode::SessionFinalized);

    let stored = fx.sessions().get(fx.owner(), &session.id).unwrap();
    assert_eq!(stored, cancelled);
}

#[test]
fn complete_must_end_after_start() {
    let fx = Fixture::new("Asia/Seoul");
    let task = fx.tasks().create(fx.owner(), NewTask::titled("t")).unwrap();
    let started = fx
        .sessions()
        .start(
            fx.owner(),
            StartSession {
                task_id: Some(task.id.clone()),
                session_type: SessionType::Focus,
                duration_sec: Some(1500),
                started_at: Some(utc("2024-01-01T09:00:00Z")),
            },
        )
        .unwrap();

    for ended in ["2024-01-01T09:00:00Z", "2024-01-01T08:59:00Z"] {
        let err = fx
            .sessions()
            .complete(fx.owner(), &started.id, Some(utc(ended)))
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
    }
    assert_eq!(fx.sessions().get(fx.owner(), &started.id).unwrap(), started);
    assert_eq!(fx.tasks().get(fx.owner(), &task.id).unwrap(), task);
}

#[test]
fn second_start_is_rejected_while_one_runs() {
    let fx = Fixture::new("Asia/Seoul");
    let req = StartSession {
        task_id: None,
        session_type: SessionType::Focus,
        duration_sec: None,
        started_at: None,
    };
    fx.sessions().start(fx.owner(), req.clone()).unwrap();
    let err = fx.sessions().start(fx.owner(), req).unwrap_err();
    assert_eq!(err.code, ErrorCode::SessionAlreadyActive);
    assert!(err.code.is_conflict());
}

#[test]
fn zero_duration_is_rejected() {
    let fx = Fixture::new("Asia/Seoul");
    let err = fx
        .sessions()
        .start(
            fx.owner(),
            StartSession {
                task_id: None,
                session_type: SessionType::Focus,
                duration_sec: Some(0),
                started_at: None,
            },
        )
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::ValidationError);
}

#[test]
fn duration_longer_than_a_day_is_rejected() {
    let fx = Fixture::new("Asia/Seoul");
    let start = |duration_sec| {
        fx.sessions().start(
            fx.owner(),
            StartSession {
                task_id: None,
                session_type: SessionType::Focus,
                duration_sec: Some(duration_sec),
                started_at: None,
            },
        )
    };

    for duration_sec in [MAX_DURATION_SEC + 1, i64::MAX] {
        let err = start(duration_sec).unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
    }
    assert!(fx.sessions().active(fx.owner()).unwrap().is_none());
    assert_eq!(start(MAX_DURATION_SEC).unwrap().duration_sec, MAX_DURATION_SEC);
}

#[test]
fn dropped_unit_of_work_rolls_back() {
    let fx = Fixture::new("Asia/Seoul");
    let task = fx.tasks().create(fx.owner(), NewTask::titled("kept")).unwrap();
    {
        let uow = UnitOfWork::begin(&fx.conn).unwrap();
        task_repo::delete_task(uow.conn(), fx.owner(), &task.id).unwrap();
    }
    assert!(task_repo::find_task(&fx.conn, fx.owner(), &task.id).unwrap().is_some());

    let uow = UnitOfWork::begin(&fx.conn).unwrap();
    task_repo::delete_task(uow.conn(), fx.owner(), &task.id).unwrap();
    uow.rollback().unwrap();
    assert!(task_repo::find_task(&fx.conn, fx.owner(), &task.id).unwrap().is_some());
}

#[test]
fn failed_task_write_leaves_session_running() {
    let fx = Fixture::new("Asia/Seoul");
    let task = fx.tasks().create(fx.owner(), NewTask::titled("locked")).unwrap();
    let session = fx
        .sessions()
        .start(
            fx.owner(),
            StartSession {
                task_id: Some(task.id.clone()),
                session_type: SessionType::Focus,
                duration_sec: Some(1500),
                started_at: Some(utc("2024-01-01T00:00:00Z")),
            },
        )
        .unwrap();
    fx.conn
        .execute_batch(
            "CREATE TRIGGER tasks_read_only BEFORE UPDATE ON tasks
             BEGIN SELECT RAISE(ABORT, 'tasks are read-only'); END;",
        )
        .unwrap();

    let err = fx
        .sessions()
        .complete(fx.owner(), &session.id, Some(utc("2024-01-01T00:25:00Z")))
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::DatabaseError);

    let stored = fx.sessions().get(fx.owner(), &session.id).unwrap();
    assert_eq!(stored.status(), SessionStatus::InProgress);
    assert!(stored.state.ended_at().is_none());
    assert_eq!(stored, session);

    let after = fx.tasks().get(fx.owner(), &task.id).unwrap();
    assert_eq!(after.version, task.version);
    assert_eq!(after.completed_pomodoros, task.completed_pomodoros);
}

// ─── RecoveryReconciler ────────────────────────────────────────────

#[test]
fn reset_cancels_running_sessions_once() {
    let fx = Fixture::new("Asia/Seoul");
    let running = fx
        .sessions()
        .start(
            fx.owner(),
            StartSession {
                task_id: None,
                session_type: SessionType::Focus,
                duration_sec: None,
                started_at: None,
            },
        )
        .unwrap();
    fx.clock.advance(Duration::minutes(3));

    let reconciler = RecoveryReconciler::new(&fx.conn, &fx.clock);
    let first = reconciler.reset(fx.owner()).unwrap();
    assert_eq!(first.reset_count, 1);
    assert_eq!(first.timer_state, SessionType::ShortBreak);
    assert_eq!(reconciler.reset(fx.owner()).unwrap().reset_count, 0);

    let stored = fx.sessions().get(fx.owner(), &running.id).unwrap();
    assert_eq!(stored.status(), SessionStatus::Cancelled);
    assert_eq!(stored.state.cancelled_by(), Some(CancelledBy::Recovery));
    assert!(fx.sessions().active(fx.owner()).unwrap().is_none());
}

// ─── StatsAggregator ───────────────────────────────────────────────

#[test]
fn daily_includes_a_morning_focus_session() {
    let fx = Fixture::new("Asia/Seoul");
    // 09:00 to 09:25 local on 2024-01-01.
    fx.focus(None, "2024-01-01T00:00:00Z", 1500, "2024-01-01T00:25:00Z");

    let stats = StatsAggregator::new(&fx.conn)
        .daily(fx.owner(), date(2024, 1, 1), fx.tz())
        .unwrap();
    assert_eq!(stats.focus_count, 1);
    assert_eq!(stats.total_focus_minutes, 25);
}

#[test]
fn daily_floors_the_summed_seconds() {
    let fx = Fixture::new("Asia/Seoul");
    fx.focus(None, "2024-01-01T00:00:00Z", 90, "2024-01-01T00:01:30Z");
    fx.focus(None, "2024-01-01T01:00:00Z", 90, "2024-01-01T01:01:30Z");

    let stats = StatsAggregator::new(&fx.conn)
        .daily(fx.owner(), date(2024, 1, 1), fx.tz())
        .unwrap();
    assert_eq!(stats.total_focus_minutes, 3);
}

#[test]
fn daily_counts_tasks_completed_that_day() {
    let fx = Fixture::new("Asia/Seoul");
    let task = fx.tasks().create(fx.owner(), NewTask::titled("ship")).unwrap();
    // 2024-06-01T16:00Z is 01:00 on 2024-06-02 in Seoul.
    fx.clock.set(utc("2024-06-01T16:00:00Z"));
    let patch = TaskPatch {
        status: Some(TaskStatus::Done),
        ..Default::default()
    };
    fx.tasks().update(fx.owner(), &task.id, 1, &patch).unwrap();

    let agg = StatsAggregator::new(&fx.conn);
    assert_eq!(agg.daily(fx.owner(), date(2024, 6, 2), fx.tz()).unwrap().completed_tasks, 1);
    assert_eq!(agg.daily(fx.owner(), date(2024, 6, 1), fx.tz()).unwrap().completed_tasks, 0);
}

#[test]
fn daily_counts_a_session_ending_at_midnight_on_the_new_day() {
    let fx = Fixture::new("Asia/Seoul");
    // 23:40 local on 2023-12-31, ending exactly at 00:00 on 2024-01-01.
    fx.focus(None, "2023-12-31T14:40:00Z", 1200, "2023-12-31T15:00:00Z");

    let agg = StatsAggregator::new(&fx.conn);
    let jan1 = agg.daily(fx.owner(), date(2024, 1, 1), fx.tz()).unwrap();
    assert_eq!(jan1.focus_count, 1);
    assert_eq!(jan1.total_focus_minutes, 20);
    assert_eq!(agg.daily(fx.owner(), date(2023, 12, 31), fx.tz()).unwrap().focus_count, 0);

    // Weekly still puts it on the evening it ran.
    let week = agg.weekly(fx.owner(), date(2023, 12, 31), fx.tz()).unwrap();
    assert_eq!(week.days[&date(2023, 12, 31)], 20);
    assert_eq!(week.days[&date(2024, 1, 1)], 0);
}

#[test]
fn weekly_buckets_a_late_session_on_its_local_day() {
    let fx = Fixture::new("Asia/Seoul");
    // 23:40 local on 2024-06-09 for 1200s, ending at local midnight.
    fx.focus(None, "2024-06-09T14:40:00Z", 1200, "2024-06-09T15:00:00Z");

    let week = StatsAggregator::new(&fx.conn)
        .weekly(fx.owner(), date(2024, 6, 3), fx.tz())
        .unwrap();
    assert_eq!(week.days.len(), 7);
    assert_eq!(week.days[&date(2024, 6, 9)], 20);
    assert_eq!(week.days[&date(2024, 6, 3)], 0);
    assert_eq!(week.total_focus_minutes, 20);
}

#[test]
fn weekly_uses_local_day_when_utc_date_is_later() {
    let fx = Fixture::new("America/New_York");
    // 23:38 to 23:58 local on 2024-06-09; already 2024-06-10 in UTC.
    fx.focus(None, "2024-06-10T03:38:00Z", 1200, "2024-06-10T03:58:00Z");

    let week = StatsAggregator::new(&fx.conn)
        .weekly(fx.owner(), date(2024, 6, 3), fx.tz())
        .unwrap();
    assert_eq!(week.days[&date(2024, 6, 9)], 20);
    assert!(!week.days.contains_key(&date(2024, 6, 10)));
    assert_eq!(week.total_focus_minutes, 20);
}

#[test]
fn weekly_floors_each_session_before_summing() {
    let fx = Fixture::new("UTC");
    fx.focus(None, "2024-06-03T09:00:00Z", 90, "2024-06-03T09:01:30Z");
    fx.focus(None, "2024-06-03T10:00:00Z", 90, "2024-06-03T10:01:30Z");

    let week = StatsAggregator::new(&fx.conn)
        .weekly(fx.owner(), date(2024, 6, 3), fx.tz())
        .unwrap();
    assert_eq!(week.days[&date(2024, 6, 3)], 2);
}

#[test]
fn breaks_and_cancelled_sessions_are_not_counted() {
    let fx = Fixture::new("UTC");
    let brk = fx
        .sessions()
        .start(
            fx.owner(),
            StartSession {
                task_id: None,
                session_type: SessionType::ShortBreak,
                duration_sec: Some(300),
                started_at: Some(utc("2024-06-03T09:00:00Z")),
            },
        )
        .unwrap();
    fx.sessions()
        .complete(fx.owner(), &brk.id, Some(utc("2024-06-03T09:05:00Z")))
        .unwrap();

    let stats = StatsAggregator::new(&fx.conn)
        .daily(fx.owner(), date(2024, 6, 3), fx.tz())
        .unwrap();
    assert_eq!(stats.focus_count, 0);
    assert_eq!(stats.total_focus_minutes, 0);
}

// ─── ClientSyncGuard ───────────────────────────────────────────────

#[test]
fn poll_flags_an_edit_made_between_polls() {
    let fx = Fixture::new("Asia/Seoul");
    let task = fx.tasks().create(fx.owner(), NewTask::titled("watched")).unwrap();
    let mut view = TaskView::new();

    let first = sync_guard::poll(None, fx.tasks().all(fx.owner()).unwrap(), &mut view);
    assert_eq!(first.outcome, SyncOutcome::Baseline);

    fx.retitle(&task.id, 1, "edited elsewhere");
    let second = sync_guard::poll(
        Some(&first.fingerprint),
        fx.tasks().all(fx.owner()).unwrap(),
        &mut view,
    );
    assert!(matches!(second.outcome, SyncOutcome::Stale(_)));
    assert_ne!(second.fingerprint, first.fingerprint);
    assert_eq!(view.tasks()[0].title, "edited elsewhere");
}
