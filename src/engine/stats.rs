//! Daily and weekly focus statistics in an account's local time.
//!
//! Windows are built from local midnights and converted to UTC for the range
//! query. `daily` counts focus sessions and completed tasks whose timestamp
//! falls in [midnight, next midnight). `weekly` buckets each focus session on
//! the local day it ran in, so its `endedAt` falls in (midnight, next
//! midnight] and one that ends at 23:58 or exactly at 00:00 local time lands
//! on that evening's date whatever its UTC date is. The two only disagree on
//! a session ending at exactly 00:00 local.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use chrono_tz::Tz;
use rusqlite::Connection;
use serde::Serialize;

use crate::db::{session_repo, task_repo};
use crate::engine::calendar;
use crate::error::PomoError;

pub const WEEK_DAYS: u64 = 7;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyStats {
    pub date: NaiveDate,
    pub focus_count: usize,
    pub total_focus_minutes: i64,
    pub completed_tasks: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WeeklyStats {
    pub start: NaiveDate,
    /// Minutes per local day; all seven days are present.
    pub days: BTreeMap<NaiveDate, i64>,
    pub total_focus_minutes: i64,
}

pub struct StatsAggregator<'a> {
    conn: &'a Connection,
}

impl<'a> StatsAggregator<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    pub fn daily(&self, owner_id: &str, date: NaiveDate, tz: Tz) -> Result<DailyStats, PomoError> {
        let (start, end) = calendar::local_days_utc(date, 1, tz);
        let sessions = session_repo::completed_focus_between(self.conn, owner_id, start, end)?;
        let completed_tasks = task_repo::count_completed_between(self.conn, owner_id, start, end)?;

        let total_sec = sessions
            .iter()
            .fold(0i64, |acc, (_, duration_sec)| acc.saturating_add(*duration_sec));
        tracing::debug!(owner_id, %date, %start, %end, sessions = sessions.len(), "daily stats");
        Ok(DailyStats {
            date,
            focus_count: sessions.len(),
            total_focus_minutes: total_sec.div_euclid(60),
            completed_tasks,
        })
    }

    pub fn weekly(&self, owner_id: &str, start_date: NaiveDate, tz: Tz) -> Result<WeeklyStats, PomoError> {
        let (start, end) = calendar::local_days_utc(start_date, WEEK_DAYS, tz);
        let sessions = session_repo::completed_focus_ending_within(self.conn, owner_id, start, end)?;

        let mut days: BTreeMap<NaiveDate, i64> = start_date
            .iter_days()
            .take(WEEK_DAYS as usize)
            .map(|day| (day, 0))
            .collect();
        for (ended_at, duration_sec) in &sessions {
            let day = calendar::session_day(*ended_at, tz);
            let minutes = days.entry(day).or_insert(0);
            *minutes = minutes.saturating_add(duration_sec.div_euclid(60));
        }
        let total_focus_minutes = days.values().fold(0i64, |acc, m| acc.saturating_add(*m));

        tracing::debug!(owner_id, %start_date, sessions = sessions.len(), "weekly stats");
        Ok(WeeklyStats {
            start: start_date,
            days,
            total_focus_minutes,
        })
    }
}
