use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::error::PomoError;

pub fn parse_date(s: &str) -> Result<NaiveDate, PomoError> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|_| PomoError::validation(format!("Invalid date '{s}', expected YYYY-MM-DD")))
}

pub fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, PomoError> {
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|_| {
            PomoError::validation(format!(
                "Invalid timestamp '{s}', expected RFC 3339 with an offset"
            ))
        })
}

/// First instant of `date` in `tz`, as UTC. When local midnight does not
/// exist (DST gap) the first valid local minute of the day is used; when it
/// is ambiguous the earlier instant wins.
pub fn local_day_start(date: NaiveDate, tz: Tz) -> DateTime<Utc> {
    let midnight = date.and_time(NaiveTime::MIN);
    tz.from_local_datetime(&midnight)
        .earliest()
        .or_else(|| {
            (1..=24 * 60).find_map(|m| {
                tz.from_local_datetime(&(midnight + Duration::minutes(m)))
                    .earliest()
            })
        })
        .map(|t| t.with_timezone(&Utc))
        .unwrap_or_else(|| Utc.from_utc_datetime(&midnight))
}

/// Half-open UTC interval covering `days` local calendar days from `start`.
pub fn local_days_utc(start: NaiveDate, days: u64, tz: Tz) -> (DateTime<Utc>, DateTime<Utc>) {
    let end = start + chrono::Days::new(days);
    (local_day_start(start, tz), local_day_start(end, tz))
}

/// Calendar date of an instant as seen in `tz`.
pub fn local_date(t: DateTime<Utc>, tz: Tz) -> NaiveDate {
    t.with_timezone(&tz).date_naive()
}

/// Local day a session that ended at `ended_at` ran in: the day of its last
/// running millisecond, so a session ending at 00:00 counts for the day before.
pub fn session_day(ended_at: DateTime<Utc>, tz: Tz) -> NaiveDate {
    local_date(ended_at - Duration::milliseconds(1), tz)
}
