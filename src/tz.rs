//! Conversions between persisted UTC instants and the fixed business
//! timezone. Every scheduling rule is evaluated in business time, whatever
//! the client's locale.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::clock::Clock;
use crate::engine::EngineError;
use crate::limits::{OFFICE_CLOSE_HOUR, OFFICE_OPEN_HOUR};
use crate::model::{Interval, Window};

/// The office runs on Philippine Time.
pub const BUSINESS_TZ: Tz = chrono_tz::Asia::Manila;

pub fn to_business(instant: DateTime<Utc>) -> DateTime<Tz> {
    instant.with_timezone(&BUSINESS_TZ)
}

/// The current business wall time, read through the injected clock.
pub fn now_business(clock: &dyn Clock) -> DateTime<Tz> {
    to_business(clock.now_utc())
}

/// Naive business wall time -> UTC. Errors on nonexistent or ambiguous wall
/// times rather than clamping. Asia/Manila has had no transitions since
/// 1990, so modern round-trips are exact.
pub fn to_utc(local: NaiveDateTime) -> Result<DateTime<Utc>, EngineError> {
    BUSINESS_TZ
        .from_local_datetime(&local)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| {
            EngineError::InvalidTimestamp(format!(
                "ambiguous or nonexistent business wall time: {local}"
            ))
        })
}

/// RFC 3339 -> UTC.
pub fn parse_utc(s: &str) -> Result<DateTime<Utc>, EngineError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| EngineError::InvalidTimestamp(format!("{s}: {e}")))
}

/// Calendar date of an instant, in business time.
pub fn business_date(instant: DateTime<Utc>) -> NaiveDate {
    to_business(instant).date_naive()
}

pub fn same_business_day(a: DateTime<Utc>, b: DateTime<Utc>) -> bool {
    business_date(a) == business_date(b)
}

pub fn office_open() -> NaiveTime {
    NaiveTime::from_hms_opt(OFFICE_OPEN_HOUR, 0, 0).expect("fixed office hour")
}

pub fn office_close() -> NaiveTime {
    NaiveTime::from_hms_opt(OFFICE_CLOSE_HOUR, 0, 0).expect("fixed office hour")
}

/// UTC bounds of the office day on `date`. This is the span a full-day block
/// occupies, whatever the time-of-day component of its `start`.
pub fn office_day_bounds(date: NaiveDate) -> Result<(DateTime<Utc>, DateTime<Utc>), EngineError> {
    let open = to_utc(date.and_time(office_open()))?;
    let close = to_utc(date.and_time(office_close()))?;
    Ok((open, close))
}

/// UTC bounds of the whole business day `[00:00, next 00:00)` on `date`.
pub fn business_day_bounds(date: NaiveDate) -> Result<(DateTime<Utc>, DateTime<Utc>), EngineError> {
    let next = date
        .succ_opt()
        .ok_or_else(|| EngineError::InvalidTimestamp(format!("date out of range: {date}")))?;
    let start = to_utc(date.and_time(NaiveTime::MIN))?;
    let end = to_utc(next.and_time(NaiveTime::MIN))?;
    Ok((start, end))
}

/// The window an interval effectively occupies: its own bounds, or the
/// office-day span for a full-day block.
pub fn effective_window(interval: &Interval) -> Result<Window, EngineError> {
    match interval.end {
        Some(end) => Ok(Window::new(interval.start, end)),
        None => {
            let (open, close) = office_day_bounds(business_date(interval.start))?;
            Ok(Window::new(open, close))
        }
    }
}
