//! Stateless validation over a single proposed interval. Checks run in
//! business time.

use chrono::{DateTime, Datelike, NaiveDate, Utc, Weekday};

use crate::limits::MAX_APPOINTMENT_MINUTES;
use crate::model::Interval;
use crate::tz;

use super::EngineError;

/// Which rules apply to a candidate. Appointments and per-day bulk blocks
/// are weekday-only; a manual block may land on any day of the week.
#[derive(Debug, Clone, Copy)]
pub struct RuleSet {
    pub require_weekday: bool,
    pub max_minutes: Option<i64>,
}

impl RuleSet {
    pub fn appointment() -> Self {
        Self {
            require_weekday: true,
            max_minutes: Some(MAX_APPOINTMENT_MINUTES),
        }
    }

    pub fn manual_block() -> Self {
        Self {
            require_weekday: false,
            max_minutes: None,
        }
    }

    pub fn bulk_block() -> Self {
        Self {
            require_weekday: true,
            max_minutes: None,
        }
    }
}

pub fn is_weekday(date: NaiveDate) -> bool {
    !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Zero-tolerance floor: a bounded interval may start now, never earlier.
pub fn is_not_past(start: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    start >= now
}

/// Bounded intervals must sit inside one office day: start within
/// `[08:00, 17:00)` and end no later than 17:00 on the same business date.
/// Spilling past either edge invalidates the whole interval.
pub fn within_office_hours(start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
    let s = tz::to_business(start);
    let e = tz::to_business(end);
    if s.date_naive() != e.date_naive() {
        return false;
    }
    s.time() >= tz::office_open() && s.time() < tz::office_close() && e.time() <= tz::office_close()
}

pub fn within_duration(start: DateTime<Utc>, end: DateTime<Utc>, cap_minutes: i64) -> bool {
    (end - start).num_minutes() <= cap_minutes
}

/// Run every applicable rule, returning all violations in priority order
/// (past, weekend, office hours, duration). Full-day candidates skip the
/// office-hours and duration checks; their past check compares business
/// dates, since their `start` time-of-day carries no meaning.
pub fn validate(candidate: &Interval, now: DateTime<Utc>, rules: &RuleSet) -> Vec<EngineError> {
    let mut violations = Vec::new();
    let date = tz::business_date(candidate.start);

    match candidate.end {
        Some(_) => {
            if !is_not_past(candidate.start, now) {
                violations.push(EngineError::PastStartTime(candidate.start));
            }
        }
        None => {
            if date < tz::business_date(now) {
                violations.push(EngineError::PastStartTime(candidate.start));
            }
        }
    }

    if rules.require_weekday && !is_weekday(date) {
        violations.push(EngineError::WeekendNotAllowed(date));
    }

    if let Some(end) = candidate.end {
        if !within_office_hours(candidate.start, end) {
            violations.push(EngineError::OutsideOfficeHours {
                start: candidate.start,
                end,
            });
        }
        if let Some(cap) = rules.max_minutes
            && !within_duration(candidate.start, end, cap)
        {
            violations.push(EngineError::DurationExceeded {
                minutes: (end - candidate.start).num_minutes(),
                cap,
            });
        }
    }

    violations
}
