use chrono::{DateTime, NaiveDate, Utc};
use ulid::Ulid;

/// Every way the engine can refuse or fail a request. Validation and
/// conflict outcomes are ordinary values callers branch on; `Persist` wraps
/// opaque store failures unmodified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    InvalidTimestamp(String),
    PastStartTime(DateTime<Utc>),
    WeekendNotAllowed(NaiveDate),
    OutsideOfficeHours {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
    DurationExceeded {
        minutes: i64,
        cap: i64,
    },
    /// The proposed interval overlaps the identified existing one.
    Conflict(Ulid),
    /// The subject already has an active appointment with this counselor on
    /// that business day.
    DuplicateActiveAppointment {
        subject_id: Ulid,
        date: NaiveDate,
    },
    NotFound(Ulid),
    LimitExceeded(&'static str),
    Persist(String),
}

impl EngineError {
    /// Stable machine-readable code for callers mapping reasons to
    /// user-facing text.
    pub fn code(&self) -> &'static str {
        match self {
            EngineError::InvalidTimestamp(_) => "invalid_timestamp",
            EngineError::PastStartTime(_) => "past_start_time",
            EngineError::WeekendNotAllowed(_) => "weekend_not_allowed",
            EngineError::OutsideOfficeHours { .. } => "outside_office_hours",
            EngineError::DurationExceeded { .. } => "duration_exceeded",
            EngineError::Conflict(_) => "conflict",
            EngineError::DuplicateActiveAppointment { .. } => "duplicate_active_appointment",
            EngineError::NotFound(_) => "not_found",
            EngineError::LimitExceeded(_) => "limit_exceeded",
            EngineError::Persist(_) => "persist",
        }
    }
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::InvalidTimestamp(msg) => write!(f, "invalid timestamp: {msg}"),
            EngineError::PastStartTime(start) => {
                let local = crate::tz::to_business(*start);
                write!(f, "start {} is in the past", local.format("%Y-%m-%d %H:%M"))
            }
            EngineError::WeekendNotAllowed(date) => {
                write!(f, "{date} falls on a weekend")
            }
            EngineError::OutsideOfficeHours { start, end } => {
                let s = crate::tz::to_business(*start);
                let e = crate::tz::to_business(*end);
                write!(
                    f,
                    "{}-{} is outside office hours",
                    s.format("%H:%M"),
                    e.format("%H:%M")
                )
            }
            EngineError::DurationExceeded { minutes, cap } => {
                write!(f, "duration {minutes}min exceeds the {cap}min cap")
            }
            EngineError::Conflict(id) => write!(f, "conflicts with interval: {id}"),
            EngineError::DuplicateActiveAppointment { subject_id, date } => {
                write!(f, "subject {subject_id} already has an active appointment on {date}")
            }
            EngineError::NotFound(id) => write!(f, "not found: {id}"),
            EngineError::LimitExceeded(msg) => write!(f, "limit exceeded: {msg}"),
            EngineError::Persist(e) => write!(f, "store error: {e}"),
        }
    }
}

impl std::error::Error for EngineError {}
