use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::tz;

/// Appointment lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Pending,
    Scheduled,
    Ongoing,
    ReschedulePending,
    Cancelled,
    Expired,
}

impl AppointmentStatus {
    /// Active appointments still hold their slot. A reschedule that has not
    /// been resolved keeps blocking the subject's day.
    pub fn is_active(&self) -> bool {
        !matches!(self, AppointmentStatus::Cancelled | AppointmentStatus::Expired)
    }
}

/// How a block was created. Month-leave and bulk blocks are regrouped for
/// display and unified deletion; `None` marks an individual block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupKind {
    None,
    MonthLeave,
    Bulk,
}

/// What an interval represents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum IntervalKind {
    /// A counseling session with a student.
    Appointment {
        subject_id: Ulid,
        status: AppointmentStatus,
        notes: Option<String>,
    },
    /// Counselor unavailability.
    Block { reason: String, group: GroupKind },
}

/// A single record on a counselor's calendar. `end == None` marks a full-day
/// block covering the whole office day, whatever the time-of-day component
/// of `start`; otherwise the interval is the half-open window `[start, end)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interval {
    pub id: Ulid,
    pub owner_id: Ulid,
    pub start: DateTime<Utc>,
    pub end: Option<DateTime<Utc>>,
    pub kind: IntervalKind,
}

impl Interval {
    pub fn appointment(
        owner_id: Ulid,
        subject_id: Ulid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        status: AppointmentStatus,
        notes: Option<String>,
    ) -> Self {
        Self {
            id: Ulid::new(),
            owner_id,
            start,
            end: Some(end),
            kind: IntervalKind::Appointment { subject_id, status, notes },
        }
    }

    pub fn block(
        owner_id: Ulid,
        start: DateTime<Utc>,
        end: Option<DateTime<Utc>>,
        reason: String,
        group: GroupKind,
    ) -> Self {
        Self {
            id: Ulid::new(),
            owner_id,
            start,
            end,
            kind: IntervalKind::Block { reason, group },
        }
    }

    pub fn is_appointment(&self) -> bool {
        matches!(self.kind, IntervalKind::Appointment { .. })
    }

    pub fn is_block(&self) -> bool {
        matches!(self.kind, IntervalKind::Block { .. })
    }

    pub fn is_full_day(&self) -> bool {
        self.end.is_none()
    }

    /// Whether this interval still occupies its slot for conflict purposes.
    /// Blocks always do; appointments drop out once cancelled or expired.
    pub fn is_active(&self) -> bool {
        match &self.kind {
            IntervalKind::Appointment { status, .. } => status.is_active(),
            IntervalKind::Block { .. } => true,
        }
    }

    pub fn same_business_day(&self, other: &Interval) -> bool {
        tz::same_business_day(self.start, other.start)
    }

    /// The conflict predicate. Bounded pairs overlap per the half-open rule
    /// (back-to-back intervals sharing an endpoint do not conflict); a
    /// full-day block conflicts with anything on the same business day.
    pub fn overlaps(&self, other: &Interval) -> bool {
        match (self.end, other.end) {
            (Some(self_end), Some(other_end)) => {
                self.start < other_end && other.start < self_end
            }
            _ => self.same_business_day(other),
        }
    }

    pub fn duration_minutes(&self) -> Option<i64> {
        self.end.map(|end| (end - self.start).num_minutes())
    }
}

/// Half-open bounded window `[start, end)` used for store queries and
/// free-slot results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Window {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Window {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        debug_assert!(start < end, "Window start must be before end");
        Self { start, end }
    }

    pub fn duration_minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }

    pub fn overlaps(&self, other: &Window) -> bool {
        self.start < other.end && other.start < self.end
    }

    pub fn contains_instant(&self, t: DateTime<Utc>) -> bool {
        self.start <= t && t < self.end
    }
}
