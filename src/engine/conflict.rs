//! Accept/reject decisions for a proposed interval against a counselor's
//! existing calendar.

use chrono::{DateTime, Utc};

use crate::model::{Interval, IntervalKind};
use crate::tz;

use super::rules::{self, RuleSet};
use super::EngineError;

/// Outcome of resolving one candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Accept,
    Reject(EngineError),
}

impl Decision {
    pub fn is_accept(&self) -> bool {
        matches!(self, Decision::Accept)
    }
}

/// Decide whether `proposed` may be created given the owner's `existing`
/// intervals. Validation runs first so the cheap checks short-circuit the
/// scan; appointments then enforce one active appointment per subject per
/// business day; the scan itself reports the first overlap in `existing`'s
/// iteration order, so callers must pass a stably sorted snapshot.
pub fn resolve(
    proposed: &Interval,
    existing: &[Interval],
    now: DateTime<Utc>,
    rules: &RuleSet,
) -> Decision {
    let violations = rules::validate(proposed, now, rules);
    if let Some(first) = violations.into_iter().next() {
        return Decision::Reject(first);
    }

    if let IntervalKind::Appointment { subject_id, .. } = &proposed.kind {
        let date = tz::business_date(proposed.start);
        for other in existing.iter().filter(|i| i.owner_id == proposed.owner_id) {
            if let IntervalKind::Appointment {
                subject_id: other_subject,
                status,
                ..
            } = &other.kind
                && other_subject == subject_id
                && status.is_active()
                && tz::business_date(other.start) == date
            {
                return Decision::Reject(EngineError::DuplicateActiveAppointment {
                    subject_id: *subject_id,
                    date,
                });
            }
        }
    }

    for other in existing.iter().filter(|i| i.owner_id == proposed.owner_id) {
        if other.is_active() && proposed.overlaps(other) {
            return Decision::Reject(EngineError::Conflict(other.id));
        }
    }

    Decision::Accept
}
