use chrono::{DateTime, Datelike, NaiveDate, Utc};
use tracing::{debug, info, warn};
use ulid::Ulid;

use crate::limits::{MAX_BULK_DATES, MAX_NOTES_LEN, MAX_REASON_LEN};
use crate::model::{AppointmentStatus, GroupKind, Interval, IntervalKind};
use crate::observability;
use crate::tz;

use super::conflict::{resolve, Decision};
use super::grouping::BlockGroup;
use super::rules::{self, RuleSet};
use super::{Engine, EngineError};

/// Aggregate outcome of a multi-date operation. Partial failure is the
/// normal case: every evaluated item lands exactly once, in `succeeded` or
/// in `failed`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BulkReport {
    pub succeeded: Vec<Interval>,
    pub failed: Vec<BulkFailure>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkFailure {
    pub date: NaiveDate,
    pub error: EngineError,
}

impl BulkReport {
    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }
}

impl Engine {
    /// Validate and persist an appointment for a subject. Rejections come
    /// back as typed error values; callers branch on [`EngineError::code`].
    pub async fn schedule_appointment(
        &self,
        owner_id: Ulid,
        subject_id: Ulid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        notes: Option<String>,
    ) -> Result<Interval, EngineError> {
        if let Some(n) = &notes
            && n.len() > MAX_NOTES_LEN
        {
            return Err(EngineError::LimitExceeded("notes too long"));
        }
        if end <= start {
            return Err(EngineError::InvalidTimestamp(format!(
                "end {end} is not after start {start}"
            )));
        }
        let candidate = Interval::appointment(
            owner_id,
            subject_id,
            start,
            end,
            AppointmentStatus::Scheduled,
            notes,
        );
        self.admit(candidate, RuleSet::appointment()).await
    }

    /// Move an existing appointment to new bounds. The resolver re-runs
    /// against the target day with the appointment itself excluded, and a
    /// pending reschedule settles back to `Scheduled` on success.
    pub async fn reschedule_appointment(
        &self,
        id: Ulid,
        new_start: DateTime<Utc>,
        new_end: DateTime<Utc>,
    ) -> Result<Interval, EngineError> {
        let current = self.store.get(id).await?;
        if !current.is_appointment() {
            return Err(EngineError::NotFound(id));
        }
        if new_end <= new_start {
            return Err(EngineError::InvalidTimestamp(format!(
                "end {new_end} is not after start {new_start}"
            )));
        }

        let mut updated = current;
        updated.start = new_start;
        updated.end = Some(new_end);
        if let IntervalKind::Appointment { status, .. } = &mut updated.kind {
            *status = AppointmentStatus::Scheduled;
        }

        let now = self.now();
        let existing = self
            .day_snapshot(updated.owner_id, tz::business_date(new_start))
            .await?;
        let others: Vec<Interval> = existing.into_iter().filter(|i| i.id != id).collect();

        match resolve(&updated, &others, now, &RuleSet::appointment()) {
            Decision::Accept => {
                let saved = self.store.update(updated).await?;
                info!(id = %saved.id, "appointment rescheduled");
                Ok(saved)
            }
            Decision::Reject(reason) => {
                debug!(id = %id, code = reason.code(), "reschedule rejected");
                Err(reason)
            }
        }
    }

    /// Mark an appointment cancelled; its slot becomes bookable again.
    pub async fn cancel_appointment(&self, id: Ulid) -> Result<Interval, EngineError> {
        let mut current = self.store.get(id).await?;
        match &mut current.kind {
            IntervalKind::Appointment { status, .. } => *status = AppointmentStatus::Cancelled,
            IntervalKind::Block { .. } => return Err(EngineError::NotFound(id)),
        }
        let saved = self.store.update(current).await?;
        info!(id = %saved.id, "appointment cancelled");
        Ok(saved)
    }

    /// Full-day manual block. Any day of the week is allowed.
    pub async fn create_block(
        &self,
        owner_id: Ulid,
        date: NaiveDate,
        reason: String,
    ) -> Result<Interval, EngineError> {
        self.create_full_day(owner_id, date, reason, GroupKind::None, RuleSet::manual_block())
            .await
    }

    /// Bounded manual block within office hours.
    pub async fn create_partial_block(
        &self,
        owner_id: Ulid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        reason: String,
    ) -> Result<Interval, EngineError> {
        if reason.len() > MAX_REASON_LEN {
            return Err(EngineError::LimitExceeded("reason too long"));
        }
        if end <= start {
            return Err(EngineError::InvalidTimestamp(format!(
                "end {end} is not after start {start}"
            )));
        }
        let candidate = Interval::block(owner_id, start, Some(end), reason, GroupKind::None);
        self.admit(candidate, RuleSet::manual_block()).await
    }

    pub async fn delete_block(&self, id: Ulid) -> Result<(), EngineError> {
        let current = self.store.get(id).await?;
        if !current.is_block() {
            return Err(EngineError::NotFound(id));
        }
        self.store.delete(id).await
    }

    /// Block many dates in one request. Each date is evaluated against a
    /// fresh store snapshot, so earlier successes in the batch are visible
    /// to later dates; one failure never aborts the rest.
    pub async fn bulk_block_dates(
        &self,
        owner_id: Ulid,
        dates: &[NaiveDate],
        reason: &str,
    ) -> Result<BulkReport, EngineError> {
        if dates.len() > MAX_BULK_DATES {
            return Err(EngineError::LimitExceeded("too many dates in bulk request"));
        }
        if reason.len() > MAX_REASON_LEN {
            return Err(EngineError::LimitExceeded("reason too long"));
        }

        let mut report = BulkReport::default();
        for &date in dates {
            let outcome = self
                .create_full_day(
                    owner_id,
                    date,
                    reason.to_string(),
                    GroupKind::Bulk,
                    RuleSet::bulk_block(),
                )
                .await;
            match outcome {
                Ok(interval) => {
                    metrics::counter!(observability::BULK_ITEMS_TOTAL, "outcome" => "ok")
                        .increment(1);
                    report.succeeded.push(interval);
                }
                Err(error) => {
                    metrics::counter!(observability::BULK_ITEMS_TOTAL, "outcome" => "failed")
                        .increment(1);
                    report.failed.push(BulkFailure { date, error });
                }
            }
        }
        info!(
            owner = %owner_id,
            ok = report.succeeded.len(),
            failed = report.failed.len(),
            "bulk block finished"
        );
        Ok(report)
    }

    /// Auto-generate a leave block for every weekday of the month, skipping
    /// dates that already carry a full-day block.
    pub async fn create_month_leave(
        &self,
        owner_id: Ulid,
        year: i32,
        month: u32,
        reason: &str,
    ) -> Result<BulkReport, EngineError> {
        if reason.len() > MAX_REASON_LEN {
            return Err(EngineError::LimitExceeded("reason too long"));
        }
        let days = weekdays_of_month(year, month)?;

        let mut report = BulkReport::default();
        for date in days {
            match self.month_leave_day(owner_id, date, reason).await {
                Ok(Some(interval)) => report.succeeded.push(interval),
                Ok(None) => {} // already fully blocked, not a candidate
                Err(error) => report.failed.push(BulkFailure { date, error }),
            }
        }
        info!(
            owner = %owner_id,
            ok = report.succeeded.len(),
            failed = report.failed.len(),
            "month leave {year}-{month:02} finished"
        );
        Ok(report)
    }

    /// Delete every member of a derived group. The only multi-record delete
    /// path; reports partial failure exactly like the bulk creators.
    pub async fn delete_group(&self, group: &BlockGroup) -> BulkReport {
        let mut report = BulkReport::default();
        for member in &group.members {
            match self.store.delete(member.id).await {
                Ok(()) => report.succeeded.push(member.clone()),
                Err(error) => {
                    warn!(id = %member.id, %error, "group member delete failed");
                    report.failed.push(BulkFailure {
                        date: tz::business_date(member.start),
                        error,
                    });
                }
            }
        }
        report
    }

    /// Shared per-candidate path: snapshot the owner's day, resolve, persist
    /// on accept.
    async fn admit(&self, candidate: Interval, rules: RuleSet) -> Result<Interval, EngineError> {
        let now = self.now();
        let existing = self
            .day_snapshot(candidate.owner_id, tz::business_date(candidate.start))
            .await?;
        match resolve(&candidate, &existing, now, &rules) {
            Decision::Accept => {
                metrics::counter!(observability::DECISIONS_TOTAL, "outcome" => "accept")
                    .increment(1);
                let created = self.store.create(candidate).await?;
                debug!(id = %created.id, owner = %created.owner_id, "interval accepted");
                Ok(created)
            }
            Decision::Reject(reason) => {
                metrics::counter!(observability::DECISIONS_TOTAL, "outcome" => "reject")
                    .increment(1);
                if matches!(reason, EngineError::Conflict(_)) {
                    metrics::counter!(observability::CONFLICTS_TOTAL).increment(1);
                }
                debug!(owner = %candidate.owner_id, code = reason.code(), "interval rejected");
                Err(reason)
            }
        }
    }

    async fn create_full_day(
        &self,
        owner_id: Ulid,
        date: NaiveDate,
        reason: String,
        group: GroupKind,
        rules: RuleSet,
    ) -> Result<Interval, EngineError> {
        if reason.len() > MAX_REASON_LEN {
            return Err(EngineError::LimitExceeded("reason too long"));
        }
        let (open, _) = tz::office_day_bounds(date)?;
        let candidate = Interval::block(owner_id, open, None, reason, group);
        self.admit(candidate, rules).await
    }

    async fn month_leave_day(
        &self,
        owner_id: Ulid,
        date: NaiveDate,
        reason: &str,
    ) -> Result<Option<Interval>, EngineError> {
        let existing = self.day_snapshot(owner_id, date).await?;
        if existing.iter().any(|i| i.is_block() && i.is_full_day()) {
            return Ok(None);
        }
        self.create_full_day(
            owner_id,
            date,
            reason.to_string(),
            GroupKind::MonthLeave,
            RuleSet::bulk_block(),
        )
        .await
        .map(Some)
    }
}

fn weekdays_of_month(year: i32, month: u32) -> Result<Vec<NaiveDate>, EngineError> {
    let first = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(|| {
        EngineError::InvalidTimestamp(format!("invalid month: {year}-{month}"))
    })?;
    let mut days = Vec::new();
    let mut date = first;
    while date.month() == month {
        if rules::is_weekday(date) {
            days.push(date);
        }
        date = match date.succ_opt() {
            Some(next) => next,
            None => break,
        };
    }
    Ok(days)
}
