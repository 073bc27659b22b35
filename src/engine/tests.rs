use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use ulid::Ulid;

use super::*;
use crate::clock::FixedClock;
use crate::model::{AppointmentStatus, GroupKind, IntervalKind, Window};
use crate::tz;

fn d(m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, m, day).unwrap()
}

fn at(date: NaiveDate, h: u32, min: u32) -> DateTime<Utc> {
    tz::to_utc(date.and_hms_opt(h, min, 0).unwrap()).unwrap()
}

fn span(from: NaiveDate, to: NaiveDate) -> Window {
    Window::new(at(from, 0, 0), at(to, 0, 0))
}

/// Engine over `store`, frozen at the given business wall time.
fn engine_with(store: Arc<MemoryStore>, date: NaiveDate, h: u32, min: u32) -> Engine {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    Engine::new(store, Arc::new(FixedClock(at(date, h, min))))
}

/// Fresh engine frozen at Monday 2025-03-03 08:00 business time.
fn engine() -> Engine {
    engine_with(Arc::new(MemoryStore::new()), d(3, 3), 8, 0)
}

fn subject() -> Ulid {
    Ulid::new()
}

// ── Appointment scheduling ───────────────────────────────

#[tokio::test]
async fn appointment_into_empty_day_accepted() {
    let eng = engine();
    let owner = Ulid::new();
    let created = eng
        .schedule_appointment(owner, subject(), at(d(3, 10), 9, 0), at(d(3, 10), 9, 30), None)
        .await
        .unwrap();

    assert_eq!(created.owner_id, owner);
    assert_eq!(created.end, Some(at(d(3, 10), 9, 30)));
    let IntervalKind::Appointment { status, .. } = created.kind else {
        panic!("expected appointment");
    };
    assert_eq!(status, AppointmentStatus::Scheduled);

    let listed = eng.list_day(owner, d(3, 10)).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, created.id);
}

#[tokio::test]
async fn appointment_on_saturday_rejected() {
    let eng = engine();
    let err = eng
        .schedule_appointment(Ulid::new(), subject(), at(d(3, 15), 9, 0), at(d(3, 15), 9, 30), None)
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::WeekendNotAllowed(d(3, 15)));
}

#[tokio::test]
async fn appointment_on_fully_blocked_day_rejected() {
    let eng = engine();
    let owner = Ulid::new();
    let block = eng.create_block(owner, d(3, 10), "leave".into()).await.unwrap();

    let err = eng
        .schedule_appointment(owner, subject(), at(d(3, 10), 14, 0), at(d(3, 10), 14, 30), None)
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::Conflict(block.id));
}

#[tokio::test]
async fn appointment_past_start_rejected() {
    let eng = engine_with(Arc::new(MemoryStore::new()), d(3, 3), 10, 0);
    let err = eng
        .schedule_appointment(Ulid::new(), subject(), at(d(3, 3), 9, 0), at(d(3, 3), 9, 30), None)
        .await
        .unwrap_err();
    assert_eq!(err.code(), "past_start_time");
}

#[tokio::test]
async fn appointment_before_office_open_rejected() {
    let eng = engine();
    let err = eng
        .schedule_appointment(Ulid::new(), subject(), at(d(3, 10), 7, 30), at(d(3, 10), 8, 0), None)
        .await
        .unwrap_err();
    assert_eq!(err.code(), "outside_office_hours");
}

#[tokio::test]
async fn appointment_over_duration_cap_rejected() {
    let eng = engine();
    let err = eng
        .schedule_appointment(Ulid::new(), subject(), at(d(3, 10), 9, 0), at(d(3, 10), 10, 30), None)
        .await
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::DurationExceeded { minutes: 90, cap: 60 }
    );
}

#[tokio::test]
async fn appointment_end_not_after_start_rejected() {
    let eng = engine();
    let err = eng
        .schedule_appointment(Ulid::new(), subject(), at(d(3, 10), 9, 0), at(d(3, 10), 9, 0), None)
        .await
        .unwrap_err();
    assert_eq!(err.code(), "invalid_timestamp");
}

#[tokio::test]
async fn overlapping_appointment_reports_conflicting_id() {
    let eng = engine();
    let owner = Ulid::new();
    let first = eng
        .schedule_appointment(owner, subject(), at(d(3, 10), 9, 0), at(d(3, 10), 9, 30), None)
        .await
        .unwrap();
    let err = eng
        .schedule_appointment(owner, subject(), at(d(3, 10), 9, 15), at(d(3, 10), 9, 45), None)
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::Conflict(first.id));
}

#[tokio::test]
async fn back_to_back_appointments_accepted() {
    let eng = engine();
    let owner = Ulid::new();
    eng.schedule_appointment(owner, subject(), at(d(3, 10), 9, 0), at(d(3, 10), 9, 30), None)
        .await
        .unwrap();
    eng.schedule_appointment(owner, subject(), at(d(3, 10), 9, 30), at(d(3, 10), 10, 0), None)
        .await
        .unwrap();
    assert_eq!(eng.list_day(owner, d(3, 10)).await.unwrap().len(), 2);
}

#[tokio::test]
async fn same_owner_different_days_do_not_conflict() {
    let eng = engine();
    let owner = Ulid::new();
    eng.schedule_appointment(owner, subject(), at(d(3, 10), 9, 0), at(d(3, 10), 9, 30), None)
        .await
        .unwrap();
    eng.schedule_appointment(owner, subject(), at(d(3, 11), 9, 0), at(d(3, 11), 9, 30), None)
        .await
        .unwrap();
}

// ── Duplicate-subject rule ───────────────────────────────

#[tokio::test]
async fn duplicate_subject_same_day_rejected() {
    let eng = engine();
    let owner = Ulid::new();
    let student = subject();
    eng.schedule_appointment(owner, student, at(d(3, 10), 9, 0), at(d(3, 10), 9, 30), None)
        .await
        .unwrap();
    // Different, non-overlapping time: still one active appointment per
    // subject per day.
    let err = eng
        .schedule_appointment(owner, student, at(d(3, 10), 14, 0), at(d(3, 10), 14, 30), None)
        .await
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::DuplicateActiveAppointment { subject_id: student, date: d(3, 10) }
    );
}

#[tokio::test]
async fn cancelled_appointment_frees_subject_and_slot() {
    let eng = engine();
    let owner = Ulid::new();
    let student = subject();
    let first = eng
        .schedule_appointment(owner, student, at(d(3, 10), 9, 0), at(d(3, 10), 9, 30), None)
        .await
        .unwrap();
    eng.cancel_appointment(first.id).await.unwrap();

    // Same subject, same day, same slot: allowed again.
    eng.schedule_appointment(owner, student, at(d(3, 10), 9, 0), at(d(3, 10), 9, 30), None)
        .await
        .unwrap();
}

// ── Rescheduling ─────────────────────────────────────────

#[tokio::test]
async fn reschedule_moves_bounds_and_settles_status() {
    let eng = engine();
    let owner = Ulid::new();
    let appt = eng
        .schedule_appointment(owner, subject(), at(d(3, 10), 9, 0), at(d(3, 10), 9, 30), None)
        .await
        .unwrap();

    let moved = eng
        .reschedule_appointment(appt.id, at(d(3, 11), 10, 0), at(d(3, 11), 10, 30))
        .await
        .unwrap();
    assert_eq!(moved.start, at(d(3, 11), 10, 0));

    let stored = eng.list_day(owner, d(3, 11)).await.unwrap();
    assert_eq!(stored.len(), 1);
    let IntervalKind::Appointment { status, .. } = &stored[0].kind else {
        panic!("expected appointment");
    };
    assert_eq!(*status, AppointmentStatus::Scheduled);
    assert!(eng.list_day(owner, d(3, 10)).await.unwrap().is_empty());
}

#[tokio::test]
async fn reschedule_excludes_itself_from_the_scan() {
    let eng = engine();
    let owner = Ulid::new();
    let appt = eng
        .schedule_appointment(owner, subject(), at(d(3, 10), 9, 0), at(d(3, 10), 9, 30), None)
        .await
        .unwrap();

    // Shift within the original window: overlaps only itself, same subject,
    // same day. It must pass both the overlap and duplicate-subject checks.
    eng.reschedule_appointment(appt.id, at(d(3, 10), 9, 15), at(d(3, 10), 9, 45))
        .await
        .unwrap();
}

#[tokio::test]
async fn reschedule_into_conflict_rejected() {
    let eng = engine();
    let owner = Ulid::new();
    let first = eng
        .schedule_appointment(owner, subject(), at(d(3, 10), 9, 0), at(d(3, 10), 9, 30), None)
        .await
        .unwrap();
    let second = eng
        .schedule_appointment(owner, subject(), at(d(3, 10), 10, 0), at(d(3, 10), 10, 30), None)
        .await
        .unwrap();

    let err = eng
        .reschedule_appointment(second.id, at(d(3, 10), 9, 15), at(d(3, 10), 9, 45))
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::Conflict(first.id));
}

#[tokio::test]
async fn reschedule_of_a_block_is_not_found() {
    let eng = engine();
    let owner = Ulid::new();
    let block = eng.create_block(owner, d(3, 10), "leave".into()).await.unwrap();
    let err = eng
        .reschedule_appointment(block.id, at(d(3, 11), 9, 0), at(d(3, 11), 9, 30))
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::NotFound(block.id));
}

// ── Blocks ───────────────────────────────────────────────

#[tokio::test]
async fn manual_full_day_block_allowed_on_weekend() {
    let eng = engine();
    let owner = Ulid::new();
    let block = eng.create_block(owner, d(3, 15), "campus event".into()).await.unwrap();
    assert!(block.is_full_day());
    assert_eq!(eng.list_day(owner, d(3, 15)).await.unwrap().len(), 1);
}

#[tokio::test]
async fn full_day_block_for_today_allowed_after_open() {
    let eng = engine_with(Arc::new(MemoryStore::new()), d(3, 3), 11, 0);
    eng.create_block(Ulid::new(), d(3, 3), "sick".into()).await.unwrap();
}

#[tokio::test]
async fn partial_block_crossing_close_rejected() {
    let eng = engine();
    let err = eng
        .create_partial_block(Ulid::new(), at(d(3, 10), 16, 45), at(d(3, 10), 17, 15), "meeting".into())
        .await
        .unwrap_err();
    assert_eq!(err.code(), "outside_office_hours");
}

#[tokio::test]
async fn partial_block_blocks_appointments() {
    let eng = engine();
    let owner = Ulid::new();
    let block = eng
        .create_partial_block(owner, at(d(3, 10), 14, 0), at(d(3, 10), 15, 0), "case conference".into())
        .await
        .unwrap();
    let err = eng
        .schedule_appointment(owner, subject(), at(d(3, 10), 14, 30), at(d(3, 10), 15, 0), None)
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::Conflict(block.id));
}

#[tokio::test]
async fn delete_block_removes_it() {
    let eng = engine();
    let owner = Ulid::new();
    let block = eng.create_block(owner, d(3, 10), "leave".into()).await.unwrap();
    eng.delete_block(block.id).await.unwrap();
    assert!(eng.list_day(owner, d(3, 10)).await.unwrap().is_empty());
}

#[tokio::test]
async fn delete_block_rejects_appointment_ids() {
    let eng = engine();
    let owner = Ulid::new();
    let appt = eng
        .schedule_appointment(owner, subject(), at(d(3, 10), 9, 0), at(d(3, 10), 9, 30), None)
        .await
        .unwrap();
    let err = eng.delete_block(appt.id).await.unwrap_err();
    assert_eq!(err, EngineError::NotFound(appt.id));
}

// ── Bulk blocking ────────────────────────────────────────

#[tokio::test]
async fn bulk_block_reports_partial_failure() {
    let eng = engine();
    let owner = Ulid::new();
    let dates = [d(3, 10), d(3, 11), d(3, 15)]; // Mon, Tue, Sat
    let report = eng.bulk_block_dates(owner, &dates, "training").await.unwrap();

    assert_eq!(report.total(), 3);
    assert_eq!(report.succeeded.len(), 2);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].date, d(3, 15));
    assert_eq!(report.failed[0].error, EngineError::WeekendNotAllowed(d(3, 15)));

    for block in &report.succeeded {
        assert!(matches!(
            &block.kind,
            IntervalKind::Block { group: GroupKind::Bulk, .. }
        ));
    }
}

#[tokio::test]
async fn bulk_block_failure_does_not_stop_later_dates() {
    let eng = engine();
    let owner = Ulid::new();
    // Weekend first: the failure must not prevent the weekday after it.
    let dates = [d(3, 15), d(3, 17)];
    let report = eng.bulk_block_dates(owner, &dates, "records week").await.unwrap();
    assert_eq!(report.succeeded.len(), 1);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(tz::business_date(report.succeeded[0].start), d(3, 17));
}

#[tokio::test]
async fn bulk_block_sees_earlier_batch_successes() {
    let eng = engine();
    let owner = Ulid::new();
    let report = eng
        .bulk_block_dates(owner, &[d(3, 10), d(3, 10)], "double")
        .await
        .unwrap();
    // The second candidate conflicts with the first one, persisted moments
    // earlier in the same batch.
    assert_eq!(report.succeeded.len(), 1);
    assert_eq!(report.failed.len(), 1);
    assert!(matches!(report.failed[0].error, EngineError::Conflict(_)));
}

#[tokio::test]
async fn bulk_block_rejects_oversized_batches() {
    let eng = engine();
    let dates = vec![d(3, 10); crate::limits::MAX_BULK_DATES + 1];
    let err = eng
        .bulk_block_dates(Ulid::new(), &dates, "too much")
        .await
        .unwrap_err();
    assert_eq!(err.code(), "limit_exceeded");
}

// ── Month leave ──────────────────────────────────────────

#[tokio::test]
async fn month_leave_covers_every_weekday() {
    let eng = engine();
    let owner = Ulid::new();
    // April 2025 has 22 weekdays.
    let report = eng.create_month_leave(owner, 2025, 4, "maternity leave").await.unwrap();
    assert_eq!(report.succeeded.len(), 22);
    assert!(report.failed.is_empty());
    for block in &report.succeeded {
        assert!(matches!(
            &block.kind,
            IntervalKind::Block { group: GroupKind::MonthLeave, .. }
        ));
        assert!(is_weekday(tz::business_date(block.start)));
    }
}

#[tokio::test]
async fn month_leave_skips_already_blocked_dates() {
    let eng = engine();
    let owner = Ulid::new();
    eng.create_block(owner, d(4, 7), "seminar".into()).await.unwrap();

    let report = eng.create_month_leave(owner, 2025, 4, "leave").await.unwrap();
    // The pre-blocked Monday is not a candidate: no success, no failure.
    assert_eq!(report.succeeded.len(), 21);
    assert!(report.failed.is_empty());
    assert!(!report.succeeded.iter().any(|b| tz::business_date(b.start) == d(4, 7)));
}

#[tokio::test]
async fn month_leave_invalid_month_rejected() {
    let eng = engine();
    let err = eng.create_month_leave(Ulid::new(), 2025, 13, "oops").await.unwrap_err();
    assert_eq!(err.code(), "invalid_timestamp");
}

// ── Grouping and group deletion ──────────────────────────

#[tokio::test]
async fn bulk_blocks_group_into_one_spanning_entry() {
    let eng = engine();
    let owner = Ulid::new();
    eng.bulk_block_dates(owner, &[d(3, 10), d(3, 11)], "training").await.unwrap();

    let grouped = eng.grouped_blocks(owner, span(d(3, 1), d(4, 1))).await.unwrap();
    assert_eq!(grouped.bulk_blocks.len(), 1);
    let group = &grouped.bulk_blocks[0];
    assert_eq!(group.reason, "training");
    assert_eq!(group.first_date, d(3, 10));
    assert_eq!(group.last_date, d(3, 11));
    assert_eq!(group.members.len(), 2);
    assert!(grouped.month_leaves.is_empty());
    assert!(grouped.individual.is_empty());
}

#[tokio::test]
async fn month_leave_groups_by_month() {
    let eng = engine();
    let owner = Ulid::new();
    eng.create_month_leave(owner, 2025, 4, "leave").await.unwrap();

    let grouped = eng.grouped_blocks(owner, span(d(4, 1), d(5, 1))).await.unwrap();
    assert_eq!(grouped.month_leaves.len(), 1);
    let group = &grouped.month_leaves[0];
    assert_eq!(group.first_date, d(4, 1));
    assert_eq!(group.last_date, d(4, 30));
    assert_eq!(group.members.len(), 22);
}

#[tokio::test]
async fn grouping_partitions_past_blocks_with_one_snapshot() {
    let store = Arc::new(MemoryStore::new());
    let eng = engine_with(store.clone(), d(3, 3), 8, 0);
    let owner = Ulid::new();
    eng.bulk_block_dates(owner, &[d(3, 10), d(3, 12)], "training").await.unwrap();

    // Same store, clock now frozen between the two blocks.
    let later = engine_with(store, d(3, 11), 0, 30);
    let grouped = later.grouped_blocks(owner, span(d(3, 1), d(4, 1))).await.unwrap();
    assert_eq!(grouped.past.len(), 1);
    assert_eq!(tz::business_date(grouped.past[0].start), d(3, 10));
    assert_eq!(grouped.bulk_blocks.len(), 1);
    assert_eq!(grouped.bulk_blocks[0].members.len(), 1);
}

#[tokio::test]
async fn delete_group_removes_every_member() {
    let eng = engine();
    let owner = Ulid::new();
    eng.bulk_block_dates(owner, &[d(3, 10), d(3, 11), d(3, 12)], "training").await.unwrap();

    let grouped = eng.grouped_blocks(owner, span(d(3, 1), d(4, 1))).await.unwrap();
    let report = eng.delete_group(&grouped.bulk_blocks[0]).await;
    assert_eq!(report.succeeded.len(), 3);
    assert!(report.failed.is_empty());

    let after = eng.grouped_blocks(owner, span(d(3, 1), d(4, 1))).await.unwrap();
    assert!(after.bulk_blocks.is_empty());
}

#[tokio::test]
async fn delete_group_reports_partial_failure() {
    let eng = engine();
    let owner = Ulid::new();
    eng.bulk_block_dates(owner, &[d(3, 10), d(3, 11)], "training").await.unwrap();
    let grouped = eng.grouped_blocks(owner, span(d(3, 1), d(4, 1))).await.unwrap();
    let group = &grouped.bulk_blocks[0];

    // One member disappears out from under the group.
    eng.delete_block(group.members[0].id).await.unwrap();

    let report = eng.delete_group(group).await;
    assert_eq!(report.succeeded.len(), 1);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].error, EngineError::NotFound(group.members[0].id));
}

// ── Free windows ─────────────────────────────────────────

#[tokio::test]
async fn free_windows_punch_out_busy_slots() {
    let eng = engine();
    let owner = Ulid::new();
    eng.schedule_appointment(owner, subject(), at(d(3, 10), 10, 0), at(d(3, 10), 10, 30), None)
        .await
        .unwrap();
    eng.create_partial_block(owner, at(d(3, 10), 14, 0), at(d(3, 10), 15, 0), "meeting".into())
        .await
        .unwrap();

    let free = eng.compute_free_windows(owner, d(3, 10), None).await.unwrap();
    assert_eq!(
        free,
        vec![
            Window::new(at(d(3, 10), 8, 0), at(d(3, 10), 10, 0)),
            Window::new(at(d(3, 10), 10, 30), at(d(3, 10), 14, 0)),
            Window::new(at(d(3, 10), 15, 0), at(d(3, 10), 17, 0)),
        ]
    );
}

#[tokio::test]
async fn free_windows_empty_on_fully_blocked_day() {
    let eng = engine();
    let owner = Ulid::new();
    eng.create_block(owner, d(3, 10), "leave".into()).await.unwrap();
    let free = eng.compute_free_windows(owner, d(3, 10), None).await.unwrap();
    assert!(free.is_empty());
}

#[tokio::test]
async fn free_windows_ignore_cancelled_appointments() {
    let eng = engine();
    let owner = Ulid::new();
    let appt = eng
        .schedule_appointment(owner, subject(), at(d(3, 10), 10, 0), at(d(3, 10), 10, 30), None)
        .await
        .unwrap();
    eng.cancel_appointment(appt.id).await.unwrap();

    let free = eng.compute_free_windows(owner, d(3, 10), None).await.unwrap();
    assert_eq!(free, vec![Window::new(at(d(3, 10), 8, 0), at(d(3, 10), 17, 0))]);
}

#[tokio::test]
async fn free_windows_respect_minimum_duration() {
    let eng = engine();
    let owner = Ulid::new();
    eng.create_partial_block(owner, at(d(3, 10), 8, 15), at(d(3, 10), 17, 0), "all day".into())
        .await
        .unwrap();
    // Only the 15-minute sliver at open remains.
    assert!(eng.compute_free_windows(owner, d(3, 10), Some(30)).await.unwrap().is_empty());
    assert_eq!(
        eng.compute_free_windows(owner, d(3, 10), Some(15)).await.unwrap(),
        vec![Window::new(at(d(3, 10), 8, 0), at(d(3, 10), 8, 15))]
    );
}

// ── Query limits ─────────────────────────────────────────

#[tokio::test]
async fn list_range_caps_window_width() {
    let eng = engine();
    let err = eng
        .list_range(Ulid::new(), span(d(3, 1), NaiveDate::from_ymd_opt(2027, 1, 1).unwrap()))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "limit_exceeded");
}

#[tokio::test]
async fn owners_are_isolated() {
    let eng = engine();
    let a = Ulid::new();
    let b = Ulid::new();
    eng.create_block(a, d(3, 10), "leave".into()).await.unwrap();

    // Owner B's day is unaffected by owner A's block.
    eng.schedule_appointment(b, subject(), at(d(3, 10), 9, 0), at(d(3, 10), 9, 30), None)
        .await
        .unwrap();
    assert!(eng.list_day(b, d(3, 10)).await.unwrap().len() == 1);
}
