use chrono::NaiveDate;
use ulid::Ulid;

use crate::limits::MAX_QUERY_WINDOW_DAYS;
use crate::model::{Interval, Window};
use crate::tz;

use super::availability;
use super::grouping::{group_blocks, GroupedBlocks};
use super::{Engine, EngineError};

impl Engine {
    /// All intervals on a counselor's business day, sorted by start.
    pub async fn list_day(
        &self,
        owner_id: Ulid,
        date: NaiveDate,
    ) -> Result<Vec<Interval>, EngineError> {
        self.day_snapshot(owner_id, date).await
    }

    /// Window-bounded listing. The window is capped so one query cannot ask
    /// for an unbounded scan.
    pub async fn list_range(
        &self,
        owner_id: Ulid,
        window: Window,
    ) -> Result<Vec<Interval>, EngineError> {
        if (window.end - window.start).num_days() > MAX_QUERY_WINDOW_DAYS {
            return Err(EngineError::LimitExceeded("query window too wide"));
        }
        self.store.list(owner_id, window).await
    }

    /// Blocks for an owner within `window`, classified into logical groups
    /// using a single clock reading.
    pub async fn grouped_blocks(
        &self,
        owner_id: Ulid,
        window: Window,
    ) -> Result<GroupedBlocks, EngineError> {
        let intervals = self.list_range(owner_id, window).await?;
        let blocks: Vec<Interval> = intervals.into_iter().filter(|i| i.is_block()).collect();
        Ok(group_blocks(&blocks, self.now()))
    }

    /// Open slots on a counselor's day: office hours minus every active
    /// interval, clamped to the office window.
    pub async fn compute_free_windows(
        &self,
        owner_id: Ulid,
        date: NaiveDate,
        min_minutes: Option<i64>,
    ) -> Result<Vec<Window>, EngineError> {
        let (open, close) = tz::office_day_bounds(date)?;
        let office = Window::new(open, close);

        let existing = self.day_snapshot(owner_id, date).await?;
        let mut busy = Vec::new();
        for interval in &existing {
            if !interval.is_active() {
                continue;
            }
            let effective = tz::effective_window(interval)?;
            let start = effective.start.max(office.start);
            let end = effective.end.min(office.end);
            if start < end {
                busy.push(Window::new(start, end));
            }
        }

        Ok(availability::free_windows(office, &busy, min_minutes))
    }
}
