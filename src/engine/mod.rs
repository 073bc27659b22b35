mod availability;
mod conflict;
mod error;
mod grouping;
mod mutations;
mod queries;
mod rules;
mod store;
#[cfg(test)]
mod tests;

pub use availability::{free_windows, merge_overlapping, subtract_windows};
pub use conflict::{resolve, Decision};
pub use error::EngineError;
pub use grouping::{group_blocks, BlockGroup, GroupedBlocks};
pub use mutations::{BulkFailure, BulkReport};
pub use rules::{is_not_past, is_weekday, validate, within_duration, within_office_hours, RuleSet};
pub use store::{IntervalStore, MemoryStore};

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use ulid::Ulid;

use crate::clock::{Clock, SystemClock};
use crate::model::{Interval, Window};
use crate::tz;

/// The scheduling engine: pure rules evaluated against store snapshots, with
/// an injected clock. Holds no calendar state of its own; the store is the
/// single source of truth.
pub struct Engine {
    store: Arc<dyn IntervalStore>,
    clock: Arc<dyn Clock>,
}

impl Engine {
    pub fn new(store: Arc<dyn IntervalStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub fn with_system_clock(store: Arc<dyn IntervalStore>) -> Self {
        Self::new(store, Arc::new(SystemClock))
    }

    fn now(&self) -> DateTime<Utc> {
        self.clock.now_utc()
    }

    /// Current snapshot of an owner's business day, sorted by start.
    async fn day_snapshot(
        &self,
        owner_id: Ulid,
        date: NaiveDate,
    ) -> Result<Vec<Interval>, EngineError> {
        let (start, end) = tz::business_day_bounds(date)?;
        self.store.list(owner_id, Window::new(start, end)).await
    }
}
