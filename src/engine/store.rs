//! Store boundary and the bundled in-memory backend.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::RwLock;
use ulid::Ulid;

use crate::model::{Interval, Window};
use crate::tz;

use super::EngineError;

/// Durable storage for counselor calendars. Implementations MUST serialize
/// writes per owner: the engine validates against a snapshot, so two
/// concurrent requests checked against stale snapshots could both pass and
/// create an overlap unless the store itself refuses the second write.
#[async_trait]
pub trait IntervalStore: Send + Sync {
    /// Intervals for `owner_id` whose effective span overlaps `window`,
    /// sorted by start. Full-day blocks match through their office-day span.
    async fn list(&self, owner_id: Ulid, window: Window) -> Result<Vec<Interval>, EngineError>;

    async fn get(&self, id: Ulid) -> Result<Interval, EngineError>;

    async fn create(&self, interval: Interval) -> Result<Interval, EngineError>;

    /// Whole-record replace, keyed by `interval.id`.
    async fn update(&self, interval: Interval) -> Result<Interval, EngineError>;

    async fn delete(&self, id: Ulid) -> Result<(), EngineError>;
}

/// One counselor's calendar: intervals kept sorted by `start` so snapshots
/// iterate in a stable, deterministic order.
#[derive(Debug, Default)]
struct OwnerCalendar {
    intervals: Vec<Interval>,
}

impl OwnerCalendar {
    fn insert(&mut self, interval: Interval) {
        let pos = self
            .intervals
            .binary_search_by_key(&interval.start, |i| i.start)
            .unwrap_or_else(|e| e);
        self.intervals.insert(pos, interval);
    }

    fn remove(&mut self, id: Ulid) -> Option<Interval> {
        let pos = self.intervals.iter().position(|i| i.id == id)?;
        Some(self.intervals.remove(pos))
    }
}

type SharedCalendar = Arc<RwLock<OwnerCalendar>>;

/// In-memory `IntervalStore`: per-owner calendars behind per-owner locks,
/// plus an id → owner index for direct lookups. Useful as a test double and
/// as an embedded backend.
pub struct MemoryStore {
    calendars: DashMap<Ulid, SharedCalendar>,
    owner_index: DashMap<Ulid, Ulid>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            calendars: DashMap::new(),
            owner_index: DashMap::new(),
        }
    }

    fn calendar(&self, owner_id: Ulid) -> SharedCalendar {
        self.calendars
            .entry(owner_id)
            .or_insert_with(|| Arc::new(RwLock::new(OwnerCalendar::default())))
            .clone()
    }

    fn owner_of(&self, id: Ulid) -> Result<Ulid, EngineError> {
        self.owner_index
            .get(&id)
            .map(|e| *e.value())
            .ok_or(EngineError::NotFound(id))
    }
}

#[async_trait]
impl IntervalStore for MemoryStore {
    async fn list(&self, owner_id: Ulid, window: Window) -> Result<Vec<Interval>, EngineError> {
        let cal = match self.calendars.get(&owner_id) {
            Some(entry) => entry.value().clone(),
            None => return Ok(Vec::new()),
        };
        let guard = cal.read().await;
        let mut out = Vec::new();
        for interval in &guard.intervals {
            let effective = tz::effective_window(interval)?;
            if effective.overlaps(&window) {
                out.push(interval.clone());
            }
        }
        Ok(out)
    }

    async fn get(&self, id: Ulid) -> Result<Interval, EngineError> {
        let owner_id = self.owner_of(id)?;
        let cal = self.calendar(owner_id);
        let guard = cal.read().await;
        guard
            .intervals
            .iter()
            .find(|i| i.id == id)
            .cloned()
            .ok_or(EngineError::NotFound(id))
    }

    async fn create(&self, interval: Interval) -> Result<Interval, EngineError> {
        let cal = self.calendar(interval.owner_id);
        let mut guard = cal.write().await;
        self.owner_index.insert(interval.id, interval.owner_id);
        guard.insert(interval.clone());
        Ok(interval)
    }

    async fn update(&self, interval: Interval) -> Result<Interval, EngineError> {
        let owner_id = self.owner_of(interval.id)?;
        let cal = self.calendar(owner_id);
        let mut guard = cal.write().await;
        guard
            .remove(interval.id)
            .ok_or(EngineError::NotFound(interval.id))?;
        guard.insert(interval.clone());
        Ok(interval)
    }

    async fn delete(&self, id: Ulid) -> Result<(), EngineError> {
        let owner_id = self.owner_of(id)?;
        let cal = self.calendar(owner_id);
        let mut guard = cal.write().await;
        guard.remove(id).ok_or(EngineError::NotFound(id))?;
        self.owner_index.remove(&id);
        Ok(())
    }
}
