//! gabay: availability and appointment conflict engine for a
//! counseling-office scheduler.
//!
//! The engine decides whether a proposed appointment or counselor block may
//! be created: office-hours, weekday, no-past, and duration rules; half-open
//! interval conflict detection with full-day block dominance; bulk block and
//! month-leave generation with partial-success reports; and logical grouping
//! of related blocks for unified display and deletion. Everything is
//! evaluated in a fixed business timezone (Philippine Time) against a
//! pluggable interval store, with time injected through a [`clock::Clock`].

pub mod clock;
pub mod engine;
pub mod limits;
pub mod model;
pub mod observability;
pub mod tz;

pub use clock::{Clock, FixedClock, SystemClock};
pub use engine::{
    BlockGroup, BulkFailure, BulkReport, Decision, Engine, EngineError, GroupedBlocks,
    IntervalStore, MemoryStore,
};
pub use model::{AppointmentStatus, GroupKind, Interval, IntervalKind, Window};
