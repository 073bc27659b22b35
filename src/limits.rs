//! Fixed business constants and hard request limits.

/// Office opens at 08:00 business time.
pub const OFFICE_OPEN_HOUR: u32 = 8;

/// Office closes at 17:00 business time. Intervals are half-open, so an
/// appointment may end exactly at close.
pub const OFFICE_CLOSE_HOUR: u32 = 17;

/// Longest allowed appointment.
pub const MAX_APPOINTMENT_MINUTES: i64 = 60;

/// Longest free-text reason on a block.
pub const MAX_REASON_LEN: usize = 500;

/// Longest notes field on an appointment.
pub const MAX_NOTES_LEN: usize = 2000;

/// Upper bound on dates in one bulk request (roughly two months of days).
pub const MAX_BULK_DATES: usize = 62;

/// Widest window a list query may ask for.
pub const MAX_QUERY_WINDOW_DAYS: i64 = 366;
