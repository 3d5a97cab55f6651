//! Cadence constants for shared-data synchronization.

/// Periodic shared-data sync cadence in seconds.
pub const SHARED_SYNC_INTERVAL_SECS: u64 = 300;

/// Maximum jitter (seconds) added to periodic sync intervals.
pub const SHARED_SYNC_JITTER_SECS: u64 = 15;

/// Minimum spacing between remote round trips; `sync_data` calls inside this
/// window are skipped.
pub const SYNC_MIN_INTERVAL_SECS: i64 = 300;
