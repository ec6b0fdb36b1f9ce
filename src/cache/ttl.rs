//! Freshness policy for stored responses

use std::time::Duration;

/// Share of the nominal update interval an entry stays fresh for
///
/// Kept below 100 so a refresh arriving exactly on schedule finds the entry
/// stale and fetches new data.
pub const TTL_PERCENT: u64 = 99;

const SECS_PER_MINUTE: f64 = 60.0;

/// Computes the time-to-live for an entry written with the given update interval
///
/// The interval must be positive and finite; requests are validated before
/// they reach this point. The result has nanosecond resolution, so intervals
/// that differ by a nanosecond or more of TTL map to distinct lifetimes.
pub fn compute_ttl(update_interval_minutes: f64) -> Duration {
    debug_assert!(update_interval_minutes.is_finite() && update_interval_minutes > 0.0);

    let nominal_secs = update_interval_minutes * SECS_PER_MINUTE;
    let ttl_secs = nominal_secs * TTL_PERCENT as f64 / 100.0;
    Duration::try_from_secs_f64(ttl_secs).unwrap_or(Duration::MAX)
}
