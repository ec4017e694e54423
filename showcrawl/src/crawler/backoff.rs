//! Timing helpers shared by discovery and the worker pool.

use std::time::Duration;

use rand::Rng;

/// Delay before retrying after failed attempt number `attempt` (1-based).
///
/// Linear in the attempt number: `base`, `2 * base`, `3 * base`, ...
pub fn retry_delay(base: Duration, attempt: u32) -> Duration {
    base.saturating_mul(attempt)
}

/// A uniformly random delay within the inclusive `(min, max)` range.
pub fn jitter((min, max): (Duration, Duration)) -> Duration {
    if max <= min {
        return min;
    }
    let secs = rand::rng().random_range(min.as_secs_f64()..=max.as_secs_f64());
    Duration::from_secs_f64(secs)
}
