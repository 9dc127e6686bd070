//! Exponential backoff by retry count.

use std::time::Duration;

/// Delay before re-emitting the attempt numbered `retry_count`.
///
/// `round(2^retry_count * 1000)` milliseconds. Counts large enough to overflow
/// saturate instead; the retry window ends a lineage long before that.
pub fn delay_for(retry_count: u32) -> Duration {
    let millis = 2u64.saturating_pow(retry_count).saturating_mul(1000);
    Duration::from_millis(millis)
}
