// Capped exponential backoff shared by request retries and task polling.

use std::time::Duration;

/// `delay = min(initial * 2^attempt, max)`, without jitter.
pub(crate) fn calculate_backoff(attempt: u32, initial: Duration, max: Duration) -> Duration {
    initial
        .saturating_mul(2_u32.saturating_pow(attempt))
        .min(max)
}
