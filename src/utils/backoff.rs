//! Exponential backoff between download attempts.

use crate::constants::{MAX_BACKOFF_DELAY_MS, STARTING_BACKOFF_DELAY_MS};
use std::time::Duration;
use tokio_retry::strategy::ExponentialBackoff;

/// Delay to wait before retry number `attempt` (1-based).
///
/// 10ms, 20ms, 40ms... capped at 500ms. Attempt 0 never waits.
pub fn attempt_delay(attempt: u32) -> Duration {
    if attempt == 0 {
        return Duration::ZERO;
    }
    ExponentialBackoff::from_millis(2)
        .factor(STARTING_BACKOFF_DELAY_MS / 2)
        .max_delay(Duration::from_millis(MAX_BACKOFF_DELAY_MS))
        .nth((attempt - 1) as usize)
        .unwrap_or(Duration::from_millis(MAX_BACKOFF_DELAY_MS))
}

/// Sleep for [`attempt_delay`] of `attempt`.
pub async fn wait_before_attempt(attempt: u32) {
    let delay = attempt_delay(attempt);
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attempt_delay_doubles_and_caps() {
        assert_eq!(attempt_delay(0), Duration::ZERO);
        assert_eq!(attempt_delay(1), Duration::from_millis(10));
        assert_eq!(attempt_delay(2), Duration::from_millis(20));
        assert_eq!(attempt_delay(3), Duration::from_millis(40));
        assert_eq!(attempt_delay(10), Duration::from_millis(MAX_BACKOFF_DELAY_MS));
    }
}
