//! Exponential backoff with jitter for route source fetches.

use std::time::Duration;

use rand::Rng;

use crate::config::RetryConfig;

/// Calculate exponential backoff delay with jitter.
///
/// Attempt 1 waits roughly `base_ms`, doubling per attempt up to `max_ms`,
/// plus up to 10% jitter so pollers restarted together spread out.
pub fn calculate_backoff(attempt: u32, base_ms: u64, max_ms: u64) -> Duration {
    if attempt == 0 {
        return Duration::ZERO;
    }

    let exponent = (attempt - 1).min(63);
    let delay_ms = base_ms.saturating_mul(1u64 << exponent).min(max_ms);

    let jitter_range = delay_ms / 10;
    let jitter = if jitter_range > 0 {
        rand::thread_rng().gen_range(0..jitter_range)
    } else {
        0
    };

    Duration::from_millis(delay_ms + jitter)
}

/// Backoff schedule derived from retry settings.
pub fn backoff_for(retry: &RetryConfig, attempt: u32) -> Duration {
    calculate_backoff(attempt, retry.base_delay_ms, retry.max_delay_ms)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_calculation() {
        assert_eq!(calculate_backoff(0, 100, 2000), Duration::ZERO);

        let b1 = calculate_backoff(1, 100, 2000);
        assert!(b1.as_millis() >= 100 && b1.as_millis() < 110);

        let b3 = calculate_backoff(3, 100, 2000);
        assert!(b3.as_millis() >= 400 && b3.as_millis() < 440);

        let capped = calculate_backoff(10, 100, 1000);
        assert!(capped.as_millis() >= 1000 && capped.as_millis() < 1100);
    }

    #[test]
    fn test_large_attempt_does_not_overflow() {
        let d = calculate_backoff(u32::MAX, 500, 30_000);
        assert!(d.as_millis() >= 30_000);
    }

    #[test]
    fn test_backoff_for_config() {
        let retry = RetryConfig {
            max_attempts: 0,
            base_delay_ms: 200,
            max_delay_ms: 300,
        };
        assert!(backoff_for(&retry, 2).as_millis() >= 300);
    }
}
