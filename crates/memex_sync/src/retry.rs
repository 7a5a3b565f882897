//! Backoff policy for transport retries.

use std::time::Duration;

/// Exponential backoff configuration for the transport retry loop.
///
/// The delay before retry `n` (zero-based) is
/// `base_delay * multiplier^n`, capped at `max_delay`. With the defaults
/// the sequence runs 1s, 2s, 4s, 8s, 16s; further retries would cap at
/// 60s. A `Retry-After` value from the server overrides the computed
/// delay for that attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries allowed after the initial attempt.
    pub max_retries: u32,
    /// Delay before the first retry.
    pub base_delay: Duration,
    /// Exponential growth factor.
    pub multiplier: u32,
    /// Upper bound on any computed delay.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            base_delay: Duration::from_millis(1000),
            multiplier: 2,
            max_delay: Duration::from_millis(60_000),
        }
    }
}

impl RetryPolicy {
    /// Backoff delay for the given zero-based retry count.
    pub fn delay_for(&self, retry_count: u32) -> Duration {
        let factor = self.multiplier.saturating_pow(retry_count);
        std::cmp::min(self.base_delay.saturating_mul(factor), self.max_delay)
    }

    /// Whether another retry fits the budget.
    pub fn allows(&self, retry_count: u32) -> bool {
        retry_count < self.max_retries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_backoff_sequence() {
        let policy = RetryPolicy::default();
        let delays: Vec<u64> = (0..5).map(|n| policy.delay_for(n).as_millis() as u64).collect();
        assert_eq!(delays, vec![1000, 2000, 4000, 8000, 16000]);
    }

    #[test]
    fn test_delay_caps_at_max() {
        let policy = RetryPolicy::default();
        // 1000 * 2^6 = 64s, above the 60s cap.
        assert_eq!(policy.delay_for(6), Duration::from_millis(60_000));
        // Large counts saturate instead of overflowing.
        assert_eq!(policy.delay_for(40), Duration::from_millis(60_000));
    }

    #[test]
    fn test_retry_budget() {
        let policy = RetryPolicy::default();
        assert!(policy.allows(0));
        assert!(policy.allows(4));
        assert!(!policy.allows(5));

        let none = RetryPolicy {
            max_retries: 0,
            ..RetryPolicy::default()
        };
        assert!(!none.allows(0));
    }

    #[test]
    fn test_custom_policy() {
        let policy = RetryPolicy {
            max_retries: 3,
            base_delay: Duration::from_millis(250),
            multiplier: 3,
            max_delay: Duration::from_secs(5),
        };
        assert_eq!(policy.delay_for(0), Duration::from_millis(250));
        assert_eq!(policy.delay_for(1), Duration::from_millis(750));
        assert_eq!(policy.delay_for(2), Duration::from_millis(2250));
        assert_eq!(policy.delay_for(3), Duration::from_secs(5));
    }
}
