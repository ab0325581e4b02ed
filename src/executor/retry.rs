use std::time::Duration;

/// Exponential backoff policy for swap attempts.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_retries: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub backoff_factor: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay_ms: 1000,
            max_delay_ms: 10000,
            backoff_factor: 2,
        }
    }
}

/// Delay to wait before attempt `attempt` (1-based). The first attempt runs
/// immediately; attempt k waits `min(initial × factor^(k-2), max)`.
pub fn retry_delay(attempt: u32, policy: &RetryPolicy) -> Duration {
    if attempt <= 1 {
        return Duration::ZERO;
    }

    let exponent = attempt - 2;
    let delay_ms = (policy.backoff_factor as u64)
        .checked_pow(exponent)
        .and_then(|factor| policy.initial_delay_ms.checked_mul(factor))
        .unwrap_or(policy.max_delay_ms);

    Duration::from_millis(delay_ms.min(policy.max_delay_ms))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_attempt_has_no_delay() {
        assert_eq!(retry_delay(1, &RetryPolicy::default()), Duration::ZERO);
    }

    #[test]
    fn delays_double_per_attempt() {
        let policy = RetryPolicy::default();
        assert_eq!(retry_delay(2, &policy), Duration::from_millis(1000));
        assert_eq!(retry_delay(3, &policy), Duration::from_millis(2000));
        assert_eq!(retry_delay(4, &policy), Duration::from_millis(4000));
    }

    #[test]
    fn delay_is_capped_at_the_maximum() {
        let policy = RetryPolicy::default();
        assert_eq!(retry_delay(6, &policy), Duration::from_millis(10000));
        assert_eq!(retry_delay(60, &policy), Duration::from_millis(10000));
    }

    #[test]
    fn overflowing_exponent_falls_back_to_the_cap() {
        let policy = RetryPolicy {
            max_retries: u32::MAX,
            initial_delay_ms: u64::MAX,
            max_delay_ms: 5000,
            backoff_factor: 2,
        };
        assert_eq!(retry_delay(100, &policy), Duration::from_millis(5000));
    }
}
