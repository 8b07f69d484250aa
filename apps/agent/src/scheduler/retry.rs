use std::time::Duration;

/// Exponential backoff with a delay cap and a hard attempt limit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub initial_delay: Duration,
    pub factor: u32,
    pub max_delay: Duration,
    /// Total attempts per scheduled run, including the first one.
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(30),
            factor: 2,
            max_delay: Duration::from_secs(15 * 60),
            max_attempts: 5,
        }
    }
}

impl RetryPolicy {
    /// Delay before the next attempt after `failed_attempts` consecutive
    /// failures, or `None` when the attempt budget is spent.
    pub fn delay_after(&self, failed_attempts: u32) -> Option<Duration> {
        if failed_attempts == 0 || failed_attempts >= self.max_attempts {
            return None;
        }
        let exponent = failed_attempts - 1;
        let multiplier = self.factor.max(1).saturating_pow(exponent);
        let delay = self.initial_delay.saturating_mul(multiplier);
        Some(delay.min(self.max_delay))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exponential_sequence() {
        let policy = RetryPolicy::default();
        let delays: Vec<u64> = (1..5)
            .map(|n| policy.delay_after(n).unwrap().as_secs())
            .collect();
        assert_eq!(delays, vec![30, 60, 120, 240]);
    }

    #[test]
    fn test_stops_after_max_attempts() {
        let policy = RetryPolicy::default();
        assert!(policy.delay_after(4).is_some());
        assert_eq!(policy.delay_after(5), None);
        assert_eq!(policy.delay_after(50), None);
    }

    #[test]
    fn test_delay_is_capped() {
        let policy = RetryPolicy {
            initial_delay: Duration::from_secs(60),
            factor: 10,
            max_delay: Duration::from_secs(300),
            max_attempts: 10,
        };
        assert_eq!(policy.delay_after(1), Some(Duration::from_secs(60)));
        assert_eq!(policy.delay_after(2), Some(Duration::from_secs(300)));
        assert_eq!(policy.delay_after(9), Some(Duration::from_secs(300)));
    }

    #[test]
    fn test_single_attempt_policy_never_retries() {
        let policy = RetryPolicy {
            max_attempts: 1,
            ..RetryPolicy::default()
        };
        assert_eq!(policy.delay_after(1), None);
    }
}
