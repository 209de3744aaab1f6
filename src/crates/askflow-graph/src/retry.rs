//! Retry policy - exponential backoff with jitter for transient store errors
//!
//! Transient failures (service unavailable, expired sessions, lock
//! conflicts) are retried by the [`Gateway`](crate::gateway::Gateway); this
//! module holds the timing policy. Defaults follow the store contract:
//! up to 3 attempts, 200 ms initial interval doubling per attempt, capped at
//! 2 s, with jitter so simultaneous failures do not retry in lockstep.

use rand::Rng;
use std::time::Duration;

/// Configuration for retrying transient store failures.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the first).
    pub max_attempts: usize,

    /// Interval before the first retry.
    pub initial_interval: Duration,

    /// Multiplier applied to the interval after each retry.
    pub backoff_factor: f64,

    /// Upper bound on the interval between retries.
    pub max_interval: Duration,

    /// Whether to randomize intervals (0.5x..1.5x).
    pub jitter: bool,
}

impl RetryPolicy {
    /// Create a policy with the given attempt budget and default timing.
    pub fn new(max_attempts: usize) -> Self {
        Self {
            max_attempts,
            initial_interval: Duration::from_millis(200),
            backoff_factor: 2.0,
            max_interval: Duration::from_secs(2),
            jitter: true,
        }
    }

    /// Set the interval before the first retry.
    pub fn with_initial_interval(mut self, interval: Duration) -> Self {
        self.initial_interval = interval;
        self
    }

    /// Set the backoff factor.
    pub fn with_backoff_factor(mut self, factor: f64) -> Self {
        self.backoff_factor = factor;
        self
    }

    /// Set the maximum interval between retries.
    pub fn with_max_interval(mut self, interval: Duration) -> Self {
        self.max_interval = interval;
        self
    }

    /// Enable or disable jitter.
    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Delay before the retry following attempt number `attempt` (0-indexed).
    ///
    /// Exponential backoff capped at `max_interval`, with optional jitter.
    pub fn calculate_delay(&self, attempt: usize) -> Duration {
        if attempt >= self.max_attempts {
            return Duration::ZERO;
        }

        let base = self.initial_interval.as_secs_f64() * self.backoff_factor.powi(attempt as i32);
        let capped = base.min(self.max_interval.as_secs_f64());

        let final_delay = if self.jitter {
            let mut rng = rand::thread_rng();
            capped * rng.gen_range(0.5..=1.5)
        } else {
            capped
        };

        Duration::from_secs_f64(final_delay)
    }

    /// Whether another attempt is allowed after `attempt` attempts.
    pub fn should_retry(&self, attempt: usize) -> bool {
        attempt < self.max_attempts
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.initial_interval, Duration::from_millis(200));
        assert_eq!(policy.backoff_factor, 2.0);
        assert_eq!(policy.max_interval, Duration::from_secs(2));
        assert!(policy.jitter);
    }

    #[test]
    fn test_exponential_backoff() {
        let policy = RetryPolicy::new(5)
            .with_initial_interval(Duration::from_millis(100))
            .with_backoff_factor(2.0)
            .with_max_interval(Duration::from_secs(10))
            .with_jitter(false);

        assert_eq!(policy.calculate_delay(0), Duration::from_millis(100));
        assert_eq!(policy.calculate_delay(1), Duration::from_millis(200));
        assert_eq!(policy.calculate_delay(2), Duration::from_millis(400));
        assert_eq!(policy.calculate_delay(3), Duration::from_millis(800));
    }

    #[test]
    fn test_max_interval_cap() {
        let policy = RetryPolicy::new(10)
            .with_initial_interval(Duration::from_secs(1))
            .with_backoff_factor(2.0)
            .with_max_interval(Duration::from_secs(2))
            .with_jitter(false);

        assert_eq!(policy.calculate_delay(5), Duration::from_secs(2));
    }

    #[test]
    fn test_jitter_stays_in_range() {
        let policy = RetryPolicy::new(5)
            .with_initial_interval(Duration::from_millis(200))
            .with_backoff_factor(2.0)
            .with_jitter(true);

        // Base delay at attempt 2 is 800ms; jitter multiplies by 0.5..=1.5.
        for _ in 0..20 {
            let delay = policy.calculate_delay(2).as_secs_f64();
            assert!(delay >= 0.4);
            assert!(delay <= 1.2 + f64::EPSILON);
        }
    }

    #[test]
    fn test_should_retry() {
        let policy = RetryPolicy::new(3);
        assert!(policy.should_retry(0));
        assert!(policy.should_retry(2));
        assert!(!policy.should_retry(3));
        assert!(!policy.should_retry(4));
    }
}
