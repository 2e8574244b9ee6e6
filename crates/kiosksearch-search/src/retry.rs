//! Retry policy applied by the orchestrator around strategy execution

use kiosksearch_config::RetryConfig;
use std::time::Duration;

use crate::error::ErrorClass;

/// How the delay grows between attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Backoff {
    /// The same delay before every retry
    #[default]
    Fixed,
    /// The delay doubles after each retry
    Exponential,
}

/// Bounded retry with a pluggable retryable-class predicate
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    pub delay: Duration,
    pub backoff: Backoff,
    retryable: fn(ErrorClass) -> bool,
}

impl RetryPolicy {
    pub const fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
            backoff: Backoff::Fixed,
            retryable: ErrorClass::is_retryable,
        }
    }

    pub const fn from_config(config: &RetryConfig) -> Self {
        Self::new(config.max_attempts, config.delay())
    }

    /// A policy that never retries
    pub const fn no_retry() -> Self {
        Self::new(1, Duration::ZERO)
    }

    #[must_use]
    pub const fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    #[must_use]
    pub const fn with_retryable(mut self, retryable: fn(ErrorClass) -> bool) -> Self {
        self.retryable = retryable;
        self
    }

    pub fn is_retryable(&self, class: ErrorClass) -> bool {
        (self.retryable)(class)
    }

    /// Whether attempt number `attempt` (1-based) failing with `class` earns another try
    pub fn should_retry(&self, attempt: u32, class: ErrorClass) -> bool {
        attempt < self.max_attempts && self.is_retryable(class)
    }

    /// Delay to wait after failed attempt number `attempt` (1-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        match self.backoff {
            Backoff::Fixed => self.delay,
            Backoff::Exponential => {
                let factor = 2_u32.saturating_pow(attempt.saturating_sub(1));
                self.delay.saturating_mul(factor)
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy_is_three_attempts_two_seconds_apart() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.delay_for(1), Duration::from_secs(2));
        assert_eq!(policy.delay_for(2), Duration::from_secs(2));
    }

    #[test]
    fn test_should_retry_respects_bound_and_class() {
        let policy = RetryPolicy::default();
        assert!(policy.should_retry(1, ErrorClass::Transient));
        assert!(policy.should_retry(2, ErrorClass::Transient));
        assert!(!policy.should_retry(3, ErrorClass::Transient));
        assert!(!policy.should_retry(1, ErrorClass::ValidationFailure));
        assert!(!policy.should_retry(1, ErrorClass::RepositoryUnavailable));
    }

    #[test]
    fn test_exponential_backoff_doubles() {
        let policy =
            RetryPolicy::new(4, Duration::from_millis(100)).with_backoff(Backoff::Exponential);
        assert_eq!(policy.delay_for(1), Duration::from_millis(100));
        assert_eq!(policy.delay_for(2), Duration::from_millis(200));
        assert_eq!(policy.delay_for(3), Duration::from_millis(400));
    }

    #[test]
    fn test_custom_predicate() {
        let policy = RetryPolicy::default().with_retryable(|class| {
            matches!(class, ErrorClass::Transient | ErrorClass::RepositoryUnavailable)
        });
        assert!(policy.should_retry(1, ErrorClass::RepositoryUnavailable));
    }
}
