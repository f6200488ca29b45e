//! Pause between redeliveries of a message that failed transiently.

use common::{BackoffStrategy, RetryConfig};
use std::sync::Arc;
use std::time::Duration;

pub trait BackoffPolicy: Send + Sync {
    /// Delay before the next fetch, where `attempt` counts consecutive
    /// transient failures on the partition starting at 1.
    fn delay(&self, attempt: u32) -> Duration;
}

/// Same delay for every attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConstantBackoff {
    delay: Duration,
}

impl ConstantBackoff {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl Default for ConstantBackoff {
    fn default() -> Self {
        Self::new(Duration::from_secs(2))
    }
}

impl BackoffPolicy for ConstantBackoff {
    fn delay(&self, _attempt: u32) -> Duration {
        self.delay
    }
}

/// `initial * factor^(attempt - 1)`, capped at `max`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExponentialBackoff {
    pub initial: Duration,
    pub max: Duration,
    pub factor: f64,
}

impl ExponentialBackoff {
    pub fn new(initial: Duration, max: Duration) -> Self {
        Self {
            initial,
            max,
            factor: 2.0,
        }
    }
}

impl BackoffPolicy for ExponentialBackoff {
    fn delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let secs = self.initial.as_secs_f64() * self.factor.powi(exponent);

        if !secs.is_finite() || secs >= self.max.as_secs_f64() {
            self.max
        } else {
            Duration::from_secs_f64(secs.max(0.0))
        }
    }
}

/// Build the policy selected in configuration
pub fn from_config(config: &RetryConfig) -> Arc<dyn BackoffPolicy> {
    match config.strategy {
        BackoffStrategy::Constant => Arc::new(ConstantBackoff::new(config.delay)),
        BackoffStrategy::Exponential => {
            Arc::new(ExponentialBackoff::new(config.delay, config.max_delay))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_backoff_ignores_attempt() {
        let backoff = ConstantBackoff::default();
        assert_eq!(backoff.delay(1), Duration::from_secs(2));
        assert_eq!(backoff.delay(50), Duration::from_secs(2));
    }

    #[test]
    fn test_exponential_backoff_grows_and_caps() {
        let backoff = ExponentialBackoff::new(Duration::from_millis(100), Duration::from_secs(1));

        assert_eq!(backoff.delay(1), Duration::from_millis(100));
        assert_eq!(backoff.delay(2), Duration::from_millis(200));
        assert_eq!(backoff.delay(4), Duration::from_millis(800));
        assert_eq!(backoff.delay(5), Duration::from_secs(1));
        assert_eq!(backoff.delay(u32::MAX), Duration::from_secs(1));
    }

    #[test]
    fn test_from_config_selects_strategy() {
        let mut config = RetryConfig::default();
        assert_eq!(from_config(&config).delay(3), Duration::from_secs(2));

        config.strategy = BackoffStrategy::Exponential;
        config.delay = Duration::from_secs(1);
        config.max_delay = Duration::from_secs(5);
        let policy = from_config(&config);
        assert_eq!(policy.delay(2), Duration::from_secs(2));
        assert_eq!(policy.delay(10), Duration::from_secs(5));
    }
}
