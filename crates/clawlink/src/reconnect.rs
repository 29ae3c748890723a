//! Reconnection budget: how many times to retry and how long to wait.

use std::time::Duration;

use rand::Rng;

use crate::ClientConfig;

/// Counts consecutive failed reconnect attempts.
///
/// The budget is refilled every time a connection reaches `Ready`, so a
/// client that keeps recovering is never cut off; only an unbroken run of
/// `max_attempts` failures exhausts it.
#[derive(Debug, Clone)]
pub(crate) struct ReconnectBudget {
    max_attempts: u32,
    used: u32,
    delay: Duration,
    jitter: Duration,
}

impl ReconnectBudget {
    pub(crate) fn from_config(config: &ClientConfig) -> Self {
        Self {
            max_attempts: config.max_reconnect_attempts,
            used: 0,
            delay: config.reconnect_delay,
            jitter: config.reconnect_jitter,
        }
    }

    /// Refills the budget.
    pub(crate) fn reset(&mut self) {
        self.used = 0;
    }

    pub(crate) fn used(&self) -> u32 {
        self.used
    }

    pub(crate) fn has_remaining(&self) -> bool {
        self.used < self.max_attempts
    }

    /// Spends one attempt and returns how long to wait before making it,
    /// or `None` if the budget is exhausted.
    pub(crate) fn next_delay(&mut self) -> Option<Duration> {
        if !self.has_remaining() {
            return None;
        }
        self.used += 1;

        // Random jitter keeps clients dropped together from retrying together.
        let jitter = if self.jitter.is_zero() {
            Duration::ZERO
        } else {
            let max_ms = u64::try_from(self.jitter.as_millis()).unwrap_or(u64::MAX);
            Duration::from_millis(rand::rng().random_range(0..=max_ms))
        };
        Some(self.delay + jitter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn budget(max: u32, jitter_ms: u64) -> ReconnectBudget {
        ReconnectBudget::from_config(&ClientConfig {
            max_reconnect_attempts: max,
            reconnect_delay: Duration::from_secs(3),
            reconnect_jitter: Duration::from_millis(jitter_ms),
            ..ClientConfig::default()
        })
    }

    #[test]
    fn test_fixed_delay_without_jitter() {
        let mut budget = budget(2, 0);
        assert_eq!(budget.next_delay(), Some(Duration::from_secs(3)));
        assert_eq!(budget.next_delay(), Some(Duration::from_secs(3)));
    }

    #[test]
    fn test_exhausts_after_max_attempts() {
        let mut budget = budget(3, 0);
        for _ in 0..3 {
            assert!(budget.next_delay().is_some());
        }
        assert_eq!(budget.next_delay(), None);
        assert_eq!(budget.used(), 3);
        assert!(!budget.has_remaining());
    }

    #[test]
    fn test_zero_budget_never_retries() {
        let mut budget = budget(0, 0);
        assert!(!budget.has_remaining());
        assert_eq!(budget.next_delay(), None);
    }

    #[test]
    fn test_reset_refills() {
        let mut budget = budget(1, 0);
        budget.next_delay();
        assert_eq!(budget.next_delay(), None);
        budget.reset();
        assert_eq!(budget.next_delay(), Some(Duration::from_secs(3)));
    }

    #[test]
    fn test_jitter_stays_in_bounds() {
        let mut budget = budget(100, 500);
        for _ in 0..100 {
            let delay = budget.next_delay().unwrap();
            assert!(delay >= Duration::from_secs(3));
            assert!(delay <= Duration::from_millis(3_500));
        }
    }
}
