//! Retry rounds for applications that still hold access after a suspension.
//!
//! A suspension never retries on its own. When an operator asks for a retry,
//! the failed applications are called again in rounds; the wait before each
//! round doubles, starting at `initial_delay` and capped at `max_delay`.

use std::time::Duration;

/// How many retry rounds to run and how long to wait before each.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Rounds to run after the original fan-out (0 = never retry).
    pub max_rounds: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_rounds: 3,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self {
            max_rounds: 0,
            ..Self::default()
        }
    }

    pub fn new(max_rounds: u32, initial_delay: Duration) -> Self {
        Self {
            max_rounds,
            initial_delay,
            max_delay: initial_delay.max(Self::default().max_delay),
        }
    }

    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    /// Wait before retry round `round` (1-indexed): `initial_delay * 2^(round - 1)`,
    /// never more than `max_delay`.
    pub fn delay_before_round(&self, round: u32) -> Duration {
        if round == 0 {
            return Duration::ZERO;
        }

        let factor = 1u32.checked_shl(round - 1).unwrap_or(u32::MAX);
        self.initial_delay
            .saturating_mul(factor)
            .min(self.max_delay)
    }

    /// Whether another round may run once `completed` rounds have run.
    pub fn allows_round(&self, completed: u32) -> bool {
        completed < self.max_rounds
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn none_never_retries() {
        assert!(!RetryPolicy::none().allows_round(0));
    }

    #[test]
    fn rounds_are_counted() {
        let policy = RetryPolicy::new(2, Duration::from_millis(10));
        assert!(policy.allows_round(0));
        assert!(policy.allows_round(1));
        assert!(!policy.allows_round(2));
    }

    #[test]
    fn delay_doubles_until_capped() {
        let policy = RetryPolicy::new(10, Duration::from_millis(100))
            .with_max_delay(Duration::from_millis(1000));

        assert_eq!(policy.delay_before_round(0), Duration::ZERO);
        assert_eq!(policy.delay_before_round(1), Duration::from_millis(100));
        assert_eq!(policy.delay_before_round(2), Duration::from_millis(200));
        assert_eq!(policy.delay_before_round(4), Duration::from_millis(800));
        assert_eq!(policy.delay_before_round(5), Duration::from_millis(1000));
    }

    #[test]
    fn huge_round_numbers_stay_at_the_cap() {
        let policy = RetryPolicy::new(u32::MAX, Duration::from_secs(1))
            .with_max_delay(Duration::from_secs(30));

        assert_eq!(policy.delay_before_round(33), Duration::from_secs(30));
        assert_eq!(policy.delay_before_round(u32::MAX), Duration::from_secs(30));
    }
}
