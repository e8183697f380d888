//! Bounded exponential backoff with full jitter
//!
//! Used between connect attempts. The ceiling and budget are this
//! crate's chosen constants; callers can override both.

use rand::Rng;
use std::time::Duration;

/// Default base delay before the first retry
pub const DEFAULT_BASE: Duration = Duration::from_secs(1);

/// Default delay ceiling
pub const DEFAULT_CAP: Duration = Duration::from_secs(60);

/// Default attempt budget before the error surfaces as fatal
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Bounded exponential backoff state
#[derive(Debug, Clone)]
pub struct Backoff {
    base: Duration,
    cap: Duration,
    max_attempts: u32,
    attempt: u32,
}

impl Backoff {
    /// Create a backoff with the default bounds
    #[must_use]
    pub fn new() -> Self {
        Self::with_bounds(DEFAULT_BASE, DEFAULT_CAP, DEFAULT_MAX_ATTEMPTS)
    }

    /// Create a backoff with explicit bounds
    #[must_use]
    pub fn with_bounds(base: Duration, cap: Duration, max_attempts: u32) -> Self {
        Self {
            base,
            cap,
            max_attempts,
            attempt: 0,
        }
    }

    /// The number of attempts consumed so far
    #[must_use]
    pub fn attempts(&self) -> u32 {
        self.attempt
    }

    /// The attempt budget
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Next delay, or `None` once the budget is exhausted.
    ///
    /// Delay for attempt n is `rand(0..=base * 2^n)` capped at the
    /// ceiling (full jitter).
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.attempt >= self.max_attempts {
            return None;
        }

        let exp = self
            .base
            .saturating_mul(1u32 << self.attempt.min(16))
            .min(self.cap);
        self.attempt += 1;

        let jittered = exp.mul_f64(rand::thread_rng().gen::<f64>());
        Some(jittered)
    }

    /// Reset after a successful connection
    pub fn reset(&mut self) {
        self.attempt = 0;
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_budget_exhausts() {
        let mut backoff = Backoff::with_bounds(Duration::from_millis(10), Duration::from_secs(1), 3);
        assert!(backoff.next_delay().is_some());
        assert!(backoff.next_delay().is_some());
        assert!(backoff.next_delay().is_some());
        assert!(backoff.next_delay().is_none());
        assert_eq!(backoff.attempts(), 3);
    }

    #[test]
    fn test_delays_bounded_by_cap() {
        let cap = Duration::from_millis(50);
        let mut backoff = Backoff::with_bounds(Duration::from_millis(40), cap, 10);
        while let Some(delay) = backoff.next_delay() {
            assert!(delay <= cap);
        }
    }

    #[test]
    fn test_reset_restores_budget() {
        let mut backoff = Backoff::with_bounds(Duration::from_millis(1), Duration::from_secs(1), 1);
        assert!(backoff.next_delay().is_some());
        assert!(backoff.next_delay().is_none());

        backoff.reset();
        assert!(backoff.next_delay().is_some());
    }
}
