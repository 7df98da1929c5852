//! Reconnect delay policy.

use std::time::Duration;

/// First reconnect delay in milliseconds.
pub const BASE_DELAY_MS: u64 = 500;
/// Reconnect delay cap in milliseconds.
pub const MAX_DELAY_MS: u64 = 8_000;

/// Capped exponential backoff: `min(max, base * 2^attempt)`.
#[must_use]
pub fn backoff_delay(attempt: u32, base_ms: u64, max_ms: u64) -> Duration {
    let exponential = base_ms.saturating_mul(1u64 << attempt.min(31));
    Duration::from_millis(exponential.min(max_ms))
}

/// Stateful reconnect schedule. Call [`Backoff::reset`] after a session
/// comes up cleanly.
#[derive(Clone, Debug)]
pub struct Backoff {
    attempt: u32,
    base_ms: u64,
    max_ms: u64,
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(BASE_DELAY_MS, MAX_DELAY_MS)
    }
}

impl Backoff {
    /// Create a schedule.
    pub fn new(base_ms: u64, max_ms: u64) -> Self {
        Self {
            attempt: 0,
            base_ms,
            max_ms,
        }
    }

    /// Delay before the next attempt; advances the schedule.
    pub fn next_delay(&mut self) -> Duration {
        let delay = backoff_delay(self.attempt, self.base_ms, self.max_ms);
        self.attempt = self.attempt.saturating_add(1);
        delay
    }

    /// Failed attempts since the last reset.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Start over from the base delay.
    pub fn reset(&mut self) {
        self.attempt = 0;
    }
}
