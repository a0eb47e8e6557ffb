//! Reconnect backoff schedule.
//!
//! Delay for attempt `n` is `base * 2^n`, with `n` starting at 1, so the
//! first retry waits twice the base delay. There is no delay cap; the only
//! bound is the attempt ceiling.

use std::time::Duration;

/// Default attempt ceiling.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;

/// Default base delay.
pub const DEFAULT_BASE_DELAY_MS: u64 = 1000;

/// Exponential backoff state for one connection manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconnectBackoff {
    attempt: u32,
    max_attempts: u32,
    base_delay_ms: u64,
}

impl ReconnectBackoff {
    pub fn new(max_attempts: u32, base_delay_ms: u64) -> Self {
        Self {
            attempt: 0,
            max_attempts,
            base_delay_ms,
        }
    }

    /// Number of reconnects scheduled since the last successful open.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// True once the ceiling is reached; no further attempt may be made.
    pub fn is_exhausted(&self) -> bool {
        self.attempt >= self.max_attempts
    }

    /// Delay for a given attempt number, without touching the counter.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 1u64.checked_shl(attempt).unwrap_or(u64::MAX);
        Duration::from_millis(self.base_delay_ms.saturating_mul(factor))
    }

    /// Count one more attempt and return its delay, or `None` at the ceiling.
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.is_exhausted() {
            return None;
        }
        self.attempt += 1;
        Some(self.delay_for(self.attempt))
    }

    /// Called after a successful open.
    pub fn reset(&mut self) {
        self.attempt = 0;
    }
}

impl Default for ReconnectBackoff {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS, DEFAULT_BASE_DELAY_MS)
    }
}
