// Error backoff for worker rounds
use crate::application::worker::constants::MAX_ERROR_BACKOFF;
use std::time::Duration;
use tracing::debug;

/// Per-worker backoff after failed rounds.
///
/// Delay doubles with every consecutive failure, starting at `base_delay` and
/// capped at `max_delay`; any successful round resets it. A zero base delay
/// retries immediately, which lets a persistently failing queue spin at full
/// rate.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    base_delay: Duration,
    max_delay: Duration,
    consecutive_failures: u32,
}

impl RetryPolicy {
    /// Create a new retry policy
    ///
    /// # Example
    /// ```text
    /// let mut policy = RetryPolicy::new(Duration::from_millis(100));
    /// assert_eq!(policy.record_failure(), Duration::from_millis(100));
    /// assert_eq!(policy.record_failure(), Duration::from_millis(200));
    /// ```
    pub fn new(base_delay: Duration) -> Self {
        Self {
            base_delay,
            max_delay: MAX_ERROR_BACKOFF,
            consecutive_failures: 0,
        }
    }

    /// Policy that never waits between failed rounds
    pub fn immediate() -> Self {
        Self::new(Duration::ZERO)
    }

    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    /// Register a failed round and return how long to wait before the next one
    pub fn record_failure(&mut self) -> Duration {
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        if self.base_delay.is_zero() {
            return Duration::ZERO;
        }

        let exponent = (self.consecutive_failures - 1).min(16);
        let delay = self
            .base_delay
            .checked_mul(1u32 << exponent)
            .unwrap_or(self.max_delay)
            .min(self.max_delay);

        debug!(
            failures = self.consecutive_failures,
            delay_ms = delay.as_millis() as u64,
            "Backing off after failed round"
        );
        delay
    }

    pub fn record_success(&mut self) {
        self.consecutive_failures = 0;
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }
}
