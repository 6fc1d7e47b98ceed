// Relay configuration

use crate::application::worker::constants::*;
use crate::domain::MAX_BATCH_SIZE;
use crate::error::{AppError, Result};
use std::time::Duration;

/// Tunables of one relay run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayConfig {
    /// Number of parallel workers (1..=20)
    pub workers: usize,
    /// Idle window before the relay stops on its own (1s..=60s)
    pub max_idle: Duration,
    /// Long-poll wait of each receive call (at most 20s)
    pub receive_wait: Duration,
    /// Messages requested per receive call (1..=10)
    pub max_batch: usize,
    /// Progress meter sampling period
    pub progress_interval: Duration,
    /// Base delay after a failed round; zero retries immediately
    pub error_backoff: Duration,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            max_idle: DEFAULT_MAX_IDLE,
            receive_wait: RECEIVE_WAIT,
            max_batch: MAX_BATCH_SIZE,
            progress_interval: PROGRESS_INTERVAL,
            error_backoff: Duration::ZERO,
        }
    }
}

impl RelayConfig {
    pub fn new(workers: usize, max_idle: Duration) -> Self {
        Self {
            workers,
            max_idle,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 || self.workers > MAX_WORKERS {
            return Err(AppError::Config(format!(
                "workers must be between 1 and {MAX_WORKERS}"
            )));
        }
        if self.max_idle < MIN_MAX_IDLE || self.max_idle > MAX_MAX_IDLE {
            return Err(AppError::Config(format!(
                "max_idle must be between {}s and {}s",
                MIN_MAX_IDLE.as_secs(),
                MAX_MAX_IDLE.as_secs()
            )));
        }
        if self.receive_wait > MAX_RECEIVE_WAIT {
            return Err(AppError::Config(format!(
                "receive wait must be at most {}s",
                MAX_RECEIVE_WAIT.as_secs()
            )));
        }
        if self.max_batch == 0 || self.max_batch > MAX_BATCH_SIZE {
            return Err(AppError::Config(format!(
                "batch size must be between 1 and {MAX_BATCH_SIZE}"
            )));
        }
        if self.progress_interval.is_zero() {
            return Err(AppError::Config(
                "progress interval must be positive".to_string(),
            ));
        }
        if self.error_backoff > MAX_ERROR_BACKOFF {
            return Err(AppError::Config(format!(
                "error backoff must be at most {}s",
                MAX_ERROR_BACKOFF.as_secs()
            )));
        }
        Ok(())
    }
}
