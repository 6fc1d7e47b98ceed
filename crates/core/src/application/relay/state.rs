// Shared relay state observed and mutated by every worker

use crate::application::progress::ProgressMeter;
use crate::application::watchdog::IdleWatchdog;
use crate::application::worker::ShutdownToken;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use tracing::info;

/// Remaining-count estimate, progress counter, idle timer and shutdown signal
#[derive(Debug)]
pub struct RelayState {
    remaining: AtomicI64,
    progress: Arc<ProgressMeter>,
    watchdog: Arc<IdleWatchdog>,
    shutdown: ShutdownToken,
}

impl RelayState {
    pub fn new(
        initial_remaining: i64,
        progress: Arc<ProgressMeter>,
        watchdog: Arc<IdleWatchdog>,
        shutdown: ShutdownToken,
    ) -> Self {
        Self {
            remaining: AtomicI64::new(initial_remaining),
            progress,
            watchdog,
            shutdown,
        }
    }

    /// Current remaining estimate (may go negative)
    pub fn remaining(&self) -> i64 {
        self.remaining.load(Ordering::Acquire)
    }

    /// Stop predicate: estimate exhausted or shutdown signalled
    pub fn is_done(&self) -> bool {
        let remaining = self.remaining();
        if remaining <= 0 {
            info!(remaining, "Stopping, remaining estimate exhausted");
            return true;
        }
        if let Some(reason) = self.shutdown.reason() {
            info!(remaining, %reason, "Stopping on shutdown signal");
            return true;
        }
        false
    }

    /// Subtract `n` confirmed deletions from the estimate and advance progress
    pub fn decr_remaining(&self, n: usize) {
        self.remaining.fetch_sub(n as i64, Ordering::AcqRel);
        self.progress.advance(n as u64);
    }

    /// Restart the idle window
    pub fn reset_idle_timer(&self) {
        self.watchdog.touch();
    }

    pub fn shutdown_token(&self) -> ShutdownToken {
        self.shutdown.clone()
    }

    pub fn progress(&self) -> &Arc<ProgressMeter> {
        &self.progress
    }
}
