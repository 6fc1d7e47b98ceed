//! Idle Watchdog - stops the relay when no message arrives within the idle window
//!
//! Workers record activity as a monotonic timestamp; a single watchdog task
//! sleeps until `last_activity + max_idle` and re-checks. A touch that races
//! with the check only pushes the deadline further out, so there is no timer
//! to drain and no stale expiry can fire the shutdown signal.

use crate::application::worker::{ShutdownReason, ShutdownSender, ShutdownToken};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info};

/// Resettable idle timer shared by all workers
#[derive(Debug)]
pub struct IdleWatchdog {
    origin: Instant,
    /// Nanoseconds since `origin` of the most recent activity
    last_activity: AtomicU64,
    max_idle: Duration,
}

impl IdleWatchdog {
    /// Arm the watchdog; the idle window starts now
    pub fn new(max_idle: Duration) -> Self {
        Self {
            origin: Instant::now(),
            last_activity: AtomicU64::new(0),
            max_idle,
        }
    }

    /// Record activity, restarting the idle window.
    ///
    /// Safe under concurrent calls: the stored timestamp never moves backwards.
    pub fn touch(&self) {
        let now = self.origin.elapsed().as_nanos() as u64;
        self.last_activity.fetch_max(now, Ordering::AcqRel);
    }

    /// Time since the last recorded activity
    pub fn idle_for(&self) -> Duration {
        self.origin.elapsed().saturating_sub(self.last_activity_offset())
    }

    /// Instant at which the watchdog fires if nothing else happens
    pub fn deadline(&self) -> Instant {
        self.origin + self.last_activity_offset() + self.max_idle
    }

    fn last_activity_offset(&self) -> Duration {
        Duration::from_nanos(self.last_activity.load(Ordering::Acquire))
    }

    /// Watchdog loop (background task).
    ///
    /// Returns true if this watchdog fired the shutdown signal, false if the
    /// relay was stopped by something else first.
    pub async fn run(self: Arc<Self>, shutdown: ShutdownSender, mut token: ShutdownToken) -> bool {
        debug!(max_idle = ?self.max_idle, "Idle watchdog armed");
        loop {
            let deadline = self.deadline();
            if Instant::now() >= deadline {
                info!(idle_for = ?self.idle_for(), "No messages received within idle window");
                return shutdown.shutdown(ShutdownReason::IdleTimeout);
            }

            tokio::select! {
                _ = sleep_until(deadline) => {}
                _ = token.wait() => {
                    debug!("Idle watchdog disarmed");
                    return false;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::worker::shutdown_channel;

    const WINDOW: Duration = Duration::from_secs(10);

    #[tokio::test(start_paused = true)]
    async fn test_fires_after_idle_window() {
        let (tx, token) = shutdown_channel();
        let watchdog = Arc::new(IdleWatchdog::new(WINDOW));
        let started = Instant::now();

        let fired = watchdog.run(tx, token.clone()).await;

        assert!(fired);
        assert_eq!(token.reason(), Some(ShutdownReason::IdleTimeout));
        let elapsed = started.elapsed();
        assert!(elapsed >= WINDOW);
        assert!(elapsed < WINDOW + Duration::from_millis(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_touch_extends_deadline() {
        let (tx, token) = shutdown_channel();
        let watchdog = Arc::new(IdleWatchdog::new(WINDOW));
        let started = Instant::now();

        let handle = tokio::spawn(watchdog.clone().run(tx, token.clone()));

        // Keep the relay busy for 20s, touching every 4s
        for _ in 0..5 {
            tokio::time::sleep(Duration::from_secs(4)).await;
            watchdog.touch();
            assert!(!token.is_shutdown());
        }

        assert!(handle.await.unwrap());
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(30));
        assert!(elapsed < Duration::from_secs(31));
    }

    #[tokio::test(start_paused = true)]
    async fn test_disarmed_by_other_shutdown() {
        let (tx, token) = shutdown_channel();
        let watchdog = Arc::new(IdleWatchdog::new(WINDOW));
        let handle = tokio::spawn(watchdog.run(tx.clone(), token.clone()));

        tokio::time::sleep(Duration::from_secs(1)).await;
        tx.shutdown(ShutdownReason::Interrupt);

        assert!(!handle.await.unwrap());
        assert_eq!(token.reason(), Some(ShutdownReason::Interrupt));
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_touches_never_rewind() {
        let watchdog = Arc::new(IdleWatchdog::new(WINDOW));
        tokio::time::sleep(Duration::from_secs(3)).await;
        watchdog.touch();
        let deadline = watchdog.deadline();

        let mut tasks = tokio::task::JoinSet::new();
        for _ in 0..8 {
            let w = watchdog.clone();
            tasks.spawn(async move { w.touch() });
        }
        while tasks.join_next().await.is_some() {}

        assert!(watchdog.deadline() >= deadline);
        assert_eq!(watchdog.idle_for(), Duration::ZERO);
    }
}
