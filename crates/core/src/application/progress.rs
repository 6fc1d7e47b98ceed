// Progress Meter - relayed message counter and throughput ticker

use crate::application::worker::ShutdownToken;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info};

/// Counter of messages relayed and deleted from the source.
///
/// Owned by one relay and shared by `Arc` with its workers, so several
/// relays can run side by side in one process.
#[derive(Debug)]
pub struct ProgressMeter {
    relayed: AtomicU64,
    interval: Duration,
}

impl ProgressMeter {
    pub fn new(interval: Duration) -> Self {
        Self {
            relayed: AtomicU64::new(0),
            interval,
        }
    }

    /// Advance the counter by `n` relayed messages
    pub fn advance(&self, n: u64) {
        self.relayed.fetch_add(n, Ordering::AcqRel);
    }

    pub fn total(&self) -> u64 {
        self.relayed.load(Ordering::Acquire)
    }

    /// Ticker loop (background task), logs the throughput every interval
    /// until shutdown fires
    pub async fn run(self: Arc<Self>, mut shutdown: ShutdownToken) {
        let mut tracker = RateTracker::new(self.total(), Instant::now());
        let mut tick = interval_at(Instant::now() + self.interval, self.interval);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = tick.tick() => {}
                _ = shutdown.wait() => {
                    debug!(relayed = self.total(), "Progress meter stopped");
                    return;
                }
            }

            let sample = tracker.sample(self.total(), Instant::now());
            info!(
                relayed = sample.total,
                rate = sample.rate,
                "Relay progress"
            );
        }
    }
}

/// One throughput measurement
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressSample {
    pub total: u64,
    pub delta: u64,
    /// Messages per second since the previous sample
    pub rate: f64,
}

/// Computes the rate between successive counter snapshots
#[derive(Debug, Clone)]
pub struct RateTracker {
    last_total: u64,
    last_at: Instant,
}

impl RateTracker {
    pub fn new(total: u64, at: Instant) -> Self {
        Self {
            last_total: total,
            last_at: at,
        }
    }

    /// Take a sample and make it the new snapshot
    pub fn sample(&mut self, total: u64, at: Instant) -> ProgressSample {
        let delta = total.saturating_sub(self.last_total);
        let elapsed = at.saturating_duration_since(self.last_at).as_secs_f64();
        let rate = if elapsed > 0.0 {
            delta as f64 / elapsed
        } else {
            0.0
        };

        self.last_total = total;
        self.last_at = at;
        ProgressSample { total, delta, rate }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::worker::{shutdown_channel, ShutdownReason};

    #[test]
    fn test_rate_is_delta_over_elapsed() {
        let start = Instant::now();
        let mut tracker = RateTracker::new(0, start);

        let first = tracker.sample(50, start + Duration::from_secs(2));
        assert_eq!(first.delta, 50);
        assert_eq!(first.rate, 25.0);

        let second = tracker.sample(60, start + Duration::from_secs(3));
        assert_eq!(second.total, 60);
        assert_eq!(second.delta, 10);
        assert_eq!(second.rate, 10.0);
    }

    #[test]
    fn test_zero_elapsed_reports_zero_rate() {
        let start = Instant::now();
        let mut tracker = RateTracker::new(5, start);
        let sample = tracker.sample(9, start);
        assert_eq!(sample.delta, 4);
        assert_eq!(sample.rate, 0.0);
    }

    #[tokio::test]
    async fn test_concurrent_advance_is_exact() {
        let meter = Arc::new(ProgressMeter::new(Duration::from_secs(1)));
        let mut tasks = tokio::task::JoinSet::new();
        for _ in 0..16 {
            let m = meter.clone();
            tasks.spawn(async move {
                for _ in 0..100 {
                    m.advance(3);
                }
            });
        }
        while tasks.join_next().await.is_some() {}
        assert_eq!(meter.total(), 16 * 100 * 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticker_stops_on_shutdown() {
        let (tx, token) = shutdown_channel();
        let meter = Arc::new(ProgressMeter::new(Duration::from_secs(1)));
        let handle = tokio::spawn(meter.clone().run(token));

        meter.advance(7);
        tokio::time::sleep(Duration::from_millis(3500)).await;
        assert!(!handle.is_finished());

        tx.shutdown(ShutdownReason::Completed);
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("ticker should stop")
            .unwrap();
    }
}
