//! Relay Controller - wires the worker pool, idle watchdog, progress meter
//! and shutdown signal around one source/destination queue pair.
//!
//! Lifecycle:
//! 1. `start()` seeds the remaining estimate from the source size. A failed
//!    size query is fatal for the run; an empty source returns early.
//! 2. Workers relay batches until the estimate reaches zero or shutdown fires
//!    (external interrupt or idle timeout).
//! 3. `wait()` joins the workers, then stops the background tasks.

mod config;
pub mod signal;
mod state;

pub use config::RelayConfig;
pub use state::RelayState;

use crate::application::progress::ProgressMeter;
use crate::application::retry::RetryPolicy;
use crate::application::watchdog::IdleWatchdog;
use crate::application::worker::{
    shutdown_channel, ShutdownReason, ShutdownSender, Worker, WorkerReport,
};
use crate::error::{AppError, Result};
use crate::port::QueueClient;
use futures::future::BoxFuture;
use std::future::Future;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

/// How `start()` ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    /// Workers are running
    Started,
    /// Source reported no messages; nothing was started
    Empty,
}

/// Final figures of a relay run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelaySummary {
    pub relayed: u64,
    pub remaining: i64,
    /// First shutdown reason; `Completed` when workers stopped on their own
    pub stop_reason: ShutdownReason,
    pub workers: Vec<WorkerReport>,
}

/// Relay Controller
pub struct RelayController {
    source: Arc<dyn QueueClient>,
    destination: Arc<dyn QueueClient>,
    config: RelayConfig,
    interrupt: Option<BoxFuture<'static, ()>>,
    shutdown: ShutdownSender,
    progress: Arc<ProgressMeter>,
    state: Option<Arc<RelayState>>,
    workers: JoinSet<WorkerReport>,
    background: JoinSet<()>,
}

impl RelayController {
    /// Create a controller listening for Ctrl+C / SIGTERM as external interrupt
    pub fn new(
        source: Arc<dyn QueueClient>,
        destination: Arc<dyn QueueClient>,
        config: RelayConfig,
    ) -> Self {
        let (shutdown, _) = shutdown_channel();
        let progress = Arc::new(ProgressMeter::new(config.progress_interval));
        Self {
            source,
            destination,
            config,
            interrupt: Some(Box::pin(signal::wait_for_interrupt())),
            shutdown,
            progress,
            state: None,
            workers: JoinSet::new(),
            background: JoinSet::new(),
        }
    }

    /// Replace the external interrupt source
    pub fn with_interrupt(mut self, interrupt: impl Future<Output = ()> + Send + 'static) -> Self {
        self.interrupt = Some(Box::pin(interrupt));
        self
    }

    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    pub fn progress(&self) -> Arc<ProgressMeter> {
        Arc::clone(&self.progress)
    }

    /// Handle able to fire the shutdown signal from outside
    pub fn shutdown_handle(&self) -> ShutdownSender {
        self.shutdown.clone()
    }

    /// Seed the remaining estimate and start workers, watchdog, interrupt
    /// listener and progress meter.
    ///
    /// # Errors
    /// - AppError::Config if the configuration is out of range
    /// - AppError::InitialCount if the source size cannot be read
    /// - AppError::InvalidState if called twice
    pub async fn start(&mut self) -> Result<StartOutcome> {
        if self.state.is_some() {
            return Err(AppError::InvalidState("relay already started".to_string()));
        }
        self.config.validate()?;

        let initial = self.source.approximate_count().await.map_err(|e| {
            error!(error = %e, "Error getting queue size");
            AppError::InitialCount(e)
        })?;
        if initial <= 0 {
            info!(remaining = initial, "Queue is empty, nothing to relay");
            return Ok(StartOutcome::Empty);
        }

        let token = self.shutdown.token();

        if let Some(interrupt) = self.interrupt.take() {
            let sender = self.shutdown.clone();
            let mut stopped = token.clone();
            self.background.spawn(async move {
                tokio::select! {
                    _ = interrupt => {
                        sender.shutdown(ShutdownReason::Interrupt);
                    }
                    _ = stopped.wait() => {}
                }
            });
        }

        let watchdog = Arc::new(IdleWatchdog::new(self.config.max_idle));
        {
            let watchdog = Arc::clone(&watchdog);
            let sender = self.shutdown.clone();
            let token = token.clone();
            self.background.spawn(async move {
                watchdog.run(sender, token).await;
            });
        }

        let state = Arc::new(RelayState::new(
            initial,
            Arc::clone(&self.progress),
            watchdog,
            token.clone(),
        ));

        for id in 0..self.config.workers {
            let worker = Worker::new(
                id,
                Arc::clone(&self.source),
                Arc::clone(&self.destination),
                Arc::clone(&state),
            )
            .with_receive(self.config.max_batch, self.config.receive_wait)
            .with_retry_policy(RetryPolicy::new(self.config.error_backoff));
            self.workers.spawn(worker.run());
        }

        self.background.spawn(Arc::clone(&self.progress).run(token));
        self.state = Some(state);

        info!(
            workers = self.config.workers,
            remaining = initial,
            max_idle_secs = self.config.max_idle.as_secs_f64(),
            "Relay started"
        );
        Ok(StartOutcome::Started)
    }

    /// Stop predicate; true before a successful start
    pub fn is_done(&self) -> bool {
        self.state.as_ref().map_or(true, |state| state.is_done())
    }

    /// Account `n` deleted messages
    pub fn decr_remaining(&self, n: usize) {
        if let Some(state) = &self.state {
            state.decr_remaining(n);
        }
    }

    /// Restart the idle window
    pub fn reset_idle_timer(&self) {
        if let Some(state) = &self.state {
            state.reset_idle_timer();
        }
    }

    /// Current remaining estimate (0 before a successful start)
    pub fn remaining(&self) -> i64 {
        self.state.as_ref().map_or(0, |state| state.remaining())
    }

    /// Wait for every worker to exit, then stop the background tasks
    pub async fn wait(&mut self) -> RelaySummary {
        let mut reports = Vec::with_capacity(self.config.workers);
        while let Some(joined) = self.workers.join_next().await {
            match joined {
                Ok(report) => reports.push(report),
                Err(e) => error!(error = %e, "Worker task failed"),
            }
        }

        // No-op if an interrupt or the idle watchdog already fired
        self.shutdown.shutdown(ShutdownReason::Completed);
        while let Some(joined) = self.background.join_next().await {
            if let Err(e) = joined {
                warn!(error = %e, "Background task failed");
            }
        }

        reports.sort_by_key(|r| r.worker);
        let summary = RelaySummary {
            relayed: self.progress.total(),
            remaining: self.remaining(),
            stop_reason: self
                .shutdown
                .token()
                .reason()
                .unwrap_or(ShutdownReason::Completed),
            workers: reports,
        };
        info!(
            relayed = summary.relayed,
            remaining = summary.remaining,
            reason = %summary.stop_reason,
            "Relay finished"
        );
        summary
    }
}
