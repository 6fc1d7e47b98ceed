// Worker - receive -> forward -> delete -> account loop

pub mod constants;
mod shutdown;


pub use shutdown::{shutdown_channel, ShutdownReason, ShutdownSender, ShutdownToken};

use crate::application::relay::RelayState;
use crate::application::retry::RetryPolicy;
use crate::domain::Batch;
use crate::port::QueueClient;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

/// Result of one receive/forward/delete round
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundOutcome {
    /// Shutdown fired while waiting on the source
    Interrupted,
    /// Receive call failed
    ReceiveFailed,
    /// Long poll returned no messages
    Empty,
    /// Send call failed; the whole batch stays in the source
    SendFailed,
    /// Destination rejected every entry; nothing to delete
    NothingSent,
    /// Delete call failed; messages were sent but stay in the source
    DeleteFailed,
    /// Messages forwarded and deleted from the source
    Relayed(usize),
}

impl RoundOutcome {
    pub fn is_error(&self) -> bool {
        matches!(
            self,
            RoundOutcome::ReceiveFailed | RoundOutcome::SendFailed | RoundOutcome::DeleteFailed
        )
    }
}

/// Per-worker totals returned when the worker stops
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkerReport {
    pub worker: usize,
    pub rounds: u64,
    pub relayed: u64,
    pub errors: u64,
}

/// Worker relays batches from the source to the destination queue
pub struct Worker {
    id: usize,
    source: Arc<dyn QueueClient>,
    destination: Arc<dyn QueueClient>,
    state: Arc<RelayState>,
    max_batch: usize,
    receive_wait: Duration,
    retry_policy: RetryPolicy,
}

impl Worker {
    pub fn new(
        id: usize,
        source: Arc<dyn QueueClient>,
        destination: Arc<dyn QueueClient>,
        state: Arc<RelayState>,
    ) -> Self {
        Self {
            id,
            source,
            destination,
            state,
            max_batch: crate::domain::MAX_BATCH_SIZE,
            receive_wait: constants::RECEIVE_WAIT,
            retry_policy: RetryPolicy::immediate(),
        }
    }

    pub fn with_receive(mut self, max_batch: usize, receive_wait: Duration) -> Self {
        self.max_batch = max_batch;
        self.receive_wait = receive_wait;
        self
    }

    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    /// Run worker loop until the relay is done.
    ///
    /// The stop predicate is checked once per iteration, before each receive.
    pub async fn run(mut self) -> WorkerReport {
        info!(worker = self.id, "Worker started");
        let mut shutdown = self.state.shutdown_token();
        let mut report = WorkerReport {
            worker: self.id,
            ..Default::default()
        };

        while !self.state.is_done() {
            let outcome = self.relay_round().await;
            report.rounds += 1;

            match outcome {
                RoundOutcome::Interrupted => continue,
                RoundOutcome::Relayed(n) => {
                    report.relayed += n as u64;
                    self.retry_policy.record_success();
                }
                RoundOutcome::Empty | RoundOutcome::NothingSent => {
                    self.retry_policy.record_success();
                }
                RoundOutcome::ReceiveFailed
                | RoundOutcome::SendFailed
                | RoundOutcome::DeleteFailed => {
                    report.errors += 1;
                    let delay = self.retry_policy.record_failure();
                    if !delay.is_zero() {
                        tokio::select! {
                            _ = sleep(delay) => {},
                            _ = shutdown.wait() => {
                                debug!(worker = self.id, "Worker interrupted during backoff");
                            }
                        }
                    }
                }
            }
        }

        info!(
            worker = self.id,
            rounds = report.rounds,
            relayed = report.relayed,
            errors = report.errors,
            "Worker stopped"
        );
        report
    }

    /// Run a single round.
    ///
    /// The long poll is raced against the shutdown signal. Once a batch has been
    /// received the round always runs to completion.
    pub async fn relay_round(&self) -> RoundOutcome {
        let mut shutdown = self.state.shutdown_token();

        // Dropping an in-flight receive is safe: anything the source handed out
        // becomes visible again after its visibility timeout.
        let received = tokio::select! {
            res = self.source.receive(self.max_batch, self.receive_wait) => res,
            _ = shutdown.wait() => return RoundOutcome::Interrupted,
        };

        let messages = match received {
            Ok(messages) => messages,
            Err(e) => {
                error!(
                    worker = self.id,
                    remaining = self.state.remaining(),
                    error = %e,
                    "Error receiving messages"
                );
                return RoundOutcome::ReceiveFailed;
            }
        };
        if messages.is_empty() {
            return RoundOutcome::Empty;
        }

        self.state.reset_idle_timer();

        let batch = match Batch::new(messages) {
            Ok(batch) => batch,
            Err(e) => {
                error!(worker = self.id, error = %e, "Source returned an oversized batch");
                return RoundOutcome::ReceiveFailed;
            }
        };

        let outcome = match self.destination.send_batch(&batch.send_entries()).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(
                    worker = self.id,
                    batch = batch.len(),
                    error = %e,
                    "Error sending messages, batch left in source"
                );
                return RoundOutcome::SendFailed;
            }
        };

        let entries = batch.delete_entries(&outcome);
        if entries.len() < batch.len() {
            warn!(
                worker = self.id,
                sent = entries.len(),
                failed = batch.len() - entries.len(),
                "Destination rejected part of the batch"
            );
        }
        if entries.is_empty() {
            return RoundOutcome::NothingSent;
        }

        match self.source.delete_batch(&entries).await {
            Ok(ack) => {
                if !ack.failed.is_empty() {
                    // Accounting still uses the requested count
                    warn!(
                        worker = self.id,
                        requested = entries.len(),
                        failed = ack.failed.len(),
                        "Source did not delete every entry"
                    );
                }
            }
            Err(e) => {
                error!(
                    worker = self.id,
                    remaining = self.state.remaining(),
                    error = %e,
                    "Error deleting messages, batch left in source"
                );
                return RoundOutcome::DeleteFailed;
            }
        }

        self.state.decr_remaining(entries.len());
        debug!(worker = self.id, relayed = entries.len(), "Batch relayed");
        RoundOutcome::Relayed(entries.len())
    }
}
