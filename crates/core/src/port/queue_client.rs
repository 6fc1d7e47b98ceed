// Queue Client Port (Interface)
// One instance is bound to one queue endpoint; the relay holds a source and a destination.

use crate::domain::{DeleteAck, DeleteEntry, Message, SendEntry, SendOutcome};
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Queue call errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueueError {
    #[error("{operation} failed: {message}")]
    Api {
        operation: &'static str,
        message: String,
    },

    #[error("Batch too large: {actual} entries (limit {limit})")]
    BatchTooLarge { limit: usize, actual: usize },

    #[error("{operation} called with an empty batch")]
    EmptyBatch { operation: &'static str },
}

impl QueueError {
    pub fn api(operation: &'static str, message: impl Into<String>) -> Self {
        QueueError::Api {
            operation,
            message: message.into(),
        }
    }
}

/// Remote queue capability set consumed by the relay engine
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QueueClient: Send + Sync {
    /// Receive up to `max_count` messages, long-polling for at most `wait`
    ///
    /// # Errors
    /// - QueueError::BatchTooLarge if `max_count` exceeds the batch limit
    /// - QueueError::Api on transport or service failure
    async fn receive(&self, max_count: usize, wait: Duration) -> Result<Vec<Message>, QueueError>;

    /// Send a batch and report per-entry success
    ///
    /// A call-level error means none of the entries can be assumed delivered.
    async fn send_batch(&self, entries: &[SendEntry]) -> Result<SendOutcome, QueueError>;

    /// Delete a batch of previously received messages by receipt token
    async fn delete_batch(&self, entries: &[DeleteEntry]) -> Result<DeleteAck, QueueError>;

    /// Approximate number of messages available in the queue
    async fn approximate_count(&self) -> Result<i64, QueueError>;
}

// ============================================================================
// In-memory Implementation for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use crate::domain::{MessageId, ReceiptToken, MAX_BATCH_SIZE};
    use std::collections::{HashMap, VecDeque};
    use std::sync::{Mutex, MutexGuard};
    use tokio::sync::Notify;
    use tokio::time::{sleep_until, Instant};

    /// Default time a received message stays hidden from other receivers
    pub const DEFAULT_VISIBILITY_TIMEOUT: Duration = Duration::from_secs(30);

    /// Number of calls made per operation
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
    pub struct CallCounts {
        pub receive: usize,
        pub send: usize,
        pub delete: usize,
        pub count: usize,
    }

    #[derive(Debug, Default)]
    struct Faults {
        receive: usize,
        send: usize,
        delete: usize,
        count: usize,
        reject_send_entries: usize,
        reject_delete_entries: usize,
    }

    #[derive(Debug, Clone)]
    struct Stored {
        id: MessageId,
        body: String,
    }

    #[derive(Debug)]
    struct InFlight {
        message: Stored,
        visible_at: Instant,
    }

    #[derive(Debug, Default)]
    struct QueueState {
        visible: VecDeque<Stored>,
        in_flight: HashMap<ReceiptToken, InFlight>,
        faults: Faults,
        calls: CallCounts,
        deleted: Vec<MessageId>,
        count_override: Option<i64>,
    }

    impl QueueState {
        /// Return expired in-flight messages to the visible queue (redelivery)
        fn requeue_expired(&mut self, now: Instant) {
            let expired: Vec<ReceiptToken> = self
                .in_flight
                .iter()
                .filter(|(_, f)| f.visible_at <= now)
                .map(|(token, _)| token.clone())
                .collect();
            for token in expired {
                if let Some(f) = self.in_flight.remove(&token) {
                    self.visible.push_back(f.message);
                }
            }
        }

        fn next_visibility_change(&self) -> Option<Instant> {
            self.in_flight.values().map(|f| f.visible_at).min()
        }
    }

    /// In-memory queue with SQS-like semantics (long polling, visibility timeout,
    /// receipt-based deletion) and fault injection.
    pub struct InMemoryQueue {
        name: String,
        visibility_timeout: Duration,
        state: Mutex<QueueState>,
        arrivals: Notify,
    }

    impl InMemoryQueue {
        pub fn new(name: impl Into<String>) -> Self {
            Self {
                name: name.into(),
                visibility_timeout: DEFAULT_VISIBILITY_TIMEOUT,
                state: Mutex::new(QueueState::default()),
                arrivals: Notify::new(),
            }
        }

        /// Create a queue pre-filled with `count` messages
        pub fn with_messages(name: impl Into<String>, count: usize) -> Self {
            let queue = Self::new(name);
            for i in 0..count {
                queue.push(format!("message-{i}"));
            }
            queue
        }

        pub fn with_visibility_timeout(mut self, timeout: Duration) -> Self {
            self.visibility_timeout = timeout;
            self
        }

        /// Append a message and return its id
        pub fn push(&self, body: impl Into<String>) -> MessageId {
            let id = MessageId::new(uuid::Uuid::new_v4().to_string());
            self.state().visible.push_back(Stored {
                id: id.clone(),
                body: body.into(),
            });
            self.arrivals.notify_waiters();
            id
        }

        pub fn visible_len(&self) -> usize {
            self.state().visible.len()
        }

        pub fn in_flight_len(&self) -> usize {
            self.state().in_flight.len()
        }

        /// Bodies of the visible messages, in queue order
        pub fn bodies(&self) -> Vec<String> {
            self.state().visible.iter().map(|m| m.body.clone()).collect()
        }

        /// Ids removed by successful deletes, in deletion order
        pub fn deleted(&self) -> Vec<MessageId> {
            self.state().deleted.clone()
        }

        pub fn calls(&self) -> CallCounts {
            self.state().calls
        }

        pub fn fail_next_receives(&self, n: usize) {
            self.state().faults.receive = n;
        }

        pub fn fail_next_sends(&self, n: usize) {
            self.state().faults.send = n;
        }

        pub fn fail_next_deletes(&self, n: usize) {
            self.state().faults.delete = n;
        }

        pub fn fail_next_counts(&self, n: usize) {
            self.state().faults.count = n;
        }

        /// Report the last `n` entries of the next send as failed
        pub fn reject_next_send_entries(&self, n: usize) {
            self.state().faults.reject_send_entries = n;
        }

        /// Report the last `n` entries of the next delete as failed (and keep them)
        pub fn reject_next_delete_entries(&self, n: usize) {
            self.state().faults.reject_delete_entries = n;
        }

        /// Pin the value returned by `approximate_count` (None = real size)
        pub fn set_approximate_count(&self, count: Option<i64>) {
            self.state().count_override = count;
        }

        fn injected(&self, operation: &'static str) -> QueueError {
            QueueError::api(operation, format!("injected failure on {}", self.name))
        }

        fn state(&self) -> MutexGuard<'_, QueueState> {
            // A panicking test thread must not hide the queue from the others
            self.state.lock().unwrap_or_else(|e| e.into_inner())
        }

        fn check_batch(operation: &'static str, len: usize) -> Result<(), QueueError> {
            if len == 0 {
                return Err(QueueError::EmptyBatch { operation });
            }
            if len > MAX_BATCH_SIZE {
                return Err(QueueError::BatchTooLarge {
                    limit: MAX_BATCH_SIZE,
                    actual: len,
                });
            }
            Ok(())
        }
    }

    #[async_trait]
    impl QueueClient for InMemoryQueue {
        async fn receive(
            &self,
            max_count: usize,
            wait: Duration,
        ) -> Result<Vec<Message>, QueueError> {
            if max_count > MAX_BATCH_SIZE {
                return Err(QueueError::BatchTooLarge {
                    limit: MAX_BATCH_SIZE,
                    actual: max_count,
                });
            }
            {
                let mut state = self.state();
                state.calls.receive += 1;
                if state.faults.receive > 0 {
                    state.faults.receive -= 1;
                    return Err(self.injected("ReceiveMessage"));
                }
            }

            let deadline = Instant::now() + wait;
            loop {
                // Registered before inspecting the queue so a concurrent push is not missed
                let arrived = self.arrivals.notified();
                let wake_at = {
                    let now = Instant::now();
                    let mut state = self.state();
                    state.requeue_expired(now);

                    let take = max_count.min(state.visible.len());
                    if take > 0 {
                        let visible_at = now + self.visibility_timeout;
                        let mut batch = Vec::with_capacity(take);
                        let taken: Vec<Stored> = state.visible.drain(..take).collect();
                        for stored in taken {
                            let receipt = ReceiptToken::new(uuid::Uuid::new_v4().to_string());
                            batch.push(Message {
                                id: stored.id.clone(),
                                body: stored.body.clone(),
                                receipt: receipt.clone(),
                            });
                            state.in_flight.insert(
                                receipt,
                                InFlight {
                                    message: stored,
                                    visible_at,
                                },
                            );
                        }
                        return Ok(batch);
                    }
                    if now >= deadline {
                        return Ok(Vec::new());
                    }
                    state
                        .next_visibility_change()
                        .map_or(deadline, |at| at.min(deadline))
                };

                tokio::select! {
                    _ = arrived => {}
                    _ = sleep_until(wake_at) => {}
                }
            }
        }

        async fn send_batch(&self, entries: &[SendEntry]) -> Result<SendOutcome, QueueError> {
            Self::check_batch("SendMessageBatch", entries.len())?;
            let mut outcome = SendOutcome::new();
            {
                let mut state = self.state();
                state.calls.send += 1;
                if state.faults.send > 0 {
                    state.faults.send -= 1;
                    return Err(self.injected("SendMessageBatch"));
                }
                let rejected = std::mem::take(&mut state.faults.reject_send_entries);
                let accepted = entries.len().saturating_sub(rejected);
                for (i, entry) in entries.iter().enumerate() {
                    let ok = i < accepted;
                    if ok {
                        state.visible.push_back(Stored {
                            id: MessageId::new(uuid::Uuid::new_v4().to_string()),
                            body: entry.body.clone(),
                        });
                    }
                    outcome.record(entry.id.clone(), ok);
                }
            }
            self.arrivals.notify_waiters();
            Ok(outcome)
        }

        async fn delete_batch(&self, entries: &[DeleteEntry]) -> Result<DeleteAck, QueueError> {
            Self::check_batch("DeleteMessageBatch", entries.len())?;
            let mut state = self.state();
            state.calls.delete += 1;
            if state.faults.delete > 0 {
                state.faults.delete -= 1;
                return Err(self.injected("DeleteMessageBatch"));
            }

            let rejected = std::mem::take(&mut state.faults.reject_delete_entries);
            let keep_from = entries.len().saturating_sub(rejected);
            let mut ack = DeleteAck::all_deleted();
            for (i, entry) in entries.iter().enumerate() {
                if i >= keep_from {
                    ack.failed.push(entry.id.clone());
                    continue;
                }
                match state.in_flight.remove(&entry.receipt) {
                    Some(_) => state.deleted.push(entry.id.clone()),
                    // Expired receipt: the message was already handed out again
                    None => ack.failed.push(entry.id.clone()),
                }
            }
            Ok(ack)
        }

        async fn approximate_count(&self) -> Result<i64, QueueError> {
            let mut state = self.state();
            state.calls.count += 1;
            if state.faults.count > 0 {
                state.faults.count -= 1;
                return Err(self.injected("GetQueueAttributes"));
            }
            if let Some(count) = state.count_override {
                return Ok(count);
            }
            state.requeue_expired(Instant::now());
            Ok(state.visible.len() as i64)
        }
    }

}
