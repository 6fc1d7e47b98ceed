// SQS QueueClient implementation
use async_trait::async_trait;
use aws_sdk_sqs::error::DisplayErrorContext;
use aws_sdk_sqs::types::{
    DeleteMessageBatchRequestEntry, QueueAttributeName, SendMessageBatchRequestEntry,
};
use aws_sdk_sqs::Client;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};

use sqspipe_core::domain::{
    DeleteAck, DeleteEntry, Message, MessageId, SendEntry, SendOutcome, MAX_BATCH_SIZE,
};
use sqspipe_core::port::{QueueClient, QueueError};

/// One SQS queue reached through a shared client
#[derive(Debug, Clone)]
pub struct SqsQueue {
    client: Client,
    queue_url: String,
}

impl SqsQueue {
    pub fn new(client: Client, queue_url: impl Into<String>) -> Self {
        Self {
            client,
            queue_url: queue_url.into(),
        }
    }
}

fn api_error<E>(operation: &'static str, err: E) -> QueueError
where
    E: std::error::Error,
{
    QueueError::api(operation, DisplayErrorContext(err).to_string())
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

/// Merge the per-entry results of a SendMessageBatch call.
///
/// Entries listed in neither list are reported as failed.
fn send_outcome<'a>(
    entries: &[SendEntry],
    successful: impl IntoIterator<Item = &'a str>,
) -> SendOutcome {
    let mut outcome: SendOutcome = entries.iter().map(|e| (e.id.clone(), false)).collect();
    for id in successful {
        outcome.record(MessageId::new(id), true);
    }
    outcome
}

/// Read ApproximateNumberOfMessages; a missing or unparsable value counts as 0
fn approximate_count_from(attributes: Option<&HashMap<QueueAttributeName, String>>) -> i64 {
    attributes
        .and_then(|attrs| attrs.get(&QueueAttributeName::ApproximateNumberOfMessages))
        .and_then(|value| value.parse::<i64>().ok())
        .unwrap_or(0)
}

#[async_trait]
impl QueueClient for SqsQueue {
    async fn receive(&self, max_count: usize, wait: Duration) -> Result<Vec<Message>, QueueError> {
        if max_count > MAX_BATCH_SIZE {
            return Err(QueueError::BatchTooLarge {
                limit: MAX_BATCH_SIZE,
                actual: max_count,
            });
        }

        let output = self
            .client
            .receive_message()
            .queue_url(&self.queue_url)
            .max_number_of_messages(max_count as i32)
            .wait_time_seconds(wait.as_secs() as i32)
            .send()
            .await
            .map_err(|e| api_error("ReceiveMessage", e))?;

        let mut messages = Vec::with_capacity(output.messages().len());
        for m in output.messages() {
            match (m.message_id(), m.receipt_handle()) {
                (Some(id), Some(receipt)) => messages.push(Message::new(
                    id,
                    m.body().unwrap_or_default(),
                    receipt,
                )),
                _ => warn!(queue = %self.queue_url, "Skipping message without id or receipt handle"),
            }
        }
        Ok(messages)
    }

    async fn send_batch(&self, entries: &[SendEntry]) -> Result<SendOutcome, QueueError> {
        check_batch("SendMessageBatch", entries.len())?;

        let request_entries = entries
            .iter()
            .map(|e| {
                SendMessageBatchRequestEntry::builder()
                    .id(e.id.as_str())
                    .message_body(&e.body)
                    .build()
                    .map_err(|err| api_error("SendMessageBatch", err))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let output = self
            .client
            .send_message_batch()
            .queue_url(&self.queue_url)
            .set_entries(Some(request_entries))
            .send()
            .await
            .map_err(|e| api_error("SendMessageBatch", e))?;

        for failure in output.failed() {
            debug!(
                id = failure.id(),
                code = failure.code(),
                message = failure.message().unwrap_or("unknown"),
                "Send entry failed"
            );
        }
        Ok(send_outcome(
            entries,
            output.successful().iter().map(|s| s.id()),
        ))
    }

    async fn delete_batch(&self, entries: &[DeleteEntry]) -> Result<DeleteAck, QueueError> {
        check_batch("DeleteMessageBatch", entries.len())?;

        let request_entries = entries
            .iter()
            .map(|e| {
                DeleteMessageBatchRequestEntry::builder()
                    .id(e.id.as_str())
                    .receipt_handle(e.receipt.as_str())
                    .build()
                    .map_err(|err| api_error("DeleteMessageBatch", err))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let output = self
            .client
            .delete_message_batch()
            .queue_url(&self.queue_url)
            .set_entries(Some(request_entries))
            .send()
            .await
            .map_err(|e| api_error("DeleteMessageBatch", e))?;

        Ok(DeleteAck {
            failed: output
                .failed()
                .iter()
                .map(|f| MessageId::new(f.id()))
                .collect(),
        })
    }

    async fn approximate_count(&self) -> Result<i64, QueueError> {
        let output = self
            .client
            .get_queue_attributes()
            .queue_url(&self.queue_url)
            .attribute_names(QueueAttributeName::ApproximateNumberOfMessages)
            .send()
            .await
            .map_err(|e| api_error("GetQueueAttributes", e))?;

        Ok(approximate_count_from(output.attributes()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries(n: usize) -> Vec<SendEntry> {
        (0..n)
            .map(|i| SendEntry {
                id: MessageId::new(format!("m{i}")),
                body: format!("b{i}"),
            })
            .collect()
    }

    #[test]
    fn test_send_outcome_marks_unlisted_entries_failed() {
        let entries = entries(10);
        let outcome = send_outcome(&entries, ["m0", "m2", "m4", "m5", "m6", "m8", "m9"]);

        assert_eq!(outcome.success_count(), 7);
        assert_eq!(outcome.failure_count(), 3);
        assert!(outcome.is_success(&MessageId::new("m2")));
        assert!(!outcome.is_success(&MessageId::new("m3")));
    }

    #[test]
    fn test_approximate_count_parsing() {
        let mut attrs = HashMap::new();
        assert_eq!(approximate_count_from(None), 0);
        assert_eq!(approximate_count_from(Some(&attrs)), 0);

        attrs.insert(
            QueueAttributeName::ApproximateNumberOfMessages,
            "1234".to_string(),
        );
        assert_eq!(approximate_count_from(Some(&attrs)), 1234);

        attrs.insert(
            QueueAttributeName::ApproximateNumberOfMessages,
            "n/a".to_string(),
        );
        assert_eq!(approximate_count_from(Some(&attrs)), 0);
    }

    #[test]
    fn test_batch_limits() {
        assert_eq!(
            check_batch("SendMessageBatch", 0),
            Err(QueueError::EmptyBatch {
                operation: "SendMessageBatch"
            })
        );
        tokio_test::assert_ok!(check_batch("SendMessageBatch", 10));
        assert_eq!(
            check_batch("DeleteMessageBatch", 11),
            Err(QueueError::BatchTooLarge {
                limit: 10,
                actual: 11
            })
        );
    }
}
