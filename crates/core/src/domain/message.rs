// Message Domain Model

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use super::error::{DomainError, Result};

/// Maximum number of messages in one receive/send/delete call
pub const MAX_BATCH_SIZE: usize = 10;

/// Id assigned to a message by the queue that delivered it
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MessageId(String);

impl MessageId {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque credential needed to delete a message from the queue it came from.
///
/// Only meaningful to the source queue; it is never sent to the destination.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReceiptToken(String);

impl ReceiptToken {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// Receipt handles are long and noisy in logs
impl fmt::Debug for ReceiptToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix: String = self.0.chars().take(8).collect();
        write!(f, "ReceiptToken({prefix}..)")
    }
}

/// A message received from the source queue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub body: String,
    pub receipt: ReceiptToken,
}

impl Message {
    pub fn new(id: impl Into<String>, body: impl Into<String>, receipt: impl Into<String>) -> Self {
        Self {
            id: MessageId::new(id),
            body: body.into(),
            receipt: ReceiptToken::new(receipt),
        }
    }
}

/// One entry of a send request (destination id = source id)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendEntry {
    pub id: MessageId,
    pub body: String,
}

/// One entry of a delete request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteEntry {
    pub id: MessageId,
    pub receipt: ReceiptToken,
}

/// Per-entry result of a single send call.
///
/// Ids missing from the outcome count as failed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SendOutcome {
    results: HashMap<MessageId, bool>,
}

impl SendOutcome {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, id: MessageId, success: bool) {
        self.results.insert(id, success);
    }

    pub fn is_success(&self, id: &MessageId) -> bool {
        self.results.get(id).copied().unwrap_or(false)
    }

    pub fn success_count(&self) -> usize {
        self.results.values().filter(|ok| **ok).count()
    }

    pub fn failure_count(&self) -> usize {
        self.results.len() - self.success_count()
    }
}

impl FromIterator<(MessageId, bool)> for SendOutcome {
    fn from_iter<I: IntoIterator<Item = (MessageId, bool)>>(iter: I) -> Self {
        Self {
            results: iter.into_iter().collect(),
        }
    }
}

/// Acknowledgement of a delete call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeleteAck {
    /// Entries the queue reported as not deleted
    pub failed: Vec<MessageId>,
}

impl DeleteAck {
    pub fn all_deleted() -> Self {
        Self::default()
    }
}

/// Ordered group of at most [`MAX_BATCH_SIZE`] messages
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Batch(Vec<Message>);

impl Batch {
    pub fn new(messages: Vec<Message>) -> Result<Self> {
        if messages.len() > MAX_BATCH_SIZE {
            return Err(DomainError::BatchTooLarge {
                limit: MAX_BATCH_SIZE,
                actual: messages.len(),
            });
        }
        Ok(Self(messages))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Build the destination request: one entry per message, body copied verbatim
    pub fn send_entries(&self) -> Vec<SendEntry> {
        self.0
            .iter()
            .map(|m| SendEntry {
                id: m.id.clone(),
                body: m.body.clone(),
            })
            .collect()
    }

    /// Build the source delete request for the messages the destination confirmed
    pub fn delete_entries(&self, outcome: &SendOutcome) -> Vec<DeleteEntry> {
        self.0
            .iter()
            .filter(|m| outcome.is_success(&m.id))
            .map(|m| DeleteEntry {
                id: m.id.clone(),
                receipt: m.receipt.clone(),
            })
            .collect()
    }
}
