// Domain Layer - Pure relay entities

pub mod error;
pub mod message;

// Re-exports
pub use error::DomainError;
pub use message::{
    Batch, DeleteAck, DeleteEntry, Message, MessageId, ReceiptToken, SendEntry, SendOutcome,
    MAX_BATCH_SIZE,
};
