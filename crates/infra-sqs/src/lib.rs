// sqspipe Infrastructure - Amazon SQS Adapter
// Implements: QueueClient

pub mod connection;
pub mod sqs_queue;

pub use connection::{connect, ConnectionError, SqsSettings};
pub use sqs_queue::SqsQueue;
