// Port Layer - Interfaces for external dependencies

pub mod queue_client;

// Re-exports
pub use queue_client::{QueueClient, QueueError};
