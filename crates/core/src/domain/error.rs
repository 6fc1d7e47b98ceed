// Domain Error Types

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Batch too large: {actual} messages (limit {limit})")]
    BatchTooLarge { limit: usize, actual: usize },
}

pub type Result<T> = std::result::Result<T, DomainError>;
