//! Error types for checkpoint store operations

use thiserror::Error;

/// Result type for checkpoint store operations
pub type Result<T> = std::result::Result<T, CheckpointError>;

/// Errors that can occur while reading or writing run checkpoints
#[derive(Error, Debug)]
pub enum CheckpointError {
    /// The record exists but belongs to a different caller
    #[error("Checkpoint {id} is owned by another caller")]
    OwnerMismatch { id: String },

    /// Stored text could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Backend failure (connection, query, I/O)
    #[error("Storage error: {0}")]
    Storage(String),

    /// Record rejected before it reached the backend
    #[error("Invalid checkpoint: {0}")]
    Invalid(String),
}

impl CheckpointError {
    /// Whether the error came from the caller not owning the record
    pub fn is_owner_mismatch(&self) -> bool {
        matches!(self, CheckpointError::OwnerMismatch { .. })
    }

    /// Whether a repeat of the same write could succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, CheckpointError::Storage(_))
    }
}
