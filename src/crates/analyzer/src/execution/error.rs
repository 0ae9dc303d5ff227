//! Pipeline error taxonomy

use llm::LlmError;
use run_checkpoint::CheckpointError;
use thiserror::Error;

use super::cursor::Cursor;

/// Result type for pipeline operations
pub type PipelineResult<T> = std::result::Result<T, PipelineError>;

/// Errors raised by the analysis pipeline
///
/// Input, cursor, authorization and lookup errors are raised before any
/// scoring call is made. Scoring and terminal checkpoint failures during a
/// streaming attempt are reported in-stream rather than through this type.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Empty sops/transcripts or missing caller identity
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Start cursor out of bounds, or not covered by the seed results
    #[error("Invalid cursor: {0}")]
    InvalidCursor(String),

    /// The scoring call failed for one cell
    #[error("Error analyzing transcript {} for SOP {}: {source}", .cursor.transcript_index + 1, .cursor.sop_index + 1)]
    ScoringFailure {
        cursor: Cursor,
        #[source]
        source: LlmError,
    },

    /// A checkpoint write that must not be lost could not be persisted
    #[error("Checkpoint write failed: {0}")]
    CheckpointWriteFailure(#[source] CheckpointError),

    /// Reading a checkpoint record failed
    #[error("Checkpoint read failed: {0}")]
    CheckpointReadFailure(#[source] CheckpointError),

    /// The history record belongs to another caller
    #[error("History record {0} does not belong to the caller")]
    AuthorizationFailure(String),

    /// No history record with the given id
    #[error("History record not found: {0}")]
    NotFound(String),

    /// Stored results or cursor could not be parsed
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl PipelineError {
    /// Whether the error is the caller's fault (4xx)
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            PipelineError::InvalidInput(_)
                | PipelineError::InvalidCursor(_)
                | PipelineError::AuthorizationFailure(_)
                | PipelineError::NotFound(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scoring_failure_message_is_one_based() {
        let err = PipelineError::ScoringFailure {
            cursor: Cursor::new(0, 1),
            source: LlmError::RateLimitExceeded("slow down".to_string()),
        };
        let msg = err.to_string();
        assert!(msg.starts_with("Error analyzing transcript 2 for SOP 1:"));
        assert!(msg.contains("slow down"));
    }

    #[test]
    fn test_client_error_classification() {
        assert!(PipelineError::InvalidInput("x".into()).is_client_error());
        assert!(PipelineError::AuthorizationFailure("x".into()).is_client_error());
        assert!(!PipelineError::CheckpointWriteFailure(CheckpointError::Storage("down".into()))
            .is_client_error());
    }
}
