//! History record types persisted by checkpoint stores
//!
//! A [`HistoryRecord`] is the durable form of one analysis run. Its `results`
//! and `last_processed_index` fields are opaque serialized text: the store
//! never interprets them, the pipeline encodes and decodes them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CheckpointError, Result};

/// Durable snapshot of an analysis run, as stored and returned by a backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    /// Record identifier (UUID string)
    pub id: String,

    /// Human-readable name
    pub name: String,

    /// Serialized run accumulator
    pub results: String,

    /// Owning caller identity
    pub user_id: String,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last write timestamp
    pub updated_at: DateTime<Utc>,

    /// True once every cell of the matrix has been scored and persisted
    pub is_complete: bool,

    /// Serialized cursor of the last completed cell, if any
    pub last_processed_index: Option<String>,
}

impl HistoryRecord {
    /// Check whether `caller` owns this record
    pub fn is_owned_by(&self, caller: &str) -> bool {
        self.user_id == caller
    }
}

/// One write to the checkpoint store
///
/// Stores apply it as an upsert scoped by `(id, user_id)`: the first write for
/// an id creates the record with `name`, later writes replace `results`,
/// `last_processed_index` and `is_complete` and leave the name alone.
#[derive(Debug, Clone, PartialEq)]
pub struct RunCheckpoint {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub results: String,
    pub last_processed_index: Option<String>,
    pub is_complete: bool,
}

impl RunCheckpoint {
    /// Create a checkpoint write for an existing or new record
    pub fn new(
        id: impl Into<String>,
        user_id: impl Into<String>,
        name: impl Into<String>,
        results: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            user_id: user_id.into(),
            name: name.into(),
            results: results.into(),
            last_processed_index: None,
            is_complete: false,
        }
    }

    /// Set the serialized cursor of the last completed cell
    pub fn with_last_processed_index(mut self, cursor: Option<String>) -> Self {
        self.last_processed_index = cursor;
        self
    }

    /// Set the completion flag
    pub fn with_complete(mut self, is_complete: bool) -> Self {
        self.is_complete = is_complete;
        self
    }

    /// Reject writes a backend must never accept
    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(CheckpointError::Invalid("id is required".to_string()));
        }
        if self.user_id.trim().is_empty() {
            return Err(CheckpointError::Invalid("user_id is required".to_string()));
        }
        Ok(())
    }

    /// Materialize the record this write creates when no record exists yet
    pub fn into_new_record(self, now: DateTime<Utc>) -> HistoryRecord {
        HistoryRecord {
            id: self.id,
            name: self.name,
            results: self.results,
            user_id: self.user_id,
            created_at: now,
            updated_at: now,
            is_complete: self.is_complete,
            last_processed_index: self.last_processed_index,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_rejects_blank_owner() {
        let write = RunCheckpoint::new("abc", "  ", "run", "[]");
        assert!(matches!(write.validate(), Err(CheckpointError::Invalid(_))));
    }

    #[test]
    fn test_into_new_record_sets_both_timestamps() {
        let now = Utc::now();
        let record = RunCheckpoint::new("abc", "user-1", "run", "[]")
            .with_last_processed_index(Some("{\"sopIndex\":0,\"transcriptIndex\":0}".to_string()))
            .with_complete(true)
            .into_new_record(now);

        assert_eq!(record.created_at, now);
        assert_eq!(record.updated_at, now);
        assert!(record.is_complete);
        assert!(record.is_owned_by("user-1"));
        assert!(!record.is_owned_by("user-2"));
    }
}
