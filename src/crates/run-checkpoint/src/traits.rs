//! Storage trait for checkpoint backends
//!
//! [`CheckpointStore`] is the seam between the analysis pipeline and whatever
//! keeps history records durable. The pipeline only needs per-record atomic
//! writes scoped by `(id, user_id)`; no cross-record locking is assumed.
//!
//! ```text
//!  Resume Coordinator ──save()──▶ CheckpointStore ──▶ SQLite / memory / ...
//!                     ◀──get()───
//! ```
//!
//! Implementations must make [`CheckpointStore::save`] a single atomic upsert:
//! a concurrent reader sees either the previous record or the new one.

use async_trait::async_trait;

use crate::error::Result;
use crate::record::{HistoryRecord, RunCheckpoint};

/// Durable key-value store for analysis-run documents
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// Fetch a record by id regardless of owner
    ///
    /// Callers are expected to check [`HistoryRecord::is_owned_by`] before
    /// using the contents.
    async fn get(&self, id: &str) -> Result<Option<HistoryRecord>>;

    /// Create or update a record
    ///
    /// Fails with [`CheckpointError::OwnerMismatch`](crate::CheckpointError::OwnerMismatch)
    /// when the id exists under another user.
    async fn save(&self, checkpoint: RunCheckpoint) -> Result<HistoryRecord>;

    /// All records owned by `user_id`, newest first
    async fn list(&self, user_id: &str) -> Result<Vec<HistoryRecord>>;

    /// Rename a record; `None` when no record matches `(id, user_id)`
    async fn rename(&self, id: &str, user_id: &str, name: &str) -> Result<Option<HistoryRecord>>;

    /// Flip the completion flag; `None` when no record matches `(id, user_id)`
    async fn set_complete(
        &self,
        id: &str,
        user_id: &str,
        is_complete: bool,
    ) -> Result<Option<HistoryRecord>>;

    /// Delete a record; returns whether anything was removed
    async fn delete(&self, id: &str, user_id: &str) -> Result<bool>;
}
