//! In-memory checkpoint storage for development and testing
//!
//! [`InMemoryCheckpointStore`] keeps every record in an
//! `Arc<RwLock<HashMap>>`. Each operation takes the lock once, which gives the
//! same per-record atomicity a database backend provides with a single
//! statement. Data is lost on restart.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::error::{CheckpointError, Result};
use crate::record::{HistoryRecord, RunCheckpoint};
use crate::traits::CheckpointStore;

type RecordStorage = Arc<RwLock<HashMap<String, HistoryRecord>>>;

/// Thread-safe in-memory checkpoint store
#[derive(Debug, Clone, Default)]
pub struct InMemoryCheckpointStore {
    storage: RecordStorage,
    writes: Arc<AtomicUsize>,
}

impl InMemoryCheckpointStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records held
    pub async fn record_count(&self) -> usize {
        self.storage.read().await.len()
    }

    /// Number of successful `save` calls since creation
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Drop every record (useful for testing)
    pub async fn clear(&self) {
        self.storage.write().await.clear();
    }
}

#[async_trait]
impl CheckpointStore for InMemoryCheckpointStore {
    async fn get(&self, id: &str) -> Result<Option<HistoryRecord>> {
        Ok(self.storage.read().await.get(id).cloned())
    }

    async fn save(&self, checkpoint: RunCheckpoint) -> Result<HistoryRecord> {
        checkpoint.validate()?;

        let mut storage = self.storage.write().await;
        let now = Utc::now();

        let saved = match storage.get_mut(&checkpoint.id) {
            Some(existing) => {
                if !existing.is_owned_by(&checkpoint.user_id) {
                    return Err(CheckpointError::OwnerMismatch { id: checkpoint.id });
                }
                existing.results = checkpoint.results;
                existing.last_processed_index = checkpoint.last_processed_index;
                existing.is_complete = checkpoint.is_complete;
                existing.updated_at = now;
                existing.clone()
            }
            None => {
                let record = checkpoint.into_new_record(now);
                storage.insert(record.id.clone(), record.clone());
                record
            }
        };

        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(saved)
    }

    async fn list(&self, user_id: &str) -> Result<Vec<HistoryRecord>> {
        let storage = self.storage.read().await;
        let mut records: Vec<HistoryRecord> = storage
            .values()
            .filter(|r| r.is_owned_by(user_id))
            .cloned()
            .collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records)
    }

    async fn rename(&self, id: &str, user_id: &str, name: &str) -> Result<Option<HistoryRecord>> {
        let mut storage = self.storage.write().await;
        Ok(storage
            .get_mut(id)
            .filter(|r| r.is_owned_by(user_id))
            .map(|r| {
                r.name = name.to_string();
                r.updated_at = Utc::now();
                r.clone()
            }))
    }

    async fn set_complete(
        &self,
        id: &str,
        user_id: &str,
        is_complete: bool,
    ) -> Result<Option<HistoryRecord>> {
        let mut storage = self.storage.write().await;
        Ok(storage
            .get_mut(id)
            .filter(|r| r.is_owned_by(user_id))
            .map(|r| {
                r.is_complete = is_complete;
                r.updated_at = Utc::now();
                r.clone()
            }))
    }

    async fn delete(&self, id: &str, user_id: &str) -> Result<bool> {
        let mut storage = self.storage.write().await;
        match storage.get(id) {
            Some(record) if record.is_owned_by(user_id) => {
                storage.remove(id);
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}
