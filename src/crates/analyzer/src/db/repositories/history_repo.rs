//! Analysis history repository for database operations
//!
//! Every write is one statement scoped by `(id, user_id)`, so concurrent runs
//! for different records never need more than SQLite's own row atomicity.

use async_trait::async_trait;
use chrono::Utc;
use run_checkpoint::{CheckpointError, CheckpointStore, HistoryRecord, RunCheckpoint};

use crate::db::connection::{DatabaseConnection, DatabasePool};
use crate::db::error::DbResult;
use crate::db::models::history::{timestamp, HistoryRow};

/// Analysis history repository
pub struct HistoryRepository;

impl HistoryRepository {
    /// Insert a record, or update results/cursor/flag of the caller's existing one.
    ///
    /// Returns `None` when `id` exists but belongs to another user; the row is
    /// left untouched in that case.
    pub async fn upsert(pool: &DatabasePool, write: &RunCheckpoint) -> DbResult<Option<HistoryRow>> {
        let now = timestamp(Utc::now());

        let row = sqlx::query_as::<_, HistoryRow>(
            "INSERT INTO analysis_history (id, name, results, user_id, created_at, updated_at,
             is_complete, last_processed_index)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                results = excluded.results,
                last_processed_index = excluded.last_processed_index,
                is_complete = excluded.is_complete,
                updated_at = excluded.updated_at
             WHERE analysis_history.user_id = excluded.user_id
             RETURNING *",
        )
        .bind(&write.id)
        .bind(&write.name)
        .bind(&write.results)
        .bind(&write.user_id)
        .bind(&now)
        .bind(&now)
        .bind(write.is_complete)
        .bind(&write.last_processed_index)
        .fetch_optional(pool)
        .await?;

        Ok(row)
    }

    /// Get a record by ID, regardless of owner
    pub async fn get_by_id(pool: &DatabasePool, id: &str) -> DbResult<Option<HistoryRow>> {
        let row = sqlx::query_as::<_, HistoryRow>("SELECT * FROM analysis_history WHERE id = ?")
            .bind(id)
            .fetch_optional(pool)
            .await?;
        Ok(row)
    }

    /// List a user's records, newest first
    pub async fn list_by_user(pool: &DatabasePool, user_id: &str) -> DbResult<Vec<HistoryRow>> {
        let rows = sqlx::query_as::<_, HistoryRow>(
            "SELECT * FROM analysis_history WHERE user_id = ? ORDER BY created_at DESC, rowid DESC",
        )
        .bind(user_id)
        .fetch_all(pool)
        .await?;
        Ok(rows)
    }

    /// Rename a user's record
    pub async fn rename(
        pool: &DatabasePool,
        id: &str,
        user_id: &str,
        name: &str,
    ) -> DbResult<Option<HistoryRow>> {
        let row = sqlx::query_as::<_, HistoryRow>(
            "UPDATE analysis_history SET name = ?, updated_at = ?
             WHERE id = ? AND user_id = ?
             RETURNING *",
        )
        .bind(name)
        .bind(timestamp(Utc::now()))
        .bind(id)
        .bind(user_id)
        .fetch_optional(pool)
        .await?;
        Ok(row)
    }

    /// Set the completion flag of a user's record
    pub async fn set_complete(
        pool: &DatabasePool,
        id: &str,
        user_id: &str,
        is_complete: bool,
    ) -> DbResult<Option<HistoryRow>> {
        let row = sqlx::query_as::<_, HistoryRow>(
            "UPDATE analysis_history SET is_complete = ?, updated_at = ?
             WHERE id = ? AND user_id = ?
             RETURNING *",
        )
        .bind(is_complete)
        .bind(timestamp(Utc::now()))
        .bind(id)
        .bind(user_id)
        .fetch_optional(pool)
        .await?;
        Ok(row)
    }

    /// Delete a user's record; returns whether a row was removed
    pub async fn delete(pool: &DatabasePool, id: &str, user_id: &str) -> DbResult<bool> {
        let result = sqlx::query("DELETE FROM analysis_history WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(user_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

fn into_record(row: HistoryRow) -> run_checkpoint::Result<HistoryRecord> {
    Ok(HistoryRecord::try_from(row)?)
}

/// [`CheckpointStore`] backed by the `analysis_history` table
#[derive(Clone)]
pub struct SqliteCheckpointStore {
    db: DatabaseConnection,
}

impl SqliteCheckpointStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl CheckpointStore for SqliteCheckpointStore {
    async fn get(&self, id: &str) -> run_checkpoint::Result<Option<HistoryRecord>> {
        HistoryRepository::get_by_id(self.db.pool(), id)
            .await?
            .map(into_record)
            .transpose()
    }

    async fn save(&self, checkpoint: RunCheckpoint) -> run_checkpoint::Result<HistoryRecord> {
        checkpoint.validate()?;

        match HistoryRepository::upsert(self.db.pool(), &checkpoint).await? {
            Some(row) => into_record(row),
            None => Err(CheckpointError::OwnerMismatch { id: checkpoint.id }),
        }
    }

    async fn list(&self, user_id: &str) -> run_checkpoint::Result<Vec<HistoryRecord>> {
        HistoryRepository::list_by_user(self.db.pool(), user_id)
            .await?
            .into_iter()
            .map(into_record)
            .collect()
    }

    async fn rename(
        &self,
        id: &str,
        user_id: &str,
        name: &str,
    ) -> run_checkpoint::Result<Option<HistoryRecord>> {
        HistoryRepository::rename(self.db.pool(), id, user_id, name)
            .await?
            .map(into_record)
            .transpose()
    }

    async fn set_complete(
        &self,
        id: &str,
        user_id: &str,
        is_complete: bool,
    ) -> run_checkpoint::Result<Option<HistoryRecord>> {
        HistoryRepository::set_complete(self.db.pool(), id, user_id, is_complete)
            .await?
            .map(into_record)
            .transpose()
    }

    async fn delete(&self, id: &str, user_id: &str) -> run_checkpoint::Result<bool> {
        Ok(HistoryRepository::delete(self.db.pool(), id, user_id).await?)
    }
}
