//! Analysis history model for database persistence

use chrono::{DateTime, SecondsFormat, Utc};
use run_checkpoint::HistoryRecord;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::db::error::{DatabaseError, DbResult};

/// One row of `analysis_history`
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct HistoryRow {
    /// Record identifier (UUID string)
    pub id: String,

    pub name: String,

    /// Serialized run accumulator (JSON array)
    pub results: String,

    /// Owning caller identity
    pub user_id: String,

    /// Creation timestamp (RFC 3339, microseconds, UTC)
    pub created_at: String,

    /// Last write timestamp (RFC 3339, microseconds, UTC)
    pub updated_at: String,

    pub is_complete: bool,

    /// Serialized cursor of the last completed cell
    pub last_processed_index: Option<String>,
}

/// Fixed-width timestamp text, so lexical order matches time order
pub fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(field: &str, value: &str) -> DbResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| DatabaseError::type_error(format!("{} '{}': {}", field, value, e)))
}

impl TryFrom<HistoryRow> for HistoryRecord {
    type Error = DatabaseError;

    fn try_from(row: HistoryRow) -> DbResult<Self> {
        Ok(HistoryRecord {
            created_at: parse_timestamp("created_at", &row.created_at)?,
            updated_at: parse_timestamp("updated_at", &row.updated_at)?,
            id: row.id,
            name: row.name,
            results: row.results,
            user_id: row.user_id,
            is_complete: row.is_complete,
            last_processed_index: row.last_processed_index,
        })
    }
}
