//! Database error types and handling

use run_checkpoint::CheckpointError;
use thiserror::Error;

/// Custom database error type
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Connection error
    #[error("Database connection failed: {0}")]
    ConnectionError(String),

    /// Record not found
    #[error("Record not found: {0}")]
    NotFound(String),

    /// Constraint violation (unique, foreign key, etc.)
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    /// Data type mismatch or conversion error
    #[error("Data type error: {0}")]
    TypeError(String),

    /// Migration error
    #[error("Migration failed: {0}")]
    MigrationError(String),

    /// Connection pool error
    #[error("Connection pool error: {0}")]
    PoolError(String),

    /// Generic database error
    #[error("Database error: {0}")]
    Other(String),
}

impl DatabaseError {
    pub fn not_found(context: impl Into<String>) -> Self {
        DatabaseError::NotFound(context.into())
    }

    pub fn type_error(msg: impl Into<String>) -> Self {
        DatabaseError::TypeError(msg.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, DatabaseError::NotFound(_))
    }

    pub fn is_constraint_violation(&self) -> bool {
        matches!(self, DatabaseError::ConstraintViolation(_))
    }
}

/// Result type for database operations
pub type DbResult<T> = std::result::Result<T, DatabaseError>;

impl From<sqlx::Error> for DatabaseError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => {
                DatabaseError::NotFound("No matching row found in database".to_string())
            }
            sqlx::Error::ColumnNotFound(col) => {
                DatabaseError::TypeError(format!("Column not found: {}", col))
            }
            sqlx::Error::ColumnDecode { index, source } => {
                DatabaseError::TypeError(format!("Error decoding column {}: {}", index, source))
            }
            sqlx::Error::Decode(source) => DatabaseError::TypeError(format!("Decode error: {}", source)),
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                DatabaseError::ConstraintViolation(db_err.to_string())
            }
            sqlx::Error::Configuration(msg) => {
                DatabaseError::ConnectionError(format!("Configuration error: {}", msg))
            }
            sqlx::Error::Io(err) => DatabaseError::ConnectionError(format!("IO error: {}", err)),
            sqlx::Error::PoolTimedOut => {
                DatabaseError::PoolError("Connection pool timed out".to_string())
            }
            sqlx::Error::PoolClosed => {
                DatabaseError::PoolError("Connection pool is closed".to_string())
            }
            sqlx::Error::Migrate(err) => DatabaseError::MigrationError(err.to_string()),
            err => DatabaseError::Other(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DatabaseError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DatabaseError::MigrationError(err.to_string())
    }
}

impl From<DatabaseError> for CheckpointError {
    fn from(err: DatabaseError) -> Self {
        CheckpointError::Storage(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sqlx_row_not_found_conversion() {
        let db_err: DatabaseError = sqlx::Error::RowNotFound.into();
        assert!(db_err.is_not_found());
        assert!(!db_err.is_constraint_violation());
    }

    #[test]
    fn test_pool_closed_conversion() {
        let db_err: DatabaseError = sqlx::Error::PoolClosed.into();
        assert!(matches!(db_err, DatabaseError::PoolError(_)));
    }

    #[test]
    fn test_checkpoint_conversion_is_storage() {
        let err: CheckpointError = DatabaseError::type_error("bad timestamp").into();
        assert!(matches!(err, CheckpointError::Storage(msg) if msg.contains("bad timestamp")));
    }
}
