//! Database connection management
//!
//! Provides database connection pooling, migrations and health checks.

use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use std::sync::Arc;

/// Type alias for the database connection pool
pub type DatabasePool = SqlitePool;

/// Database connection wrapper
#[derive(Clone)]
pub struct DatabaseConnection {
    pool: Arc<DatabasePool>,
}

impl DatabaseConnection {
    /// Create a new database connection from a connection string
    ///
    /// # Arguments
    /// * `database_url` - SQLite connection string (e.g., "sqlite://analysis.db?mode=rwc")
    pub async fn new(database_url: &str) -> Result<Self, sqlx::Error> {
        Self::with_max_connections(database_url, 5).await
    }

    /// Create a new database connection with custom pool size
    ///
    /// An in-memory database lives per connection, so `sqlite::memory:`
    /// needs `max_connections = 1` to behave like one database.
    pub async fn with_max_connections(
        database_url: &str,
        max_connections: u32,
    ) -> Result<Self, sqlx::Error> {
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;

        Ok(Self {
            pool: Arc::new(pool),
        })
    }

    /// Single-connection in-memory database with migrations applied
    pub async fn in_memory() -> Result<Self, sqlx::Error> {
        let db = Self::with_max_connections("sqlite::memory:", 1).await?;
        db.run_migrations().await?;
        Ok(db)
    }

    /// Get a reference to the connection pool
    pub fn pool(&self) -> &DatabasePool {
        &self.pool
    }

    /// Run migrations on the database
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(self.pool.as_ref()).await
    }

    /// Perform a health check by running a simple query
    pub async fn health_check(&self) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT 1").fetch_one(self.pool.as_ref()).await?;
        Ok(())
    }

    /// Close the connection pool gracefully
    pub async fn close(self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_health_check_success() {
        let conn = DatabaseConnection::new("sqlite::memory:").await.unwrap();
        assert!(conn.health_check().await.is_ok());
    }

    #[tokio::test]
    async fn test_in_memory_has_schema() {
        let conn = DatabaseConnection::in_memory().await.unwrap();
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM analysis_history")
            .fetch_one(conn.pool())
            .await
            .unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn test_closed_pool_fails_health_check() {
        let conn = DatabaseConnection::new("sqlite::memory:").await.unwrap();
        let probe = conn.clone();
        conn.close().await;
        assert!(probe.health_check().await.is_err());
    }
}
