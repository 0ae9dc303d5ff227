//! Database module for the analyzer
//!
//! SQLite connectivity, the analysis history model and repository, and the
//! [`SqliteCheckpointStore`] backend for the pipeline.

pub mod connection;
pub mod error;
pub mod models;
pub mod repositories;

pub use connection::{DatabaseConnection, DatabasePool};
pub use error::{DatabaseError, DbResult};
pub use repositories::{HistoryRepository, SqliteCheckpointStore};
