//! # run-checkpoint - Durable state for resumable analysis runs
//!
//! Trait-based checkpoint abstractions for persisting and restoring the state
//! of a long-running SOP x transcript analysis. A run that crashes, loses its
//! connection, or hits an upstream failure can be resumed from its last
//! checkpoint without re-scoring completed cells.
//!
//! ## Core types
//!
//! - [`CheckpointStore`] - backend contract (get, save, list, rename, status, delete)
//! - [`HistoryRecord`] - the stored document for one run
//! - [`RunCheckpoint`] - one upsert write scoped by `(id, user_id)`
//! - [`InMemoryCheckpointStore`] - reference backend for development and tests
//! - [`TextCodec`] / [`JsonCodec`] - how structured payloads become stored text
//!
//! ## Quick start
//!
//! ```rust
//! use run_checkpoint::{CheckpointStore, InMemoryCheckpointStore, RunCheckpoint};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = InMemoryCheckpointStore::new();
//!
//!     let write = RunCheckpoint::new("run-1", "caller-1", "Analysis", "[]")
//!         .with_complete(false);
//!     store.save(write).await?;
//!
//!     let record = store.get("run-1").await?.expect("just saved");
//!     assert!(record.is_owned_by("caller-1"));
//!     Ok(())
//! }
//! ```
//!
//! Production deployments implement [`CheckpointStore`] over a database; the
//! `sop-analyzer` crate ships a SQLite backend.

pub mod error;
pub mod memory;
pub mod record;
pub mod serializer;
pub mod traits;

pub use error::{CheckpointError, Result};
pub use memory::InMemoryCheckpointStore;
pub use record::{HistoryRecord, RunCheckpoint};
pub use serializer::{JsonCodec, TextCodec};
pub use traits::CheckpointStore;
