//! Resumable streaming SOP compliance analysis
//!
//! Scores every (sop, transcript) pair of a request against an LLM, streams a
//! cumulative snapshot after each cell, and checkpoints progress so an
//! interrupted run can be resumed from the first unscored cell.
//!
//! - [`execution`] - matrix walk, result accumulation, events, resume coordination
//! - [`db`] - SQLite-backed checkpoint store
//! - [`api`] - HTTP and server-sent-events surface
//! - [`config`] - server configuration and security middleware

pub mod api;
pub mod config;
pub mod db;
pub mod execution;

pub use api::{create_router, AppState};
pub use config::ServerConfig;
pub use db::{DatabaseConnection, SqliteCheckpointStore};
pub use execution::{
    AnalysisRequest, Cursor, PipelineError, PipelineResult, ResumeCoordinator, RunOutcome,
    StreamEmitter, StreamEvent,
};

/// Crate version
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
