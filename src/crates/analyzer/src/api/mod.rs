//! HTTP API for the analysis service
//!
//! - `POST /analyze` and `POST /analyze/stream` run the pipeline
//! - `/analyze/history` manages persisted runs
//! - `GET /health` reports liveness and database connectivity

pub mod caller;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;

pub use caller::{CallerIdentity, CALLER_HEADER};
pub use error::{ApiError, ApiErrorResponse, ApiResult};
pub use routes::{create_router, AppState};
