//! Shared async helpers for the sop-analyzer workspace.
//!
//! # Modules
//!
//! - `async_utils` - Retry policies with exponential backoff
//! - `logging` - Timing helpers built on tracing

pub mod async_utils;
pub mod logging;

pub use async_utils::retry::{with_retry, with_retry_if, RetryPolicy};
pub use logging::{format_duration, timed};
