//! Async utilities for common async patterns.
//!
//! # Example
//!
//! ```rust,ignore
//! use tooling::async_utils::retry::{RetryPolicy, with_retry};
//! use std::time::Duration;
//!
//! async fn save_with_retry(store: &Store) -> Result<(), StoreError> {
//!     let policy = RetryPolicy::new(3).with_initial_interval(Duration::from_millis(250));
//!
//!     with_retry(&policy, "checkpoint", || async { store.save().await }).await
//! }
//! ```

pub mod retry;
