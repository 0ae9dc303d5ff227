//! Resumable streaming analysis pipeline
//!
//! - [`cursor`] - row-major walk over the sop x transcript matrix
//! - [`accumulator`] - per-sop result buckets, merged by position
//! - [`events`] - cumulative snapshot events and the emitter channel
//! - [`coordinator`] - validation, seeding, scoring and checkpointing

pub mod accumulator;
pub mod coordinator;
pub mod cursor;
pub mod error;
pub mod events;

pub use accumulator::{CellResult, RunAccumulator, SopBucket};
pub use coordinator::{default_run_name, AnalysisRequest, PreparedRun, ResumeCoordinator, RunOutcome};
pub use cursor::{Cursor, MatrixWalker};
pub use error::{PipelineError, PipelineResult};
pub use events::{
    CompletedEvent, FailureEvent, FailureReason, ProgressEvent, StreamEmitter, StreamEvent,
};
