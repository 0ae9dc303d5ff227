//! Resume coordinator
//!
//! Drives one attempt of an analysis run: validates the request, seeds the
//! accumulator from a previous checkpoint, walks the remaining cells through
//! the scorer one at a time, and checkpoints progress to the store.
//!
//! Cells are scored strictly sequentially. The accumulator and its checkpoint
//! have a single writer, and positional overwrite on resume relies on each
//! bucket being filled in transcript order.

use chrono::Utc;
use llm::Scorer;
use run_checkpoint::{
    CheckpointError, CheckpointStore, HistoryRecord, JsonCodec, RunCheckpoint, TextCodec,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tooling::{timed, with_retry_if, RetryPolicy};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::accumulator::{CellResult, RunAccumulator};
use super::cursor::{Cursor, MatrixWalker};
use super::error::{PipelineError, PipelineResult};
use super::events::{FailureReason, StreamEmitter, StreamEvent};
use crate::config::PipelineConfig;

/// Start or resume request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRequest {
    #[serde(default)]
    pub transcripts: Vec<String>,
    #[serde(default)]
    pub sops: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_from: Option<Cursor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub history_id: Option<String>,
}

impl AnalysisRequest {
    pub fn new(sops: Vec<String>, transcripts: Vec<String>) -> Self {
        Self {
            transcripts,
            sops,
            start_from: None,
            history_id: None,
        }
    }

    pub fn with_start_from(mut self, cursor: Cursor) -> Self {
        self.start_from = Some(cursor);
        self
    }

    pub fn with_history_id(mut self, history_id: impl Into<String>) -> Self {
        self.history_id = Some(history_id.into());
        self
    }
}

/// How an attempt ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every cell scored and the final checkpoint persisted
    Completed { history_id: String },
    /// Stopped on a scoring failure or an unrecoverable terminal write
    Failed {
        history_id: Option<String>,
        last_processed_index: Option<Cursor>,
        reason: FailureReason,
    },
    /// The stream consumer went away; the last periodic checkpoint stands
    Aborted {
        history_id: Option<String>,
        last_processed_index: Option<Cursor>,
    },
}

impl RunOutcome {
    pub fn history_id(&self) -> Option<&str> {
        match self {
            RunOutcome::Completed { history_id } => Some(history_id),
            RunOutcome::Failed { history_id, .. } | RunOutcome::Aborted { history_id, .. } => {
                history_id.as_deref()
            }
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, RunOutcome::Completed { .. })
    }
}

/// A validated request, ready to execute
///
/// Produced only by [`ResumeCoordinator::prepare`], so every error a client
/// can cause has already been reported by the time one exists.
#[derive(Debug)]
pub struct PreparedRun {
    caller_id: String,
    sops: Vec<String>,
    transcripts: Vec<String>,
    start: Cursor,
    accumulator: RunAccumulator,
    history_id: Option<String>,
    stored_index: Option<Cursor>,
    walker: Option<MatrixWalker>,
}

impl PreparedRun {
    pub fn start(&self) -> Cursor {
        self.start
    }

    pub fn history_id(&self) -> Option<&str> {
        self.history_id.as_deref()
    }

    pub fn seed(&self) -> &RunAccumulator {
        &self.accumulator
    }

    /// Every cell was already scored by a previous attempt
    pub fn is_already_complete(&self) -> bool {
        self.walker.is_none()
    }
}

/// Per-attempt checkpoint bookkeeping
struct RunState {
    caller_id: String,
    name: String,
    history_id: Option<String>,
    record_exists: bool,
    persisted_index: Option<Cursor>,
}

impl RunState {
    /// Id of the record, once a write has actually landed
    fn durable_id(&self) -> Option<String> {
        if self.record_exists {
            self.history_id.clone()
        } else {
            None
        }
    }
}

/// Name given to records created without an explicit one
pub fn default_run_name() -> String {
    format!("Analysis {}", Utc::now().format("%Y-%m-%d %H:%M:%S"))
}

/// Orchestrates scoring, accumulation, streaming and checkpointing
#[derive(Clone)]
pub struct ResumeCoordinator {
    scorer: Arc<dyn Scorer>,
    store: Arc<dyn CheckpointStore>,
    config: PipelineConfig,
}

impl ResumeCoordinator {
    pub fn new(
        scorer: Arc<dyn Scorer>,
        store: Arc<dyn CheckpointStore>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            scorer,
            store,
            config,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn CheckpointStore> {
        &self.store
    }

    /// Prepare and execute in one call.
    pub async fn run(
        &self,
        request: AnalysisRequest,
        caller_id: &str,
        emitter: &StreamEmitter,
    ) -> PipelineResult<RunOutcome> {
        let prepared = self.prepare(request, caller_id).await?;
        Ok(self.execute(prepared, emitter).await)
    }

    /// Validate a request and load its seed, without scoring anything.
    ///
    /// Checks run in this order: caller and input, start cursor bounds,
    /// record existence and ownership, stored payload, seed coverage.
    pub async fn prepare(
        &self,
        request: AnalysisRequest,
        caller_id: &str,
    ) -> PipelineResult<PreparedRun> {
        let caller_id = caller_id.trim();
        if caller_id.is_empty() {
            return Err(PipelineError::InvalidInput(
                "caller identity is required".to_string(),
            ));
        }

        let AnalysisRequest {
            transcripts,
            sops,
            start_from,
            history_id,
        } = request;

        if sops.is_empty() || transcripts.is_empty() {
            return Err(PipelineError::InvalidInput(
                "At least one transcript and one SOP are required.".to_string(),
            ));
        }

        let (sop_count, transcript_count) = (sops.len(), transcripts.len());
        if let Some(start) = start_from {
            start.validate(sop_count, transcript_count)?;
        }

        let history_id = history_id
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty());

        let (accumulator, stored_index, start) = match history_id.as_deref() {
            Some(id) => {
                let record = self.load_owned(id, caller_id).await?;
                let stored_index: Option<Cursor> = JsonCodec
                    .decode_opt(record.last_processed_index.as_deref())
                    .map_err(|e| PipelineError::Serialization(format!("stored cursor: {}", e)))?;
                let accumulator = RunAccumulator::from_stored(&record.results)?;

                let start = match start_from {
                    Some(start) => start,
                    None => {
                        if let Some(last) = stored_index {
                            last.validate(sop_count, transcript_count)?;
                        }
                        Cursor::resume_after(stored_index, transcript_count)
                    }
                };
                (accumulator, stored_index, start)
            }
            None => (RunAccumulator::new(), None, start_from.unwrap_or_default()),
        };

        let walker = if start.is_past_end(sop_count) {
            if !accumulator.is_complete(sop_count, transcript_count) {
                return Err(PipelineError::InvalidCursor(
                    "record marks every cell processed but its results are incomplete".to_string(),
                ));
            }
            accumulator.validate_seed(start, &sops, &transcripts)?;
            None
        } else {
            accumulator.validate_seed(start, &sops, &transcripts)?;
            Some(MatrixWalker::new(sop_count, transcript_count, Some(start))?)
        };

        Ok(PreparedRun {
            caller_id: caller_id.to_string(),
            sops,
            transcripts,
            start,
            accumulator,
            history_id,
            stored_index,
            walker,
        })
    }

    async fn load_owned(&self, id: &str, caller_id: &str) -> PipelineResult<HistoryRecord> {
        let record = self
            .store
            .get(id)
            .await
            .map_err(PipelineError::CheckpointReadFailure)?
            .ok_or_else(|| PipelineError::NotFound(id.to_string()))?;

        if !record.is_owned_by(caller_id) {
            warn!(history_id = %id, "Resume rejected, record belongs to another caller");
            return Err(PipelineError::AuthorizationFailure(id.to_string()));
        }
        Ok(record)
    }

    /// Run a prepared attempt to one of its terminal states.
    ///
    /// Every outcome is also reported to `emitter`, except `Aborted`, which
    /// only happens once nobody is listening.
    pub async fn execute(&self, run: PreparedRun, emitter: &StreamEmitter) -> RunOutcome {
        let PreparedRun {
            caller_id,
            sops,
            transcripts,
            start,
            mut accumulator,
            history_id,
            stored_index,
            walker,
        } = run;

        let transcript_count = transcripts.len();
        let mut state = RunState {
            caller_id,
            name: default_run_name(),
            record_exists: history_id.is_some(),
            history_id,
            persisted_index: stored_index,
        };
        let mut last_completed = start.previous(transcript_count);

        let Some(walker) = walker else {
            info!(history_id = ?state.history_id, "Run already complete, nothing to score");
            return self.finish(&mut state, &accumulator, last_completed, emitter).await;
        };

        info!(
            start = %start,
            cells = walker.len(),
            history_id = ?state.history_id,
            model = self.scorer.model(),
            "Starting analysis attempt"
        );

        for cursor in walker {
            if emitter.is_closed() {
                info!(at = %cursor, history_id = ?state.durable_id(), "Client disconnected, stopping attempt");
                return RunOutcome::Aborted {
                    history_id: state.durable_id(),
                    last_processed_index: last_completed,
                };
            }

            let sop = &sops[cursor.sop_index];
            let transcript = &transcripts[cursor.transcript_index];

            debug!(cell = %cursor, "Scoring cell");
            let score = match timed("score cell", self.scorer.score(sop, transcript)).await {
                Ok(score) => score,
                Err(source) => {
                    let failure = PipelineError::ScoringFailure { cursor, source };
                    return self
                        .fail_on_scoring(&mut state, &accumulator, last_completed, failure, emitter)
                        .await;
                }
            };

            accumulator.merge(
                &sops,
                cursor,
                CellResult::new(transcript.clone(), score.text, score.tokens),
            );
            last_completed = Some(cursor);

            let is_last = cursor.is_last(sops.len(), transcript_count);
            if !is_last && self.config.is_checkpoint_position(cursor.position(transcript_count)) {
                if let Err(e) = self
                    .persist(&mut state, &accumulator, last_completed, false, &RetryPolicy::no_retry())
                    .await
                {
                    warn!(cell = %cursor, error = %e, "Periodic checkpoint failed, continuing");
                }
            }

            emitter
                .emit(StreamEvent::progress(
                    accumulator.snapshot(),
                    cursor,
                    state.durable_id(),
                ))
                .await;
        }

        self.finish(&mut state, &accumulator, last_completed, emitter).await
    }

    /// Terminal write for a fully scored matrix, then the completion event.
    async fn finish(
        &self,
        state: &mut RunState,
        accumulator: &RunAccumulator,
        last_completed: Option<Cursor>,
        emitter: &StreamEmitter,
    ) -> RunOutcome {
        let policy = self.config.terminal_retry_policy();
        match self
            .persist(state, accumulator, last_completed, true, &policy)
            .await
        {
            Ok(record) => {
                info!(
                    history_id = %record.id,
                    cells = accumulator.cell_count(),
                    tokens = accumulator.total_tokens(),
                    "Analysis run completed"
                );
                emitter
                    .emit(StreamEvent::completed(accumulator.snapshot(), Some(record.id.clone())))
                    .await;
                RunOutcome::Completed {
                    history_id: record.id,
                }
            }
            Err(e) => {
                error!(error = %e, history_id = ?state.durable_id(), "Final checkpoint could not be saved");
                self.fail(
                    state,
                    accumulator,
                    format!("Failed to save final results: {}", e),
                    emitter,
                )
                .await
            }
        }
    }

    /// Checkpoint partial results after a scoring failure, then report it.
    async fn fail_on_scoring(
        &self,
        state: &mut RunState,
        accumulator: &RunAccumulator,
        last_completed: Option<Cursor>,
        failure: PipelineError,
        emitter: &StreamEmitter,
    ) -> RunOutcome {
        let message = failure.to_string();
        warn!(error = %message, "Scoring failed, checkpointing partial results");

        let policy = self.config.terminal_retry_policy();
        match self
            .persist(state, accumulator, last_completed, false, &policy)
            .await
        {
            Ok(record) => {
                emitter
                    .emit(StreamEvent::failed(
                        message,
                        accumulator.snapshot(),
                        last_completed,
                        Some(record.id.clone()),
                        FailureReason::Scoring,
                    ))
                    .await;
                RunOutcome::Failed {
                    history_id: Some(record.id),
                    last_processed_index: last_completed,
                    reason: FailureReason::Scoring,
                }
            }
            Err(e) => {
                error!(error = %e, history_id = ?state.durable_id(), "Checkpoint after scoring failure could not be saved");
                self.fail(
                    state,
                    accumulator,
                    format!("{}; additionally failed to save progress: {}", message, e),
                    emitter,
                )
                .await
            }
        }
    }

    /// Report a terminal checkpoint failure with the last durable state.
    async fn fail(
        &self,
        state: &RunState,
        accumulator: &RunAccumulator,
        message: String,
        emitter: &StreamEmitter,
    ) -> RunOutcome {
        let history_id = state.durable_id();
        emitter
            .emit(StreamEvent::failed(
                message,
                accumulator.snapshot(),
                state.persisted_index,
                history_id.clone(),
                FailureReason::Checkpoint,
            ))
            .await;
        RunOutcome::Failed {
            history_id,
            last_processed_index: state.persisted_index,
            reason: FailureReason::Checkpoint,
        }
    }

    /// Upsert the current state, minting the record id on first use.
    async fn persist(
        &self,
        state: &mut RunState,
        accumulator: &RunAccumulator,
        last_completed: Option<Cursor>,
        is_complete: bool,
        policy: &RetryPolicy,
    ) -> PipelineResult<HistoryRecord> {
        let results = accumulator.to_stored()?;
        let index = last_completed
            .map(|cursor| JsonCodec.encode(&cursor))
            .transpose()
            .map_err(PipelineError::CheckpointWriteFailure)?;

        let id = state
            .history_id
            .get_or_insert_with(|| Uuid::new_v4().to_string())
            .clone();

        let write = RunCheckpoint::new(id, state.caller_id.clone(), state.name.clone(), results)
            .with_last_processed_index(index)
            .with_complete(is_complete);

        let store = &self.store;
        let record = with_retry_if(
            policy,
            "checkpoint write",
            CheckpointError::is_retryable,
            || store.save(write.clone()),
        )
        .await
        .map_err(PipelineError::CheckpointWriteFailure)?;

        if !state.record_exists {
            info!(history_id = %record.id, "Created history record");
        }
        state.record_exists = true;
        state.persisted_index = last_completed;
        debug!(history_id = %record.id, complete = is_complete, "Checkpoint saved");
        Ok(record)
    }

    /// Score the whole matrix without checkpointing or streaming.
    ///
    /// The first scoring failure aborts the call.
    pub async fn analyze_blocking(
        &self,
        sops: &[String],
        transcripts: &[String],
    ) -> PipelineResult<RunAccumulator> {
        if sops.is_empty() || transcripts.is_empty() {
            return Err(PipelineError::InvalidInput(
                "At least one transcript and one SOP are required.".to_string(),
            ));
        }

        let mut accumulator = RunAccumulator::new();
        for cursor in MatrixWalker::new(sops.len(), transcripts.len(), None)? {
            let transcript = &transcripts[cursor.transcript_index];
            let score = timed("score cell", self.scorer.score(&sops[cursor.sop_index], transcript))
                .await
                .map_err(|source| PipelineError::ScoringFailure { cursor, source })?;

            accumulator.merge(
                sops,
                cursor,
                CellResult::new(transcript.clone(), score.text, score.tokens),
            );
        }
        Ok(accumulator)
    }
}
