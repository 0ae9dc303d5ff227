//! Shared fixtures for integration tests
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use llm::{LlmError, Score, Scorer};
use run_checkpoint::{
    CheckpointError, CheckpointStore, HistoryRecord, InMemoryCheckpointStore, RunCheckpoint,
};
use sop_analyzer::config::PipelineConfig;
use sop_analyzer::execution::{ResumeCoordinator, StreamEvent};
use tokio::sync::mpsc;

/// Scorer answering `"{sop}:{transcript}"` with `tokens` tokens, unless the
/// pair has a scripted answer or is scripted to fail
pub struct ScriptedScorer {
    tokens: u64,
    answers: Mutex<HashMap<(String, String), String>>,
    failures: Mutex<HashMap<(String, String), usize>>,
    calls: Mutex<Vec<(String, String)>>,
}

impl ScriptedScorer {
    pub fn new(tokens: u64) -> Self {
        Self {
            tokens,
            answers: Mutex::new(HashMap::new()),
            failures: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Answer this pair with `text`
    pub fn with_result(self, sop: &str, transcript: &str, text: &str) -> Self {
        self.answers
            .lock()
            .unwrap()
            .insert((sop.to_string(), transcript.to_string()), text.to_string());
        self
    }

    /// Fail every call for this pair
    pub fn fail_on(self, sop: &str, transcript: &str) -> Self {
        self.fail_times(sop, transcript, usize::MAX)
    }

    /// Fail the next `times` calls for this pair, then succeed
    pub fn fail_times(self, sop: &str, transcript: &str, times: usize) -> Self {
        self.failures
            .lock()
            .unwrap()
            .insert((sop.to_string(), transcript.to_string()), times);
        self
    }

    /// Stop failing anything
    pub fn heal(&self) {
        self.failures.lock().unwrap().clear();
    }

    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl Scorer for ScriptedScorer {
    async fn score(&self, sop: &str, transcript: &str) -> llm::Result<Score> {
        self.calls
            .lock()
            .unwrap()
            .push((sop.to_string(), transcript.to_string()));

        let key = (sop.to_string(), transcript.to_string());
        if let Some(remaining) = self.failures.lock().unwrap().get_mut(&key) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(LlmError::ServiceUnavailable("upstream unavailable".to_string()));
            }
        }

        let text = self
            .answers
            .lock()
            .unwrap()
            .get(&key)
            .cloned()
            .unwrap_or_else(|| format!("{}:{}", sop, transcript));
        Ok(Score::new(text, self.tokens))
    }

    fn model(&self) -> &str {
        "scripted"
    }
}

/// In-memory store whose writes can be made to fail on demand
#[derive(Clone, Default)]
pub struct FlakyStore {
    inner: InMemoryCheckpointStore,
    fail_next_saves: Arc<AtomicUsize>,
    fail_all_saves: Arc<AtomicBool>,
    fail_complete_saves: Arc<AtomicBool>,
    reject_saves: Arc<AtomicBool>,
    attempted_saves: Arc<AtomicUsize>,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inner(&self) -> &InMemoryCheckpointStore {
        &self.inner
    }

    pub fn fail_next_saves(&self, count: usize) {
        self.fail_next_saves.store(count, Ordering::SeqCst);
    }

    pub fn fail_all_saves(&self, enabled: bool) {
        self.fail_all_saves.store(enabled, Ordering::SeqCst);
    }

    /// Fail every write that would mark a record complete
    pub fn fail_complete_saves(&self, enabled: bool) {
        self.fail_complete_saves.store(enabled, Ordering::SeqCst);
    }

    /// Reject every write as invalid, an error no retry can fix
    pub fn reject_saves(&self, enabled: bool) {
        self.reject_saves.store(enabled, Ordering::SeqCst);
    }

    /// Every save call, successful or not
    pub fn attempted_saves(&self) -> usize {
        self.attempted_saves.load(Ordering::SeqCst)
    }

    fn should_fail(&self, checkpoint: &RunCheckpoint) -> bool {
        if self.fail_all_saves.load(Ordering::SeqCst) {
            return true;
        }
        if checkpoint.is_complete && self.fail_complete_saves.load(Ordering::SeqCst) {
            return true;
        }
        self.fail_next_saves
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl CheckpointStore for FlakyStore {
    async fn get(&self, id: &str) -> run_checkpoint::Result<Option<HistoryRecord>> {
        self.inner.get(id).await
    }

    async fn save(&self, checkpoint: RunCheckpoint) -> run_checkpoint::Result<HistoryRecord> {
        self.attempted_saves.fetch_add(1, Ordering::SeqCst);
        if self.reject_saves.load(Ordering::SeqCst) {
            return Err(CheckpointError::Invalid("write rejected".to_string()));
        }
        if self.should_fail(&checkpoint) {
            return Err(CheckpointError::Storage("disk unavailable".to_string()));
        }
        self.inner.save(checkpoint).await
    }

    async fn list(&self, user_id: &str) -> run_checkpoint::Result<Vec<HistoryRecord>> {
        self.inner.list(user_id).await
    }

    async fn rename(
        &self,
        id: &str,
        user_id: &str,
        name: &str,
    ) -> run_checkpoint::Result<Option<HistoryRecord>> {
        self.inner.rename(id, user_id, name).await
    }

    async fn set_complete(
        &self,
        id: &str,
        user_id: &str,
        is_complete: bool,
    ) -> run_checkpoint::Result<Option<HistoryRecord>> {
        self.inner.set_complete(id, user_id, is_complete).await
    }

    async fn delete(&self, id: &str, user_id: &str) -> run_checkpoint::Result<bool> {
        self.inner.delete(id, user_id).await
    }
}

/// Pipeline settings with millisecond backoff so retry tests stay fast
pub fn fast_config() -> PipelineConfig {
    PipelineConfig::default()
        .with_terminal_write_attempts(3)
        .with_terminal_write_backoff_ms(1)
}

pub fn coordinator(
    scorer: Arc<ScriptedScorer>,
    store: Arc<dyn CheckpointStore>,
    config: PipelineConfig,
) -> ResumeCoordinator {
    ResumeCoordinator::new(scorer, store, config)
}

pub fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

/// Drain every event an attempt produced
pub async fn drain(mut receiver: mpsc::Receiver<StreamEvent>) -> Vec<StreamEvent> {
    let mut events = Vec::new();
    while let Some(event) = receiver.recv().await {
        events.push(event);
    }
    events
}
