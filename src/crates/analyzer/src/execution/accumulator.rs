//! Run accumulator
//!
//! Holds the partial results of one run, one bucket per sop index. It is the
//! single source of truth for both the stream snapshots and the checkpoint
//! payload. Buckets are addressed by position only: two sops with identical
//! text are still two buckets, and a repeated transcript is still two cells.

use run_checkpoint::{JsonCodec, TextCodec};
use serde::{Deserialize, Serialize};

use super::cursor::Cursor;
use super::error::{PipelineError, PipelineResult};

/// Outcome of scoring one (sop, transcript) cell
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellResult {
    pub transcript: String,
    pub result: String,
    pub tokens: u64,
}

impl CellResult {
    pub fn new(transcript: impl Into<String>, result: impl Into<String>, tokens: u64) -> Self {
        Self {
            transcript: transcript.into(),
            result: result.into(),
            tokens,
        }
    }
}

/// All analyses for one sop, in transcript order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SopBucket {
    pub sop: String,
    pub analyses: Vec<CellResult>,
}

impl SopBucket {
    pub fn new(sop: impl Into<String>) -> Self {
        Self {
            sop: sop.into(),
            analyses: Vec::new(),
        }
    }
}

/// Ordered sop buckets for a run; serializes as a bare JSON array
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunAccumulator {
    buckets: Vec<SopBucket>,
}

impl RunAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_buckets(buckets: Vec<SopBucket>) -> Self {
        Self { buckets }
    }

    /// Seed from a persisted `results` payload.
    pub fn from_stored(results: &str) -> PipelineResult<Self> {
        JsonCodec
            .decode(results)
            .map_err(|e| PipelineError::Serialization(format!("stored results: {}", e)))
    }

    /// Stored form of the accumulator
    pub fn to_stored(&self) -> PipelineResult<String> {
        JsonCodec
            .encode(self)
            .map_err(|e| PipelineError::Serialization(e.to_string()))
    }

    pub fn buckets(&self) -> &[SopBucket] {
        &self.buckets
    }

    pub fn into_buckets(self) -> Vec<SopBucket> {
        self.buckets
    }

    /// Snapshot for a stream event
    pub fn snapshot(&self) -> Vec<SopBucket> {
        self.buckets.clone()
    }

    /// Number of scored cells across all buckets
    pub fn cell_count(&self) -> usize {
        self.buckets.iter().map(|b| b.analyses.len()).sum()
    }

    pub fn total_tokens(&self) -> u64 {
        self.buckets
            .iter()
            .flat_map(|b| b.analyses.iter())
            .map(|c| c.tokens)
            .sum()
    }

    /// Place `cell` at `cursor`.
    ///
    /// Missing buckets up to `cursor.sop_index` are created lazily from
    /// `sops`. A position that already holds a cell is overwritten in place;
    /// the next free position is appended to.
    pub fn merge(&mut self, sops: &[String], cursor: Cursor, cell: CellResult) {
        while self.buckets.len() <= cursor.sop_index {
            let sop = sops.get(self.buckets.len()).cloned().unwrap_or_default();
            self.buckets.push(SopBucket::new(sop));
        }

        let analyses = &mut self.buckets[cursor.sop_index].analyses;
        match analyses.get_mut(cursor.transcript_index) {
            Some(existing) => *existing = cell,
            None => analyses.push(cell),
        }
    }

    /// Check that the seed covers every cell before `start` and belongs to
    /// this input.
    ///
    /// Buckets before `start.sop_index` must be full, the bucket at
    /// `start.sop_index` must reach `start.transcript_index`, and no bucket
    /// may exceed the matrix shape. Every stored bucket must carry the sop
    /// text at its position, and every kept cell before `start` the
    /// transcript text at its position.
    pub fn validate_seed(
        &self,
        start: Cursor,
        sops: &[String],
        transcripts: &[String],
    ) -> PipelineResult<()> {
        let (sop_count, transcript_count) = (sops.len(), transcripts.len());
        if self.buckets.len() > sop_count {
            return Err(PipelineError::InvalidCursor(format!(
                "stored results cover {} SOPs but only {} were supplied",
                self.buckets.len(),
                sop_count
            )));
        }

        for (index, bucket) in self.buckets.iter().enumerate() {
            if bucket.analyses.len() > transcript_count {
                return Err(PipelineError::InvalidCursor(format!(
                    "stored results for SOP {} hold {} analyses but only {} transcripts were supplied",
                    index,
                    bucket.analyses.len(),
                    transcript_count
                )));
            }
        }

        for index in 0..start.sop_index.min(sop_count) {
            let filled = self.buckets.get(index).map_or(0, |b| b.analyses.len());
            if filled != transcript_count {
                return Err(PipelineError::InvalidCursor(format!(
                    "cannot start at {}: SOP {} has {} of {} analyses",
                    start, index, filled, transcript_count
                )));
            }
        }

        let filled = self
            .buckets
            .get(start.sop_index)
            .map_or(0, |b| b.analyses.len());
        if filled < start.transcript_index {
            return Err(PipelineError::InvalidCursor(format!(
                "cannot start at {}: SOP {} has only {} analyses",
                start, start.sop_index, filled
            )));
        }

        self.validate_labels(start, sops, transcripts)
    }

    fn validate_labels(
        &self,
        start: Cursor,
        sops: &[String],
        transcripts: &[String],
    ) -> PipelineResult<()> {
        for (sop_index, (bucket, sop)) in self.buckets.iter().zip(sops).enumerate() {
            if bucket.sop != *sop {
                return Err(PipelineError::InvalidInput(format!(
                    "stored results for SOP {} were produced for a different SOP",
                    sop_index
                )));
            }

            let kept = bucket
                .analyses
                .iter()
                .zip(transcripts)
                .enumerate()
                .take_while(|(transcript_index, _)| {
                    Cursor::new(sop_index, *transcript_index) < start
                });
            for (transcript_index, (cell, transcript)) in kept {
                if cell.transcript != *transcript {
                    return Err(PipelineError::InvalidInput(format!(
                        "stored analysis at {} was produced for a different transcript",
                        Cursor::new(sop_index, transcript_index)
                    )));
                }
            }
        }
        Ok(())
    }

    /// True when every sop bucket holds exactly `transcript_count` analyses.
    pub fn is_complete(&self, sop_count: usize, transcript_count: usize) -> bool {
        self.buckets.len() == sop_count
            && self
                .buckets
                .iter()
                .all(|b| b.analyses.len() == transcript_count)
    }
}
