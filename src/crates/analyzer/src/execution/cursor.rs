//! Matrix walker and cursor arithmetic
//!
//! Cells of the sop x transcript matrix are visited in row-major order: every
//! transcript for sop 0, then every transcript for sop 1, and so on. A
//! [`Cursor`] names one cell; ordering is lexicographic on
//! `(sop_index, transcript_index)`, which matches the walk order.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::error::{PipelineError, PipelineResult};

/// Position of one cell in the sop x transcript matrix
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cursor {
    pub sop_index: usize,
    pub transcript_index: usize,
}

impl Cursor {
    pub fn new(sop_index: usize, transcript_index: usize) -> Self {
        Self {
            sop_index,
            transcript_index,
        }
    }

    /// The first cell, `(0, 0)`
    pub fn origin() -> Self {
        Self::default()
    }

    /// The cell after this one.
    ///
    /// Rolls over to the next sop when the transcript index reaches
    /// `transcript_count`. Past the last cell this yields a cursor with
    /// `sop_index == sop_count`, see [`Cursor::is_past_end`].
    pub fn next(self, transcript_count: usize) -> Self {
        let transcript_index = self.transcript_index + 1;
        if transcript_index >= transcript_count {
            Self::new(self.sop_index + 1, 0)
        } else {
            Self::new(self.sop_index, transcript_index)
        }
    }

    /// The cell before this one, or `None` at the origin.
    pub fn previous(self, transcript_count: usize) -> Option<Self> {
        match (self.sop_index, self.transcript_index) {
            (0, 0) => None,
            (sop, 0) => Some(Self::new(sop - 1, transcript_count.saturating_sub(1))),
            (sop, t) => Some(Self::new(sop, t - 1)),
        }
    }

    /// Start cursor for a run whose last completed cell is `last`.
    pub fn resume_after(last: Option<Cursor>, transcript_count: usize) -> Self {
        match last {
            Some(cursor) => cursor.next(transcript_count),
            None => Self::origin(),
        }
    }

    /// Zero-based position in row-major order
    pub fn position(self, transcript_count: usize) -> usize {
        self.sop_index * transcript_count + self.transcript_index
    }

    /// True once the walk has moved beyond the final sop.
    pub fn is_past_end(self, sop_count: usize) -> bool {
        self.sop_index >= sop_count
    }

    /// True for the final cell of the matrix
    pub fn is_last(self, sop_count: usize, transcript_count: usize) -> bool {
        self.next(transcript_count).is_past_end(sop_count)
    }

    /// Reject cursors that do not name a cell of a `sop_count x transcript_count` matrix.
    pub fn validate(self, sop_count: usize, transcript_count: usize) -> PipelineResult<()> {
        if self.sop_index >= sop_count {
            return Err(PipelineError::InvalidCursor(format!(
                "sopIndex {} out of bounds for {} SOPs",
                self.sop_index, sop_count
            )));
        }
        if self.transcript_index >= transcript_count {
            return Err(PipelineError::InvalidCursor(format!(
                "transcriptIndex {} out of bounds for {} transcripts",
                self.transcript_index, transcript_count
            )));
        }
        Ok(())
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.sop_index, self.transcript_index)
    }
}

/// Row-major iterator over matrix cells, starting at a cursor inclusive
#[derive(Debug, Clone)]
pub struct MatrixWalker {
    sop_count: usize,
    transcript_count: usize,
    next: Option<Cursor>,
}

impl MatrixWalker {
    /// Walk a `sop_count x transcript_count` matrix from `start` (or the origin).
    ///
    /// An out-of-bounds start fails with `InvalidCursor` before anything is
    /// visited. An empty matrix with no start yields nothing.
    pub fn new(
        sop_count: usize,
        transcript_count: usize,
        start: Option<Cursor>,
    ) -> PipelineResult<Self> {
        let next = match start {
            Some(cursor) => {
                cursor.validate(sop_count, transcript_count)?;
                Some(cursor)
            }
            None if sop_count == 0 || transcript_count == 0 => None,
            None => Some(Cursor::origin()),
        };

        Ok(Self {
            sop_count,
            transcript_count,
            next,
        })
    }

    pub fn total_cells(&self) -> usize {
        self.sop_count * self.transcript_count
    }
}

impl Iterator for MatrixWalker {
    type Item = Cursor;

    fn next(&mut self) -> Option<Cursor> {
        let current = self.next?;
        let following = current.next(self.transcript_count);
        self.next = if following.is_past_end(self.sop_count) {
            None
        } else {
            Some(following)
        };
        Some(current)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self
            .next
            .map(|c| self.total_cells() - c.position(self.transcript_count))
            .unwrap_or(0);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for MatrixWalker {}
