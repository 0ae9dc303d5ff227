//! Stream emitter
//!
//! Every event is a cumulative snapshot: a consumer that only sees the latest
//! event still has the complete state so far. On the wire each event is one
//! self-contained JSON object; the variant is recoverable from its fields
//! (`error` for failures, `completed` for success, otherwise progress).

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::debug;

use super::accumulator::SopBucket;
use super::cursor::Cursor;

/// Snapshot after a successfully scored cell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressEvent {
    pub results: Vec<SopBucket>,
    pub last_processed_index: Cursor,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub history_id: Option<String>,
}

/// What ended a failed attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureReason {
    /// The scoring call for a cell failed
    Scoring,
    /// A terminal checkpoint write failed after every retry
    Checkpoint,
}

/// Terminal event for an attempt that stopped early
///
/// `last_processed_index` and `history_id` describe the last durably
/// persisted state, so incrementing the cursor yields the cell to resume at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailureEvent {
    pub error: String,
    pub partial_results: Vec<SopBucket>,
    pub last_processed_index: Option<Cursor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub history_id: Option<String>,
    pub reason: FailureReason,
}

impl FailureEvent {
    /// Whether the event carries enough to build a resume request
    pub fn is_resumable(&self) -> bool {
        self.history_id.is_some()
    }
}

/// Terminal event for a run whose final checkpoint was persisted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletedEvent {
    pub results: Vec<SopBucket>,
    pub completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub history_id: Option<String>,
}

/// One unit of the analysis stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StreamEvent {
    AttemptFailed(FailureEvent),
    Completed(CompletedEvent),
    Progress(ProgressEvent),
}

impl StreamEvent {
    pub fn progress(results: Vec<SopBucket>, cursor: Cursor, history_id: Option<String>) -> Self {
        StreamEvent::Progress(ProgressEvent {
            results,
            last_processed_index: cursor,
            history_id,
        })
    }

    pub fn completed(results: Vec<SopBucket>, history_id: Option<String>) -> Self {
        StreamEvent::Completed(CompletedEvent {
            results,
            completed: true,
            history_id,
        })
    }

    pub fn failed(
        error: impl Into<String>,
        partial_results: Vec<SopBucket>,
        last_processed_index: Option<Cursor>,
        history_id: Option<String>,
        reason: FailureReason,
    ) -> Self {
        StreamEvent::AttemptFailed(FailureEvent {
            error: error.into(),
            partial_results,
            last_processed_index,
            history_id,
            reason,
        })
    }

    /// SSE event name
    pub fn event_name(&self) -> &'static str {
        match self {
            StreamEvent::Progress(_) => "progress",
            StreamEvent::AttemptFailed(_) => "failed",
            StreamEvent::Completed(_) => "completed",
        }
    }

    /// Whether this event ends the attempt
    pub fn is_terminal(&self) -> bool {
        !matches!(self, StreamEvent::Progress(_))
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Sending half of an attempt's event stream
///
/// The attempt counts as aborted once the receiving half is dropped, which is
/// what happens when the client disconnects.
#[derive(Debug, Clone)]
pub struct StreamEmitter {
    sender: mpsc::Sender<StreamEvent>,
}

impl StreamEmitter {
    /// Create an emitter and its receiver
    pub fn channel(buffer_size: usize) -> (Self, mpsc::Receiver<StreamEvent>) {
        let (sender, receiver) = mpsc::channel(buffer_size.max(1));
        (Self { sender }, receiver)
    }

    /// Push an event; returns false if the consumer has gone away.
    pub async fn emit(&self, event: StreamEvent) -> bool {
        let name = event.event_name();
        match self.sender.send(event).await {
            Ok(()) => true,
            Err(_) => {
                debug!(event = name, "Stream consumer dropped, event discarded");
                false
            }
        }
    }

    /// Cooperative abort check, polled between cells
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::accumulator::CellResult;
    use serde_json::json;

    fn buckets() -> Vec<SopBucket> {
        vec![SopBucket {
            sop: "S1".to_string(),
            analyses: vec![CellResult::new("T1", "R1", 10)],
        }]
    }

    #[test]
    fn test_progress_wire_shape() {
        let event = StreamEvent::progress(buckets(), Cursor::new(0, 0), None);
        let value: serde_json::Value = serde_json::from_str(&event.to_json().unwrap()).unwrap();
        assert_eq!(
            value,
            json!({
                "results": [{"sop": "S1", "analyses": [{"transcript": "T1", "result": "R1", "tokens": 10}]}],
                "lastProcessedIndex": {"sopIndex": 0, "transcriptIndex": 0}
            })
        );
        assert_eq!(event.event_name(), "progress");
        assert!(!event.is_terminal());
    }

    #[test]
    fn test_failure_wire_shape() {
        let event = StreamEvent::failed(
            "boom",
            buckets(),
            Some(Cursor::new(0, 0)),
            Some("abc".to_string()),
            FailureReason::Scoring,
        );
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["error"], "boom");
        assert_eq!(value["historyId"], "abc");
        assert_eq!(value["reason"], "scoring");
        assert_eq!(value["lastProcessedIndex"]["transcriptIndex"], 0);
        assert_eq!(value["partialResults"][0]["sop"], "S1");
    }

    #[test]
    fn test_failure_without_progress_has_null_cursor() {
        let event = StreamEvent::failed("boom", vec![], None, None, FailureReason::Checkpoint);
        let value = serde_json::to_value(&event).unwrap();
        assert!(value["lastProcessedIndex"].is_null());
        assert!(value.get("historyId").is_none());
    }

    #[test]
    fn test_completed_wire_shape() {
        let event = StreamEvent::completed(buckets(), Some("abc".to_string()));
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["completed"], true);
        assert_eq!(value["results"][0]["analyses"][0]["result"], "R1");
        assert_eq!(event.event_name(), "completed");
    }

    #[test]
    fn test_events_parse_back_to_their_variant() {
        let events = vec![
            StreamEvent::progress(buckets(), Cursor::new(0, 0), Some("abc".to_string())),
            StreamEvent::failed("x", buckets(), None, None, FailureReason::Scoring),
            StreamEvent::completed(buckets(), None),
        ];
        for event in events {
            let parsed: StreamEvent = serde_json::from_str(&event.to_json().unwrap()).unwrap();
            assert_eq!(parsed, event);
        }
    }

    #[tokio::test]
    async fn test_emitter_reports_dropped_consumer() {
        let (emitter, receiver) = StreamEmitter::channel(4);
        assert!(!emitter.is_closed());
        drop(receiver);

        assert!(emitter.is_closed());
        assert!(!emitter.emit(StreamEvent::completed(vec![], None)).await);
    }
}
