//! Streaming analysis handler (server-sent events)

use std::{convert::Infallible, time::Duration};

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use futures::stream::Stream;
use tokio_stream::{wrappers::ReceiverStream, StreamExt};
use tracing::{debug, error, info};

use crate::api::{caller::CallerIdentity, error::ApiResult, routes::AppState};
use crate::execution::{AnalysisRequest, RunOutcome, StreamEmitter, StreamEvent};

/// Convert a pipeline event to an SSE frame named after its variant
fn to_sse_event(event: &StreamEvent) -> Event {
    let frame = Event::default().event(event.event_name());
    match frame.json_data(event) {
        Ok(frame) => frame,
        Err(e) => {
            error!("Failed to encode stream event: {}", e);
            Event::default()
                .event("failed")
                .data(serde_json::json!({ "error": e.to_string() }).to_string())
        }
    }
}

/// Handler for POST /analyze/stream
///
/// Request, cursor and ownership errors are answered synchronously. Once the
/// stream is open the attempt runs on its own task; dropping the response
/// body closes the channel, which the coordinator treats as an abort.
pub async fn analyze_stream(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Json(request): Json<AnalysisRequest>,
) -> ApiResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    let prepared = state.coordinator.prepare(request, caller.as_str()).await?;

    let (emitter, receiver) = StreamEmitter::channel(state.coordinator.config().stream_buffer);
    let coordinator = state.coordinator.clone();

    info!(
        caller = caller.as_str(),
        start = %prepared.start(),
        history_id = ?prepared.history_id(),
        "Opening analysis stream"
    );

    tokio::spawn(async move {
        match coordinator.execute(prepared, &emitter).await {
            RunOutcome::Completed { history_id } => {
                debug!(history_id = %history_id, "Analysis stream finished")
            }
            RunOutcome::Failed {
                history_id, reason, ..
            } => debug!(history_id = ?history_id, reason = ?reason, "Analysis stream failed"),
            RunOutcome::Aborted { history_id, .. } => {
                debug!(history_id = ?history_id, "Analysis stream aborted by client")
            }
        }
    });

    let stream = ReceiverStream::new(receiver).map(|event| Ok(to_sse_event(&event)));

    Ok(Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    ))
}
