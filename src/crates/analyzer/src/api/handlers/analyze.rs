//! Synchronous analysis handler

use axum::{extract::State, Json};
use serde::Serialize;

use crate::api::{caller::CallerIdentity, error::ApiResult, routes::AppState};
use crate::execution::{AnalysisRequest, SopBucket};

/// Body of a successful `POST /analyze`
#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    pub results: Vec<SopBucket>,
}

/// Handler for POST /analyze
///
/// Scores the whole matrix in one request without checkpointing. The first
/// scoring failure fails the request.
pub async fn analyze(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Json(request): Json<AnalysisRequest>,
) -> ApiResult<Json<AnalyzeResponse>> {
    tracing::info!(
        caller = caller.as_str(),
        sops = request.sops.len(),
        transcripts = request.transcripts.len(),
        "Synchronous analysis requested"
    );

    let accumulator = state
        .coordinator
        .analyze_blocking(&request.sops, &request.transcripts)
        .await?;

    Ok(Json(AnalyzeResponse {
        results: accumulator.into_buckets(),
    }))
}
