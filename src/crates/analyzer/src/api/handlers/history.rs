//! Analysis history endpoint handlers
//!
//! Every lookup is scoped to the caller; another caller's record is reported
//! as not found rather than forbidden.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use run_checkpoint::RunCheckpoint;
use uuid::Uuid;

use crate::api::{
    caller::CallerIdentity,
    error::{ApiError, ApiResult},
    middleware::validate_not_empty,
    models::{
        DeleteHistoryResponse, HistoryDetail, HistoryItem, RenameHistoryRequest,
        SaveHistoryRequest, UpdateStatusRequest,
    },
    routes::AppState,
};
use crate::execution::{default_run_name, RunAccumulator};

fn not_found() -> ApiError {
    ApiError::NotFound("Analysis history item not found".to_string())
}

/// Save the results of a synchronous run
///
/// POST /analyze/history
pub async fn save_history(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Json(req): Json<SaveHistoryRequest>,
) -> ApiResult<impl IntoResponse> {
    let results = RunAccumulator::from_buckets(req.validate()?.to_vec());
    let name = req
        .name
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .unwrap_or_else(default_run_name);

    let checkpoint = RunCheckpoint::new(
        Uuid::new_v4().to_string(),
        caller.as_str(),
        name,
        results.to_stored()?,
    )
    .with_complete(req.is_complete.unwrap_or(true));

    let record = state.store.save(checkpoint).await?;

    tracing::info!(history_id = %record.id, caller = caller.as_str(), "Saved analysis history");
    Ok((StatusCode::CREATED, Json(HistoryItem::from(record))))
}

/// List the caller's records, newest first
///
/// GET /analyze/history
pub async fn list_history(
    State(state): State<AppState>,
    caller: CallerIdentity,
) -> ApiResult<Json<Vec<HistoryItem>>> {
    let records = state.store.list(caller.as_str()).await?;
    Ok(Json(records.into_iter().map(HistoryItem::from).collect()))
}

/// Get one record with results parsed
///
/// GET /analyze/history/:id
pub async fn get_history(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<String>,
) -> ApiResult<Json<HistoryDetail>> {
    let record = state
        .store
        .get(&id)
        .await?
        .filter(|record| record.is_owned_by(caller.as_str()))
        .ok_or_else(not_found)?;

    Ok(Json(HistoryDetail::try_from(record)?))
}

/// Rename a record
///
/// PUT /analyze/history/:id
pub async fn rename_history(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<String>,
    Json(req): Json<RenameHistoryRequest>,
) -> ApiResult<Json<HistoryItem>> {
    validate_not_empty(&req.name, "name")?;

    let record = state
        .store
        .rename(&id, caller.as_str(), req.name.trim())
        .await?
        .ok_or_else(not_found)?;

    Ok(Json(HistoryItem::from(record)))
}

/// Set or clear the completion flag
///
/// PUT /analyze/history/:id/status
pub async fn update_history_status(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<String>,
    Json(req): Json<UpdateStatusRequest>,
) -> ApiResult<Json<HistoryItem>> {
    let record = state
        .store
        .set_complete(&id, caller.as_str(), req.is_complete)
        .await?
        .ok_or_else(not_found)?;

    Ok(Json(HistoryItem::from(record)))
}

/// Delete a record
///
/// DELETE /analyze/history/:id
pub async fn delete_history(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<String>,
) -> ApiResult<Json<DeleteHistoryResponse>> {
    if !state.store.delete(&id, caller.as_str()).await? {
        return Err(not_found());
    }

    tracing::info!(history_id = %id, "Deleted analysis history");
    Ok(Json(DeleteHistoryResponse { success: true }))
}
