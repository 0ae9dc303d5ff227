//! Health check endpoint handler

use axum::{extract::State, http::StatusCode, Json};

use crate::api::{models::HealthResponse, routes::AppState};

/// Handler for GET /health
///
/// Reports the database as unavailable (503) when the health query fails.
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let Some(db) = state.db.as_ref() else {
        return (StatusCode::OK, Json(HealthResponse::new("ok", "none")));
    };

    match db.health_check().await {
        Ok(()) => (StatusCode::OK, Json(HealthResponse::new("ok", "connected"))),
        Err(e) => {
            tracing::error!("Database health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse::new("error", "error")),
            )
        }
    }
}
