//! API route definitions

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use run_checkpoint::CheckpointStore;
use std::sync::Arc;

use crate::api::{
    handlers,
    middleware::{cors_layer, logging_layer},
};
use crate::config::{security_middleware, SecurityState};
use crate::db::DatabaseConnection;
use crate::execution::ResumeCoordinator;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub coordinator: ResumeCoordinator,
    pub store: Arc<dyn CheckpointStore>,
    /// Present when the store is SQLite-backed; used by the health check
    pub db: Option<DatabaseConnection>,
    pub security: Arc<SecurityState>,
}

impl AppState {
    pub fn new(
        coordinator: ResumeCoordinator,
        db: Option<DatabaseConnection>,
        security: SecurityState,
    ) -> Self {
        Self {
            store: coordinator.store().clone(),
            coordinator,
            db,
            security: Arc::new(security),
        }
    }
}

/// Build the complete API router
///
/// `/analyze*` routes sit behind the security middleware; `/health` does not.
pub fn create_router(state: AppState) -> Router {
    let analyze_routes = Router::new()
        .route("/analyze", post(handlers::analyze))
        .route("/analyze/stream", post(handlers::analyze_stream))
        .route(
            "/analyze/history",
            post(handlers::save_history).get(handlers::list_history),
        )
        .route(
            "/analyze/history/:id",
            get(handlers::get_history)
                .put(handlers::rename_history)
                .delete(handlers::delete_history),
        )
        .route(
            "/analyze/history/:id/status",
            put(handlers::update_history_status),
        )
        .route_layer(middleware::from_fn_with_state(
            state.security.clone(),
            security_middleware,
        ));

    Router::new()
        .route("/health", get(handlers::health))
        .merge(analyze_routes)
        .layer(cors_layer())
        .layer(logging_layer())
        .with_state(state)
}
