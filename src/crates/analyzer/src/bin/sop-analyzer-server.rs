//! SOP analyzer server binary
//!
//! Serves the analysis pipeline and history API over HTTP.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use llm::{OpenAiScorer, RemoteLlmConfig};
use sop_analyzer::api::{create_router, AppState};
use sop_analyzer::config::{SecurityState, ServerConfig};
use sop_analyzer::db::{DatabaseConnection, SqliteCheckpointStore};
use sop_analyzer::execution::ResumeCoordinator;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    tracing::info!("Loading server configuration...");
    let config = ServerConfig::load().context("failed to load server configuration")?;

    tracing::info!("Security Mode: {:?}", config.security.mode);
    tracing::info!("Database Path: {}", config.database.path);
    tracing::info!(
        "Checkpoint interval: {} cells",
        config.pipeline.checkpoint_interval
    );

    let database_url = config.database_url();
    tracing::info!("Connecting to database: {}", database_url);
    let db = DatabaseConnection::new(&database_url)
        .await
        .context("failed to open database")?;

    tracing::info!("Running database migrations");
    db.run_migrations().await?;
    db.health_check().await?;

    let llm_config = RemoteLlmConfig::from_env(
        &config.llm.api_key_env,
        config.llm.base_url.clone(),
        config.llm.model.clone(),
    )?
    .with_temperature(config.llm.temperature)
    .with_timeout(Duration::from_secs(config.llm.timeout_secs));
    let scorer = OpenAiScorer::new(llm_config)?;
    tracing::info!("Scoring model: {}", config.llm.model);

    let store = SqliteCheckpointStore::new(db.clone());
    let coordinator = ResumeCoordinator::new(
        Arc::new(scorer),
        Arc::new(store),
        config.pipeline.clone(),
    );

    let security = SecurityState::new(config.security.clone());
    let app = create_router(AppState::new(coordinator, Some(db.clone()), security));

    let addr = config.listen_addr();
    tracing::info!("Starting {} on {}", config.server.name, addr);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    db.close().await;
    tracing::info!("Server shut down gracefully");
    Ok(())
}

/// Resolves on Ctrl-C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for CTRL-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received CTRL-C signal, shutting down");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM signal, shutting down");
        }
    }
}
