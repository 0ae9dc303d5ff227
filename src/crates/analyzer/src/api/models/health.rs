//! Health check response model

use serde::{Deserialize, Serialize};

/// Body of `GET /health`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    /// "connected", "error", or "none" when running without a database
    pub database: String,
    pub timestamp: String,
}

impl HealthResponse {
    pub fn new(status: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            status: status.into(),
            version: crate::version().to_string(),
            database: database.into(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}
