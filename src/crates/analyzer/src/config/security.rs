//! Security configuration and middleware
//!
//! Handles the two security modes: open and secret-key.

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use std::sync::Arc;
use tracing::warn;

use crate::api::error::ApiError;
use crate::config::{SecurityConfig, SecurityMode};

/// Security middleware state
#[derive(Debug, Clone)]
pub struct SecurityState {
    mode: SecurityMode,
    secret_key: Option<String>,
}

impl SecurityState {
    /// Build from config, letting the SECRET_KEY environment variable win
    pub fn new(config: SecurityConfig) -> Self {
        let secret_key = std::env::var("SECRET_KEY").ok().or(config.secret_key);
        Self::with_key(config.mode, secret_key)
    }

    pub fn with_key(mode: SecurityMode, secret_key: Option<String>) -> Self {
        Self {
            mode,
            secret_key: secret_key.filter(|k| !k.is_empty()),
        }
    }

    pub fn open() -> Self {
        Self::with_key(SecurityMode::Open, None)
    }

    pub fn mode(&self) -> SecurityMode {
        self.mode
    }

    /// Check an `Authorization` header value against the configured mode
    pub fn authorize(&self, authorization: Option<&str>) -> bool {
        match self.mode {
            SecurityMode::Open => true,
            SecurityMode::SecretKey => {
                let presented = authorization.and_then(|h| h.strip_prefix("Bearer "));
                match (presented, self.secret_key.as_deref()) {
                    (Some(key), Some(expected)) => key == expected,
                    _ => false,
                }
            }
        }
    }
}

/// Security middleware for Axum
pub async fn security_middleware(
    State(state): State<Arc<SecurityState>>,
    request: Request,
    next: Next,
) -> Response {
    let authorization = request
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok());

    if state.authorize(authorization) {
        return next.run(request).await;
    }

    warn!("Unauthorized request - missing or invalid API key");
    ApiError::Unauthorized("missing or invalid API key".to_string()).into_response()
}
