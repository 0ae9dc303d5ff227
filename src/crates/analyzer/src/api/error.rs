//! API error types and HTTP response conversion
//!
//! Pipeline, checkpoint and database errors are converted to HTTP status
//! codes here so handlers can use `?` throughout.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use run_checkpoint::CheckpointError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::db::DatabaseError;
use crate::execution::PipelineError;

/// API error response structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorResponse {
    /// Error type identifier
    pub error: String,
    /// Human-readable error message
    pub message: String,
    /// Error code for programmatic handling
    pub code: String,
}

impl ApiErrorResponse {
    pub fn new(error: impl Into<String>, message: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            code: code.into(),
        }
    }
}

/// API result type
pub type ApiResult<T> = Result<T, ApiError>;

/// Custom API error type
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(String),

    /// Invalid request data, including an invalid start cursor
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    ValidationError(String),

    /// Missing caller identity or bad credentials
    #[error("{0}")]
    Unauthorized(String),

    /// Caller is not the owner of the record
    #[error("{0}")]
    Forbidden(String),

    /// The scoring provider failed
    #[error("{0}")]
    BadGateway(String),

    #[error("Internal server error: {0}")]
    InternalError(String),

    #[error("Database error: {0}")]
    DatabaseError(#[from] DatabaseError),

    #[error("JSON error: {0}")]
    JsonError(String),
}

impl ApiError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::ValidationError(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::BadGateway(_) => StatusCode::BAD_GATEWAY,
            ApiError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::DatabaseError(db_err) => {
                if db_err.is_not_found() {
                    StatusCode::NOT_FOUND
                } else if db_err.is_constraint_violation() {
                    StatusCode::CONFLICT
                } else {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            }
            ApiError::JsonError(_) => StatusCode::BAD_REQUEST,
        }
    }

    /// Get the error code identifier
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::ValidationError(_) => "VALIDATION_ERROR",
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::BadGateway(_) => "SCORING_FAILED",
            ApiError::InternalError(_) => "INTERNAL_ERROR",
            ApiError::DatabaseError(db_err) => {
                if db_err.is_not_found() {
                    "DB_NOT_FOUND"
                } else if db_err.is_constraint_violation() {
                    "DB_CONSTRAINT_VIOLATION"
                } else {
                    "DB_ERROR"
                }
            }
            ApiError::JsonError(_) => "JSON_ERROR",
        }
    }

    /// Get the error type name
    pub fn error_type(&self) -> &'static str {
        match self {
            ApiError::NotFound(_) => "NotFound",
            ApiError::BadRequest(_) => "BadRequest",
            ApiError::ValidationError(_) => "ValidationError",
            ApiError::Unauthorized(_) => "Unauthorized",
            ApiError::Forbidden(_) => "Forbidden",
            ApiError::BadGateway(_) => "BadGateway",
            ApiError::InternalError(_) => "InternalError",
            ApiError::DatabaseError(_) => "DatabaseError",
            ApiError::JsonError(_) => "JsonError",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ApiErrorResponse::new(self.error_type(), self.to_string(), self.code());

        if status.is_server_error() {
            tracing::error!("API Error: {:?}", body);
        } else {
            tracing::debug!("API Error: {:?}", body);
        }

        (status, Json(body)).into_response()
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::JsonError(err.to_string())
    }
}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::InvalidInput(msg) | PipelineError::InvalidCursor(msg) => {
                ApiError::BadRequest(msg)
            }
            PipelineError::AuthorizationFailure(id) => {
                ApiError::Forbidden(format!("History record {} does not belong to the caller", id))
            }
            PipelineError::NotFound(id) => {
                ApiError::NotFound(format!("History record not found: {}", id))
            }
            err @ PipelineError::ScoringFailure { .. } => ApiError::BadGateway(err.to_string()),
            err => ApiError::InternalError(err.to_string()),
        }
    }
}

impl From<CheckpointError> for ApiError {
    fn from(err: CheckpointError) -> Self {
        match err {
            CheckpointError::OwnerMismatch { id } => {
                ApiError::Forbidden(format!("History record {} does not belong to the caller", id))
            }
            CheckpointError::Invalid(msg) => ApiError::BadRequest(msg),
            err => ApiError::InternalError(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::Cursor;
    use llm::LlmError;

    #[test]
    fn test_not_found_error() {
        let err = ApiError::NotFound("resource".to_string());
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(err.code(), "NOT_FOUND");
        assert_eq!(err.error_type(), "NotFound");
    }

    #[test]
    fn test_invalid_input_is_bad_request_with_message() {
        let err: ApiError = PipelineError::InvalidInput(
            "At least one transcript and one SOP are required.".to_string(),
        )
        .into();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "At least one transcript and one SOP are required.");
    }

    #[test]
    fn test_invalid_cursor_is_bad_request() {
        let err: ApiError = PipelineError::InvalidCursor("out of range".to_string()).into();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_authorization_failure_is_forbidden() {
        let err: ApiError = PipelineError::AuthorizationFailure("abc".to_string()).into();
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(err.code(), "FORBIDDEN");
    }

    #[test]
    fn test_scoring_failure_is_bad_gateway() {
        let err: ApiError = PipelineError::ScoringFailure {
            cursor: Cursor::new(0, 1),
            source: LlmError::ServiceUnavailable("down".to_string()),
        }
        .into();
        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);
        assert!(err.to_string().starts_with("Error analyzing transcript 2 for SOP 1"));
    }

    #[test]
    fn test_checkpoint_storage_is_internal() {
        let err: ApiError = CheckpointError::Storage("disk full".to_string()).into();
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_database_not_found_maps_to_404() {
        let err = ApiError::DatabaseError(DatabaseError::not_found("row"));
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(err.code(), "DB_NOT_FOUND");
    }
}
