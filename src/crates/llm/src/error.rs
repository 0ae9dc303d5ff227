//! Error types for the scoring gateway.

use thiserror::Error;

/// Result type for LLM operations.
pub type Result<T> = std::result::Result<T, LlmError>;

/// Errors that can occur when scoring a (sop, transcript) pair.
#[derive(Debug, Error)]
pub enum LlmError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// API authentication failed.
    #[error("Authentication failed: {0}")]
    AuthenticationError(String),

    /// API key not found in environment.
    #[error("API key not found: {0}")]
    ApiKeyNotFound(String),

    /// Provider service unavailable (5xx).
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Rate limit exceeded.
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// Invalid response from provider.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Request timeout.
    #[error("Request timeout: {0}")]
    Timeout(String),

    /// Any other non-success answer from the provider.
    #[error("Provider error: {0}")]
    ProviderError(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl LlmError {
    /// Check if this error is transient, i.e. the same call may succeed later.
    pub fn is_retryable(&self) -> bool {
        match self {
            LlmError::HttpError(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            LlmError::ServiceUnavailable(_)
            | LlmError::Timeout(_)
            | LlmError::RateLimitExceeded(_) => true,
            _ => false,
        }
    }

    /// Check if this error is due to authentication.
    pub fn is_auth_error(&self) -> bool {
        matches!(
            self,
            LlmError::AuthenticationError(_) | LlmError::ApiKeyNotFound(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(LlmError::RateLimitExceeded("slow down".into()).is_retryable());
        assert!(LlmError::ServiceUnavailable("503".into()).is_retryable());
        assert!(LlmError::Timeout("60s".into()).is_retryable());
        assert!(!LlmError::AuthenticationError("bad key".into()).is_retryable());
        assert!(!LlmError::InvalidResponse("no json".into()).is_retryable());
    }

    #[test]
    fn test_auth_classification() {
        assert!(LlmError::ApiKeyNotFound("OPENAI_API_KEY".into()).is_auth_error());
        assert!(!LlmError::ProviderError("400".into()).is_auth_error());
    }
}
