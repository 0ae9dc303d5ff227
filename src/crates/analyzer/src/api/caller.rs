//! Caller identity extraction
//!
//! The caller identity is an opaque string supplied by the fronting auth
//! layer in the `X-Caller-Id` header. It scopes every history record.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

use crate::api::error::ApiError;

/// Header carrying the caller identity
pub const CALLER_HEADER: &str = "x-caller-id";

/// Authenticated caller of an `/analyze*` route
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerIdentity(pub String);

impl CallerIdentity {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for CallerIdentity
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(CALLER_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(|value| CallerIdentity(value.to_string()))
            .ok_or_else(|| ApiError::Unauthorized("caller identity is required".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{Request, StatusCode};

    async fn extract(request: Request<()>) -> Result<CallerIdentity, ApiError> {
        let (mut parts, _) = request.into_parts();
        CallerIdentity::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn test_header_is_extracted() {
        let request = Request::builder()
            .header(CALLER_HEADER, " user-1 ")
            .body(())
            .unwrap();
        assert_eq!(extract(request).await.unwrap().as_str(), "user-1");
    }

    #[tokio::test]
    async fn test_missing_header_is_unauthorized() {
        let err = extract(Request::builder().body(()).unwrap()).await.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_blank_header_is_unauthorized() {
        let request = Request::builder().header(CALLER_HEADER, "  ").body(()).unwrap();
        assert!(extract(request).await.is_err());
    }
}
