//! Request validation utilities

use crate::api::error::{ApiError, ApiResult};

/// Validate that a required string field is not blank
pub fn validate_not_empty(value: &str, field_name: &str) -> ApiResult<()> {
    if value.trim().is_empty() {
        return Err(ApiError::BadRequest(format!("{} cannot be empty", field_name)));
    }
    Ok(())
}
