//! Error types for the cache layer and its HTTP surfaces
//!
//! `CacheError` covers faults raised inside the entry store. The cache manager
//! absorbs these so they never reach a request; `ApiError` is what handlers
//! return to clients.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// == Cache Error Enum ==
/// Faults raised by the entry store.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Key is empty or exceeds the maximum length
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// Serialized value exceeds the per-entry size limit
    #[error("Value of {size} bytes exceeds maximum size of {max} bytes")]
    ValueTooLarge { size: usize, max: usize },

    /// Value could not be serialized
    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Store is at capacity and nothing could be evicted
    #[error("Cache full: {0}")]
    CacheFull(String),
}

/// Convenience Result type for store operations.
pub type Result<T> = std::result::Result<T, CacheError>;

// == API Error Enum ==
/// Errors surfaced to HTTP clients.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Requested document does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Malformed request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Anything the caller cannot fix
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<CacheError> for ApiError {
    fn from(err: CacheError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::Internal(err.to_string())
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "success": false,
            "message": self.to_string(),
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_too_large_message() {
        let err = CacheError::ValueTooLarge { size: 10, max: 5 };
        assert_eq!(
            err.to_string(),
            "Value of 10 bytes exceeds maximum size of 5 bytes"
        );
    }

    #[test]
    fn test_api_error_status_codes() {
        let resp = ApiError::NotFound("projects/9".into()).into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let resp = ApiError::InvalidRequest("bad body".into()).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let resp = ApiError::from(CacheError::CacheFull("no room".into())).into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
