//! Error types for gtrk-map

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Errors from fetching Groupie Trackers data
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Network error for {url}: {message}")]
    Network { url: String, message: String },

    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    #[error("Parse error for {url}: {message}")]
    Parse { url: String, message: String },

    /// Local proxy and remote API both failed
    #[error("Proxy failed ({proxy}); remote failed ({remote})")]
    BothSourcesFailed {
        proxy: Box<FetchError>,
        remote: Box<FetchError>,
    },

    #[error("Failed to build HTTP client: {0}")]
    Client(String),
}

/// API error type for the view server
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Upstream data unavailable (502)
    #[error(transparent)]
    Upstream(#[from] FetchError),

    /// gtrk-common error
    #[error("Common error: {0}")]
    Common(#[from] gtrk_common::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::Upstream(ref err) => (StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR", err.to_string()),
            ApiError::Common(ref err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                err.to_string(),
            ),
        };

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
