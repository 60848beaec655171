//! Hub error types with HTTP status code mapping.
//!
//! [`HubError`] is the central error type of the crate. Ordinary transport
//! failures never surface here: the send path folds them into `chat`'s
//! boolean and `broadcast`'s eviction count. What remains are caller
//! mistakes on the hosting surface and configuration problems.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::ConnectionId;

/// Structured JSON error response body.
///
/// All error responses follow this shape:
/// ```json
/// {
///   "error": {
///     "code": 2001,
///     "message": "connection not found: 7f1c..."
///   }
/// }
/// ```
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with numeric code and human-readable message.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Numeric error code.
    pub code: u32,
    /// Human-readable error message.
    pub message: String,
}

/// Crate-level error enum.
///
/// # Error Code Ranges
///
/// | Range     | Category        | HTTP Status                  |
/// |-----------|-----------------|------------------------------|
/// | 1000–1999 | Validation      | 400 Bad Request              |
/// | 2000–2999 | State/Not Found | 404 Not Found / 409 Conflict |
/// | 3000–3999 | Server          | 500 Internal Server Error    |
#[derive(Debug, thiserror::Error)]
pub enum HubError {
    /// No live connection with the given id.
    #[error("connection not found: {0}")]
    ConnectionNotFound(ConnectionId),

    /// The connection's init data was already set.
    #[error("init data already set for connection {0}")]
    InitDataAlreadySet(ConnectionId),

    /// Request validation failed.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Configuration could not be loaded.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl HubError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::InvalidRequest(_) => 1001,
            Self::ConnectionNotFound(_) => 2001,
            Self::InitDataAlreadySet(_) => 2002,
            Self::Config(_) => 3001,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::ConnectionNotFound(_) => StatusCode::NOT_FOUND,
            Self::InitDataAlreadySet(_) => StatusCode::CONFLICT,
            Self::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for HubError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.error_code(),
                message: self.to_string(),
            },
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}
