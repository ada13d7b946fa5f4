//! Gateway error types with wire and HTTP status code mapping.
//!
//! [`GatewayError`] is the central error type for the gateway. Every failure
//! is scoped to the single session that hit it: over WebSocket the error is
//! turned into an `error` frame, over HTTP into a structured JSON body.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

/// Structured JSON error response body.
///
/// All HTTP error responses follow this shape:
/// ```json
/// {
///   "error": {
///     "code": 3001,
///     "kind": "store_failure",
///     "message": "delivery failed"
///   }
/// }
/// ```
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with numeric code, kind and human-readable message.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Numeric error code.
    pub code: u32,
    /// Error kind discriminator (see [`ErrorKind`]).
    pub kind: ErrorKind,
    /// Human-readable error message.
    pub message: String,
}

/// Failure taxonomy clients can branch on instead of message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Malformed frame, or a frame type not allowed in the current state.
    ProtocolViolation,
    /// Bad or unknown token.
    AuthFailure,
    /// Unknown recipient.
    NotFound,
    /// Request fields failed validation.
    Validation,
    /// Persistence or query error in a collaborator.
    StoreFailure,
    /// Read or write error on the channel.
    TransportFailure,
    /// The session was replaced by a newer one for the same user.
    Superseded,
    /// Unexpected server-side failure.
    Internal,
}

/// Server-side error enum with wire kind and HTTP status code mapping.
///
/// # Error Code Ranges
///
/// | Range     | Category              | HTTP Status               |
/// |-----------|-----------------------|---------------------------|
/// | 1000–1999 | Protocol / Validation | 400 Bad Request           |
/// | 2000–2999 | Auth / Not Found      | 401 / 404 / 409           |
/// | 3000–3999 | Server / Store        | 500 / 503                 |
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Frame could not be decoded or is not allowed in the current state.
    #[error("{0}")]
    ProtocolViolation(String),

    /// Token verification failed.
    #[error("authentication failed: {0}")]
    AuthFailure(String),

    /// Recipient or resource does not exist.
    #[error("{0}")]
    NotFound(String),

    /// Request validation failed.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Persistence layer failure. The inner string is the internal cause and
    /// is never sent to clients.
    #[error("store failure: {0}")]
    StoreFailure(String),

    /// Read or write error on the session channel.
    #[error("transport failure: {0}")]
    TransportFailure(String),

    /// Session replaced by a newer authenticated session of the same user.
    #[error("session superseded by a newer connection")]
    Superseded,

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::ProtocolViolation(_) => 1001,
            Self::InvalidRequest(_) => 1002,
            Self::AuthFailure(_) => 2001,
            Self::NotFound(_) => 2002,
            Self::Superseded => 2003,
            Self::Internal(_) => 3000,
            Self::StoreFailure(_) => 3001,
            Self::TransportFailure(_) => 3002,
        }
    }

    /// Returns the taxonomy kind for this variant.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::ProtocolViolation(_) => ErrorKind::ProtocolViolation,
            Self::InvalidRequest(_) => ErrorKind::Validation,
            Self::AuthFailure(_) => ErrorKind::AuthFailure,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Superseded => ErrorKind::Superseded,
            Self::StoreFailure(_) => ErrorKind::StoreFailure,
            Self::TransportFailure(_) => ErrorKind::TransportFailure,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::ProtocolViolation(_) | Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::AuthFailure(_) => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Superseded => StatusCode::CONFLICT,
            Self::StoreFailure(_) | Self::TransportFailure(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message that is safe to hand to a client.
    ///
    /// Store and internal causes are logged server-side only.
    #[must_use]
    pub fn client_message(&self) -> String {
        match self {
            Self::StoreFailure(_) => "store unavailable".to_string(),
            Self::Internal(_) => "internal error".to_string(),
            other => other.to_string(),
        }
    }
}

impl From<sqlx::Error> for GatewayError {
    fn from(err: sqlx::Error) -> Self {
        Self::StoreFailure(err.to_string())
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.error_code(),
                kind: self.kind(),
                message: self.client_message(),
            },
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}
