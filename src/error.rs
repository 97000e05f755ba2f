//! Gateway error types with HTTP status code mapping.
//!
//! [`GatewayError`] is the central error type for the gateway. Each variant
//! maps to a specific HTTP status code and structured JSON error response.
//! Authorization failures inside bulk removal are deliberately *not* part
//! of this taxonomy: disallowed targets are filtered out of the batch and
//! logged, never surfaced as an error.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

/// Structured JSON error response body.
///
/// All error responses follow this shape:
/// ```json
/// {
///   "error": {
///     "code": 2101,
///     "message": "already checked in to this event",
///     "details": null
///   }
/// }
/// ```
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with numeric code and human-readable message.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ErrorBody {
    /// Numeric error code (see code ranges on [`GatewayError`]).
    pub code: u32,
    /// Human-readable error message.
    pub message: String,
    /// Optional additional details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Server-side error enum with HTTP status code mapping.
///
/// # Error Code Ranges
///
/// | Range     | Category            | HTTP Status                |
/// |-----------|---------------------|----------------------------|
/// | 1000–1399 | Validation          | 400 Bad Request            |
/// | 1400–1499 | Auth                | 401 / 403                  |
/// | 2000–2099 | Not Found           | 404 Not Found              |
/// | 2100–2199 | State Conflict      | 409 Conflict               |
/// | 3000–3999 | Server              | 500 Internal Server Error  |
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// No user exists for the given email.
    #[error("user not found: {0}")]
    UserNotFound(String),

    /// No event exists for the given id or join token.
    #[error("event not found: {0}")]
    EventNotFound(String),

    /// The caller (or target) is not registered for the event.
    #[error("{0}")]
    RegistrationNotFound(String),

    /// Check-in was attempted on an attendant that has already checked in.
    #[error("already checked in to this event")]
    AlreadyCheckedIn,

    /// Participants cannot be admitted to this event in its current state.
    #[error("event is not open for changes: {0}")]
    EventNotOpen(String),

    /// Admitting the batch would exceed the event's participant ceiling.
    #[error("participant count would exceed the event's maximum")]
    CapacityExceeded,

    /// Self-cancellation is only allowed while the event is still upcoming.
    #[error("only upcoming events can be cancelled")]
    NotUpcoming,

    /// Request validation failed.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The request carries no usable identity.
    #[error("unauthenticated: {0}")]
    Unauthenticated(String),

    /// The caller's role does not permit the operation.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Persistence layer failure.
    #[error("persistence error: {0}")]
    PersistenceError(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::InvalidRequest(_) => 1001,
            Self::Unauthenticated(_) => 1401,
            Self::Forbidden(_) => 1403,
            Self::UserNotFound(_) => 2001,
            Self::EventNotFound(_) => 2002,
            Self::RegistrationNotFound(_) => 2003,
            Self::AlreadyCheckedIn => 2101,
            Self::EventNotOpen(_) => 2102,
            Self::CapacityExceeded => 2103,
            Self::NotUpcoming => 2104,
            Self::PersistenceError(_) => 3001,
            Self::Internal(_) => 3000,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::UserNotFound(_) | Self::EventNotFound(_) | Self::RegistrationNotFound(_) => {
                StatusCode::NOT_FOUND
            }
            Self::AlreadyCheckedIn
            | Self::EventNotOpen(_)
            | Self::CapacityExceeded
            | Self::NotUpcoming => StatusCode::CONFLICT,
            Self::PersistenceError(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.error_code(),
                message: self.to_string(),
                details: None,
            },
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}
