//! Notes gateway error types.
//!
//! All errors map to HTTP status codes via the `IntoResponse` impl.
//! Authentication failures share one externally visible response; the
//! specific [`AuthError`] kind is only logged server-side.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Message returned for every authentication failure.
pub const UNAUTHENTICATED_MESSAGE: &str = "The access token is invalid or expired";

/// Reasons a request could not be attached to an authenticated identity.
///
/// Every variant is terminal for the current request. None is retried.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum AuthError {
    /// The token cannot be parsed into header, payload and signature.
    #[error("token is malformed")]
    Malformed,

    /// The signature does not match the configured secret.
    #[error("token signature is invalid")]
    InvalidSignature,

    /// `now >= exp`.
    #[error("token has expired")]
    Expired,

    /// The token subject does not resolve to an existing principal.
    #[error("token subject is unknown")]
    UnknownPrincipal,

    /// No Authorization header, or a scheme other than `Bearer`.
    #[error("bearer credential is missing")]
    MissingCredential,
}

impl AuthError {
    /// Bounded label for metrics and logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            AuthError::Malformed => "malformed",
            AuthError::InvalidSignature => "invalid_signature",
            AuthError::Expired => "expired",
            AuthError::UnknownPrincipal => "unknown_principal",
            AuthError::MissingCredential => "missing_credential",
        }
    }
}

/// Notes gateway error type.
///
/// Maps to HTTP status codes:
/// - Unauthenticated, InvalidCredentials: 401 Unauthorized
/// - Throttled: 429 Too Many Requests
/// - BadRequest: 400 Bad Request
/// - NotFound: 404 Not Found
/// - Conflict: 409 Conflict
/// - Internal: 500 Internal Server Error
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Unauthenticated: {0}")]
    Unauthenticated(AuthError),

    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Rate limit exceeded")]
    Throttled { retry_after_secs: u64 },

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            GatewayError::Unauthenticated(_) | GatewayError::InvalidCredentials => 401,
            GatewayError::Throttled { .. } => 429,
            GatewayError::BadRequest(_) => 400,
            GatewayError::NotFound(_) => 404,
            GatewayError::Conflict(_) => 409,
            GatewayError::Internal(_) => 500,
        }
    }
}

impl From<AuthError> for GatewayError {
    fn from(err: AuthError) -> Self {
        GatewayError::Unauthenticated(err)
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            GatewayError::Unauthenticated(kind) => {
                tracing::debug!(target: "gateway.errors", reason = kind.as_label(), "Authentication failed");
                (
                    StatusCode::UNAUTHORIZED,
                    "UNAUTHENTICATED",
                    UNAUTHENTICATED_MESSAGE.to_string(),
                )
            }
            GatewayError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                "INVALID_CREDENTIALS",
                "Invalid username or password".to_string(),
            ),
            GatewayError::Throttled { .. } => (
                StatusCode::TOO_MANY_REQUESTS,
                "RATE_LIMIT_EXCEEDED",
                "Too many requests. Please try again later.".to_string(),
            ),
            GatewayError::BadRequest(reason) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", reason.clone()),
            GatewayError::NotFound(resource) => (StatusCode::NOT_FOUND, "NOT_FOUND", resource.clone()),
            GatewayError::Conflict(reason) => (StatusCode::CONFLICT, "CONFLICT", reason.clone()),
            GatewayError::Internal(err) => {
                // Log actual error server-side, return generic message to client
                tracing::error!(target: "gateway.errors", error = %err, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let error_response = ErrorResponse {
            error: ErrorDetail {
                code: code.to_string(),
                message,
            },
        };

        let mut response = (status, Json(error_response)).into_response();

        match &self {
            GatewayError::Unauthenticated(_) => {
                response.headers_mut().insert(
                    header::WWW_AUTHENTICATE,
                    HeaderValue::from_static("Bearer realm=\"notes-api\", error=\"invalid_token\""),
                );
            }
            GatewayError::Throttled { retry_after_secs } => {
                response
                    .headers_mut()
                    .insert(header::RETRY_AFTER, HeaderValue::from(*retry_after_secs));
            }
            _ => {}
        }

        response
    }
}
