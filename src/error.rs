//! Error types and response handling shared by the gate and the proxy.
//!
//! Provides structured error classification, HTTP status code mapping,
//! and JSON error response generation.

use axum::body::Body;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Errors returned to a caller of the gate or the proxy.
#[derive(Debug, Error)]
pub enum GateError {
    /// Missing or wrong API key
    #[error("Unauthorized")]
    Unauthorized,

    /// Missing or malformed input
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Query matched a denylist rule and was never executed
    #[error("Query rejected by gatekeeper (rule '{rule}')")]
    QueryRejected { rule: String },

    /// Unknown routing mode; the current mode is unchanged
    #[error("Invalid mode '{mode}'")]
    InvalidMode { mode: String },

    /// Could not reach or connect to the resolved backend
    #[error("Backend '{backend}' unavailable: {reason}")]
    BackendUnavailable { backend: String, reason: String },

    /// The backend ran the statement and reported an error
    #[error("Execution failed on '{backend}': {message}")]
    Execution { backend: String, message: String },

    /// The gate could not talk to the proxy
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// Error document returned by the proxy, relayed as-is
    #[error("Proxy returned {status}")]
    Proxied {
        status: u16,
        body: serde_json::Value,
    },

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl GateError {
    /// Map error variant to appropriate HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            GateError::Unauthorized => StatusCode::FORBIDDEN,
            GateError::BadRequest(_) => StatusCode::BAD_REQUEST,
            GateError::QueryRejected { .. } => StatusCode::BAD_REQUEST,
            GateError::InvalidMode { .. } => StatusCode::BAD_REQUEST,
            GateError::BackendUnavailable { .. } => StatusCode::BAD_GATEWAY,
            GateError::Execution { .. } => StatusCode::BAD_GATEWAY,
            GateError::Upstream(_) => StatusCode::BAD_GATEWAY,
            GateError::Proxied { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            GateError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get error type string for JSON responses
    pub fn error_type(&self) -> &'static str {
        match self {
            GateError::Unauthorized => "unauthorized",
            GateError::BadRequest(_) => "bad_request",
            GateError::QueryRejected { .. } => "query_rejected",
            GateError::InvalidMode { .. } => "invalid_mode",
            GateError::BackendUnavailable { .. } => "backend_unavailable",
            GateError::Execution { .. } => "execution_error",
            GateError::Upstream(_) => "upstream_error",
            GateError::Proxied { .. } => "proxied_error",
            GateError::Internal(_) => "internal_error",
        }
    }
}

/// Builder for standardized error responses
pub struct ErrorResponse;

impl ErrorResponse {
    /// Create a JSON error response from a GateError
    pub fn from_error(err: &GateError, request_id: &str) -> Response {
        let body = Self::body(err, request_id);

        let mut response = Response::new(Body::from(body.to_string()));
        *response.status_mut() = err.status_code();
        response.headers_mut().insert(
            axum::http::header::CONTENT_TYPE,
            axum::http::HeaderValue::from_static("application/json"),
        );
        response
    }
}

impl ErrorResponse {
    /// The `{"error": {type, message, request_id}}` document for `err`.
    /// A proxied error keeps the body the proxy sent.
    pub fn body(err: &GateError, request_id: &str) -> serde_json::Value {
        match err {
            GateError::Proxied { body, .. } => body.clone(),
            _ => serde_json::json!({
                "error": {
                    "type": err.error_type(),
                    "message": err.to_string(),
                    "request_id": request_id
                }
            }),
        }
    }
}

impl IntoResponse for GateError {
    fn into_response(self) -> Response {
        let request_id = uuid::Uuid::new_v4().to_string();
        ErrorResponse::from_error(&self, &request_id)
    }
}
