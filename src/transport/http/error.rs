//! HTTP transport error handling
//!
//! Converts transport failures and rejected requests to JSON-RPC error
//! envelopes with the matching HTTP status codes. Rejections happen before
//! any request is read, so every envelope carries a null `id`.

use crate::error::{SessionError, TransportError};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::{Value, json};
use std::any::Any;
use tracing::error;

/// JSON-RPC implementation-defined server error (session and stream conflicts)
pub const SERVER_ERROR: i64 = -32000;
/// JSON-RPC: the body is not a valid request object
pub const INVALID_REQUEST: i64 = -32600;
/// JSON-RPC: internal error
pub const INTERNAL_ERROR: i64 = -32603;
/// JSON-RPC: the body is not valid JSON
pub const PARSE_ERROR: i64 = -32700;

/// Plain-text body for GET/DELETE without a live session
pub const INVALID_SESSION_MESSAGE: &str = "Invalid or missing session ID";

/// Build a JSON-RPC error envelope with a null id
pub fn error_envelope(code: i64, message: &str) -> Value {
    json!({
        "jsonrpc": "2.0",
        "error": {
            "code": code,
            "message": message,
        },
        "id": null,
    })
}

/// 400 for a POST that neither belongs to a session nor initializes one
pub fn no_valid_session() -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(error_envelope(
            SERVER_ERROR,
            "Bad Request: No valid session ID provided",
        )),
    )
        .into_response()
}

/// 500 for any unexpected failure while dispatching
pub fn internal_error() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(error_envelope(INTERNAL_ERROR, "Internal server error")),
    )
        .into_response()
}

/// 400 for a body that is not JSON
pub fn parse_error() -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(error_envelope(PARSE_ERROR, "Parse error")),
    )
        .into_response()
}

/// 400 plain text for GET/DELETE without a live session
pub fn invalid_session() -> Response {
    (StatusCode::BAD_REQUEST, INVALID_SESSION_MESSAGE).into_response()
}

/// Response for a panic caught by the panic layer
pub fn handle_panic(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");

    error!(panic = %detail, "Request handler panicked");
    internal_error()
}

impl TransportError {
    /// Get HTTP status code for error
    pub fn status_code(&self) -> StatusCode {
        match self {
            TransportError::InvalidMessage(_) => StatusCode::BAD_REQUEST,
            TransportError::Session(SessionError::StreamConflict(_)) => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Convert to a JSON-RPC error envelope
    ///
    /// Internal details stay in the logs.
    pub fn to_envelope(&self) -> Value {
        match self {
            TransportError::InvalidMessage(_) => error_envelope(INVALID_REQUEST, "Invalid Request"),
            TransportError::Session(SessionError::StreamConflict(_)) => error_envelope(
                SERVER_ERROR,
                "Conflict: Only one SSE stream is allowed per session",
            ),
            _ => error_envelope(INTERNAL_ERROR, "Internal server error"),
        }
    }
}

impl IntoResponse for TransportError {
    fn into_response(self) -> Response {
        (self.status_code(), Json(self.to_envelope())).into_response()
    }
}
