//! HTTP request handlers
//!
//! Implements handlers for:
//! - POST /mcp: initialize a session or forward to an existing one
//! - GET /mcp: standalone server-to-client SSE stream
//! - DELETE /mcp: terminate a session
//! - GET /health: liveness probe
//! - GET /: service descriptor

use super::HttpState;
use super::dispatch::{PostDispatch, classify_post, resolve_session};
use super::error::{invalid_session, no_valid_session, parse_error};
use super::session::{PostOutcome, SessionTransport};
use crate::error::TransportError;
use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{
        IntoResponse, Response,
        sse::{Event, KeepAlive, Sse},
    },
};
use futures::StreamExt;
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Header carrying the session identifier
pub const MCP_SESSION_ID_HEADER: &str = "mcp-session-id";

/// Stand-in for a header that is not valid UTF-8; no session ID ever equals it
const UNREADABLE_SESSION_ID: &str = "\u{fffd}";

/// Human-readable name in the service descriptor
pub const SERVICE_DISPLAY_NAME: &str = "MCP Random Name Server";

/// POST /mcp
pub async fn handle_post(
    State(state): State<HttpState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let message: Value = match serde_json::from_slice(&body) {
        Ok(message) => message,
        Err(e) => {
            debug!(error = %e, "Rejecting unparsable request body");
            return parse_error();
        }
    };

    let session_id = session_id_header(&headers);
    match classify_post(&state.sessions, session_id, &message) {
        PostDispatch::Reuse(transport) => forward(&transport, message).await,
        PostDispatch::Initialize => match initialize_session(&state, message).await {
            Ok(response) => response,
            Err(e) => {
                error!(error = %e, "Failed to initialize MCP session");
                e.into_response()
            }
        },
        PostDispatch::Reject => {
            debug!(?session_id, "No valid session for request");
            no_valid_session()
        }
    }
}

/// GET /mcp
pub async fn handle_get(State(state): State<HttpState>, headers: HeaderMap) -> Response {
    let Some(transport) = resolve_session(&state.sessions, session_id_header(&headers)) else {
        return invalid_session();
    };

    match transport.open_stream() {
        Ok(messages) => {
            let events =
                messages.map(|message| Event::default().event("message").json_data(message));
            Sse::new(events)
                .keep_alive(KeepAlive::default())
                .into_response()
        }
        Err(e) => error_response(transport.session_id(), e),
    }
}

/// DELETE /mcp
///
/// The session is unregistered by its close notification before this returns.
pub async fn handle_delete(State(state): State<HttpState>, headers: HeaderMap) -> Response {
    let Some(transport) = resolve_session(&state.sessions, session_id_header(&headers)) else {
        return invalid_session();
    };

    info!(session_id = %transport.session_id(), "Terminating session on client request");
    transport.close().await;
    StatusCode::OK.into_response()
}

/// GET /health
pub async fn health(State(state): State<HttpState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "server": state.server_name.as_ref(),
    }))
}

/// GET /
pub async fn service_info(State(state): State<HttpState>) -> Json<Value> {
    Json(json!({
        "name": SERVICE_DISPLAY_NAME,
        "version": state.version.as_ref(),
        "transport": "Streamable HTTP",
        "endpoints": {
            "mcp": "/mcp",
            "health": "/health",
        },
        "description": "An MCP server that provides a random name tool using Streamable HTTP transport",
    }))
}

/// Read the session header
///
/// An empty value counts as absent; a non-UTF-8 value never matches a session.
fn session_id_header(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(MCP_SESSION_ID_HEADER)
        .filter(|value| !value.is_empty())
        .map(|value| value.to_str().unwrap_or(UNREADABLE_SESSION_ID))
}

async fn forward(transport: &SessionTransport, message: Value) -> Response {
    match transport.handle_post(message).await {
        Ok(outcome) => outcome_response(outcome),
        Err(e) => error_response(transport.session_id(), e),
    }
}

fn outcome_response(outcome: PostOutcome) -> Response {
    match outcome {
        PostOutcome::Response(response) => Json(response).into_response(),
        PostOutcome::Accepted => StatusCode::ACCEPTED.into_response(),
    }
}

fn error_response(session_id: &str, e: TransportError) -> Response {
    if e.status_code().is_server_error() {
        error!(%session_id, error = %e, "Error handling MCP request");
    } else {
        warn!(%session_id, error = %e, "Rejected MCP request");
    }
    e.into_response()
}

/// Mint a session, run the initialize exchange, and publish the session
///
/// The session becomes visible to other requests only after the SDK has
/// answered initialize successfully.
async fn initialize_session(
    state: &HttpState,
    message: Value,
) -> Result<Response, TransportError> {
    let session_id = state.new_session_id();
    let transport = SessionTransport::start(state.new_handler(), session_id.clone());

    let sessions = Arc::clone(&state.sessions);
    let this = Arc::downgrade(&transport);
    transport.on_close(move |id| {
        let removed =
            sessions.unregister_if(id, |bound| std::ptr::eq(Arc::as_ptr(bound), this.as_ptr()));
        if removed.is_some() {
            info!(session_id = %id, "Session removed from registry");
        }
    });

    let response = match transport.handle_post(message).await {
        Ok(PostOutcome::Response(response)) => response,
        Ok(PostOutcome::Accepted) => {
            transport.close().await;
            return Err(TransportError::InvalidMessage(
                "initialize must be a request".to_string(),
            ));
        }
        Err(e) => {
            transport.close().await;
            return Err(e);
        }
    };

    // The SDK refused the handshake; nothing to keep
    if response.get("error").is_some() {
        warn!(%session_id, "Initialize rejected by MCP service");
        transport.close().await;
        return Ok(Json(response).into_response());
    }

    let header = match HeaderValue::from_str(&session_id) {
        Ok(header) => header,
        Err(e) => {
            transport.close().await;
            return Err(TransportError::Http(e.to_string()));
        }
    };

    if let Err(e) = state.sessions.register(session_id.clone(), Arc::clone(&transport)) {
        transport.close().await;
        return Err(e.into());
    }

    // Closed between the response and registration
    if transport.is_closed() {
        state
            .sessions
            .unregister_if(&session_id, |bound| Arc::ptr_eq(bound, &transport));
    }

    info!(%session_id, sessions = state.sessions.len(), "MCP session initialized");

    let mut response = Json(response).into_response();
    response.headers_mut().insert(MCP_SESSION_ID_HEADER, header);
    Ok(response)
}
