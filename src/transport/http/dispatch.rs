//! Request classification for the `/mcp` endpoint
//!
//! Decides what to do with an inbound request before any transport is touched.

use super::registry::SessionRegistry;
use serde_json::Value;
use std::sync::Arc;

/// What a POST to `/mcp` should do
pub enum PostDispatch<T> {
    /// The request belongs to a live session
    Reuse(Arc<T>),
    /// No session yet and the body is an initialize request: mint a new session
    Initialize,
    /// Missing or unknown session on a non-initialize request
    Reject,
}

impl<T> std::fmt::Debug for PostDispatch<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PostDispatch::Reuse(_) => write!(f, "Reuse"),
            PostDispatch::Initialize => write!(f, "Initialize"),
            PostDispatch::Reject => write!(f, "Reject"),
        }
    }
}

/// Classify a POST by its session header and body
///
/// An empty session ID is treated as no session ID.
pub fn classify_post<T>(
    registry: &SessionRegistry<T>,
    session_id: Option<&str>,
    body: &Value,
) -> PostDispatch<T> {
    match session_id.filter(|id| !id.is_empty()) {
        Some(id) => match registry.lookup(id) {
            Some(transport) => PostDispatch::Reuse(transport),
            None => PostDispatch::Reject,
        },
        None if is_initialize_request(body) => PostDispatch::Initialize,
        None => PostDispatch::Reject,
    }
}

/// Resolve the session a GET or DELETE refers to
pub fn resolve_session<T>(
    registry: &SessionRegistry<T>,
    session_id: Option<&str>,
) -> Option<Arc<T>> {
    session_id
        .filter(|id| !id.is_empty())
        .and_then(|id| registry.lookup(id))
}

/// Whether `body` is a well-formed MCP `initialize` request
///
/// Requires a request ID plus the mandatory `protocolVersion`, `capabilities`
/// and `clientInfo` parameters.
pub fn is_initialize_request(body: &Value) -> bool {
    let Some(message) = body.as_object() else {
        return false;
    };

    if message.get("method").and_then(Value::as_str) != Some("initialize") {
        return false;
    }

    if message.get("id").is_none_or(Value::is_null) {
        return false;
    }

    let Some(params) = message.get("params").and_then(Value::as_object) else {
        return false;
    };

    let client_info = params.get("clientInfo");
    params.get("protocolVersion").is_some_and(Value::is_string)
        && params.get("capabilities").is_some_and(Value::is_object)
        && client_info
            .and_then(|info| info.get("name"))
            .is_some_and(Value::is_string)
        && client_info
            .and_then(|info| info.get("version"))
            .is_some_and(Value::is_string)
}
