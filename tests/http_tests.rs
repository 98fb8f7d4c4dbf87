//! Streamable HTTP transport tests
//!
//! Exercises the router in-process with `tower::ServiceExt::oneshot`; no
//! listener is bound.

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Method, Request, StatusCode, header};
use axum::response::Response;
use mcp_random_name_server::config::{CorsMode, ServerConfig};
use mcp_random_name_server::server::RandomNameHandler;
use mcp_random_name_server::tools::RANDOM_NAMES;
use mcp_random_name_server::transport::http::{
    HttpConfig, HttpState, MCP_SESSION_ID_HEADER, router,
};
use serde_json::{Value, json};
use std::collections::HashSet;
use tower::ServiceExt;

fn state() -> HttpState {
    HttpState::new(
        || RandomNameHandler::new(&ServerConfig::default()),
        &HttpConfig::default(),
    )
}

fn initialize_body(id: i64) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": "initialize",
        "params": {
            "protocolVersion": "2025-03-26",
            "capabilities": {},
            "clientInfo": {"name": "http-test", "version": "1.0.0"}
        }
    })
}

fn tool_call_body(id: i64) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": "tools/call",
        "params": {"name": "get_random_name", "arguments": {}}
    })
}

async fn send(app: &Router, method: Method, session: Option<&str>, body: Body) -> Response {
    let mut request = Request::builder()
        .method(method)
        .uri("/mcp")
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::ACCEPT, "application/json, text/event-stream");
    if let Some(session) = session {
        request = request.header(MCP_SESSION_ID_HEADER, session);
    }

    app.clone()
        .oneshot(request.body(body).unwrap())
        .await
        .unwrap()
}

async fn post(app: &Router, session: Option<&str>, body: Value) -> Response {
    send(app, Method::POST, session, Body::from(body.to_string())).await
}

async fn get_path(app: &Router, path: &str) -> Response {
    app.clone()
        .oneshot(Request::get(path).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

async fn body_bytes(response: Response) -> Vec<u8> {
    to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

async fn body_json(response: Response) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

/// Run initialize plus the initialized notification; returns the session ID
async fn open_session(app: &Router) -> String {
    let response = post(app, None, initialize_body(0)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let session_id = response
        .headers()
        .get(MCP_SESSION_ID_HEADER)
        .expect("initialize response must carry a session ID")
        .to_str()
        .unwrap()
        .to_string();

    let body = body_json(response).await;
    assert_eq!(body["id"], 0);
    assert_eq!(body["result"]["serverInfo"]["name"], "mcp-random-name-server");

    let response = post(
        app,
        Some(&session_id),
        json!({"jsonrpc": "2.0", "method": "notifications/initialized"}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);

    session_id
}

fn assert_error_envelope(body: &Value, code: i64) {
    assert_eq!(body["jsonrpc"], "2.0");
    assert_eq!(body["error"]["code"], code);
    assert!(body["id"].is_null());
}

#[tokio::test]
async fn test_post_without_session_rejected() {
    let app = router(state());

    let response = post(&app, None, tool_call_body(1)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    assert_error_envelope(&body, -32000);
    assert_eq!(
        body["error"]["message"],
        "Bad Request: No valid session ID provided"
    );
}

#[tokio::test]
async fn test_post_with_unknown_session_rejected() {
    let app = router(state());

    let response = post(&app, Some("unknown"), tool_call_body(1)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_error_envelope(&body_json(response).await, -32000);

    // An initialize body does not rescue an unknown session ID
    let response = post(&app, Some("unknown"), initialize_body(1)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_error_envelope(&body_json(response).await, -32000);
}

#[tokio::test]
async fn test_post_unparsable_body() {
    let app = router(state());

    let response = send(&app, Method::POST, None, Body::from("{not json")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_error_envelope(&body_json(response).await, -32700);
}

#[tokio::test]
async fn test_get_and_delete_require_session() {
    let app = router(state());

    for method in [Method::GET, Method::DELETE] {
        for session in [None, Some("unknown")] {
            let response = send(&app, method.clone(), session, Body::empty()).await;
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
            assert_eq!(
                body_bytes(response).await,
                b"Invalid or missing session ID".to_vec()
            );
        }
    }
}

#[tokio::test]
async fn test_session_lifecycle() {
    let state = state();
    let app = router(state.clone());

    let session_id = open_session(&app).await;
    assert_eq!(state.sessions.len(), 1);
    assert!(state.sessions.lookup(&session_id).is_some());

    // Tool call within the session
    let response = post(&app, Some(&session_id), tool_call_body(2)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["id"], 2);
    let name = body["result"]["content"][0]["text"].as_str().unwrap();
    assert!(RANDOM_NAMES.contains(&name));

    // Terminate; the session is gone before DELETE returns
    let response = send(&app, Method::DELETE, Some(&session_id), Body::empty()).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(state.sessions.lookup(&session_id).is_none());
    assert!(state.sessions.is_empty());

    let response = post(&app, Some(&session_id), tool_call_body(3)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_error_envelope(&body_json(response).await, -32000);

    let response = send(&app, Method::DELETE, Some(&session_id), Body::empty()).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_tools_list_over_http() {
    let app = router(state());
    let session_id = open_session(&app).await;

    let response = post(
        &app,
        Some(&session_id),
        json!({"jsonrpc": "2.0", "id": "list", "method": "tools/list"}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["id"], "list");
    let tools = body["result"]["tools"].as_array().unwrap();
    assert_eq!(tools.len(), 1);
    assert_eq!(tools[0]["name"], "get_random_name");
}

#[tokio::test]
async fn test_concurrent_initializations_get_distinct_ids() {
    let state = state();
    let app = router(state.clone());

    let responses = futures::future::join_all(
        (0..10).map(|id| post(&app, None, initialize_body(id))),
    )
    .await;

    let ids: HashSet<String> = responses
        .iter()
        .map(|response| {
            assert_eq!(response.status(), StatusCode::OK);
            response.headers()[MCP_SESSION_ID_HEADER]
                .to_str()
                .unwrap()
                .to_string()
        })
        .collect();

    assert_eq!(ids.len(), 10);
    assert_eq!(state.sessions.len(), 10);
}

#[tokio::test]
async fn test_sessions_are_isolated() {
    let state = state();
    let app = router(state.clone());

    let first = open_session(&app).await;
    let second = open_session(&app).await;
    assert_ne!(first, second);

    let response = send(&app, Method::DELETE, Some(&first), Body::empty()).await;
    assert_eq!(response.status(), StatusCode::OK);

    // The other session keeps working
    let response = post(&app, Some(&second), tool_call_body(5)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(state.sessions.ids(), vec![second]);
}

#[tokio::test]
async fn test_custom_session_id_generator() {
    let app = router(state().with_id_generator(|| "session-under-test".to_string()));

    let session_id = open_session(&app).await;
    assert_eq!(session_id, "session-under-test");
}

#[tokio::test]
async fn test_batch_body_rejected() {
    let app = router(state());
    let session_id = open_session(&app).await;

    let response = post(&app, Some(&session_id), json!([tool_call_body(6)])).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_error_envelope(&body_json(response).await, -32600);
}

#[tokio::test]
async fn test_undecodable_message_leaves_session_usable() {
    let state = state();
    let app = router(state.clone());
    let session_id = open_session(&app).await;

    for message in [
        json!({"jsonrpc": "2.0", "id": 5, "method": "tools/call", "params": "x"}),
        json!({"foo": 1}),
    ] {
        let response = post(&app, Some(&session_id), message).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_error_envelope(&body_json(response).await, -32600);
    }

    assert!(state.sessions.lookup(&session_id).is_some());
    let response = post(&app, Some(&session_id), tool_call_body(7)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["id"], 7);
    assert!(RANDOM_NAMES.contains(&body["result"]["content"][0]["text"].as_str().unwrap()));
}

#[tokio::test]
async fn test_empty_session_header_starts_new_session() {
    let state = state();
    let app = router(state.clone());

    let response = post(&app, Some(""), initialize_body(1)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let session_id = response.headers()[MCP_SESSION_ID_HEADER]
        .to_str()
        .unwrap()
        .to_string();
    assert!(!session_id.is_empty());
    assert!(state.sessions.lookup(&session_id).is_some());

    let response = post(&app, Some(""), tool_call_body(2)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_error_envelope(&body_json(response).await, -32000);
}

#[tokio::test]
async fn test_get_opens_single_event_stream() {
    let app = router(state());
    let session_id = open_session(&app).await;

    let stream = send(&app, Method::GET, Some(&session_id), Body::empty()).await;
    assert_eq!(stream.status(), StatusCode::OK);
    assert!(
        stream.headers()[header::CONTENT_TYPE]
            .to_str()
            .unwrap()
            .starts_with("text/event-stream")
    );

    let second = send(&app, Method::GET, Some(&session_id), Body::empty()).await;
    assert_eq!(second.status(), StatusCode::CONFLICT);

    // Terminating the session ends the open stream
    let response = send(&app, Method::DELETE, Some(&session_id), Body::empty()).await;
    assert_eq!(response.status(), StatusCode::OK);
    tokio::time::timeout(std::time::Duration::from_secs(5), body_bytes(stream))
        .await
        .expect("event stream should end with its session");
}

#[tokio::test]
async fn test_handler_panic_becomes_internal_error() {
    let app = router(HttpState::new(
        || panic!("handler construction failed"),
        &HttpConfig::default(),
    ));

    let response = post(&app, None, initialize_body(1)).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body = body_json(response).await;
    assert_error_envelope(&body, -32603);
    assert_eq!(body["error"]["message"], "Internal server error");
}

#[tokio::test]
async fn test_health() {
    let app = router(state());

    let response = get_path(&app, "/health").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await,
        json!({"status": "ok", "server": "mcp-random-name-server"})
    );
}

#[tokio::test]
async fn test_service_descriptor() {
    let app = router(state());

    let response = get_path(&app, "/").await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["name"], "MCP Random Name Server");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    assert_eq!(body["transport"], "Streamable HTTP");
    assert_eq!(body["endpoints"], json!({"mcp": "/mcp", "health": "/health"}));
    assert!(body["description"].as_str().unwrap().contains("random name"));
}

#[tokio::test]
async fn test_cors_exposes_session_header() {
    let app = router(state());

    let request = Request::post("/mcp")
        .header(header::ORIGIN, "http://localhost:5173")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(initialize_body(1).to_string()))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    assert!(
        response.headers()[header::ACCESS_CONTROL_EXPOSE_HEADERS]
            .to_str()
            .unwrap()
            .contains(MCP_SESSION_ID_HEADER)
    );
}

#[tokio::test]
async fn test_cors_disabled() {
    let config = HttpConfig {
        cors: CorsMode::Disabled,
        ..HttpConfig::default()
    };
    let app = router(HttpState::new(
        || RandomNameHandler::new(&ServerConfig::default()),
        &config,
    ));

    let request = Request::get("/health")
        .header(header::ORIGIN, "http://localhost:5173")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert!(
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .is_none()
    );
}
