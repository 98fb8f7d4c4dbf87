//! Stateful Streamable HTTP transport
//!
//! Serves MCP over HTTP with one server-minted session per client. Each
//! session is bound to its own transport and handler instance; the session
//! registry maps the `mcp-session-id` header to the live transport.

pub mod dispatch;
pub mod error;
pub mod handler;
pub mod registry;
pub mod session;

pub use crate::config::DEFAULT_HTTP_PORT;
pub use dispatch::{PostDispatch, classify_post, is_initialize_request, resolve_session};
pub use handler::MCP_SESSION_ID_HEADER;
pub use registry::SessionRegistry;
pub use session::{PostOutcome, SessionTransport};

use crate::config::{CorsMode, DEFAULT_SERVER_NAME};
use crate::server::RandomNameHandler;
use anyhow::Context;
use axum::{
    Router,
    http::{HeaderName, Method},
    routing::{get, post},
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use uuid::Uuid;

/// Upper bound on the idle reaper tick
const REAPER_MAX_INTERVAL: Duration = Duration::from_secs(30);

type HandlerFactory = dyn Fn() -> RandomNameHandler + Send + Sync;
type IdGenerator = dyn Fn() -> String + Send + Sync;

/// Configuration for the HTTP server
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Address to bind to (e.g., "0.0.0.0:3000")
    pub bind: SocketAddr,
    /// CORS policy
    pub cors: CorsMode,
    /// Close sessions idle for this long (`None` disables the reaper)
    pub idle_timeout: Option<Duration>,
    /// Server name reported by `/health`
    pub server_name: String,
    /// Version reported by the service descriptor
    pub version: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], DEFAULT_HTTP_PORT)),
            cors: CorsMode::default(),
            idle_timeout: None,
            server_name: DEFAULT_SERVER_NAME.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

impl HttpConfig {
    /// Create a new HTTP config with the specified bind address
    pub fn new(bind: SocketAddr) -> Self {
        Self {
            bind,
            ..Default::default()
        }
    }

    /// Create config from host and port strings
    pub fn from_host_port(host: &str, port: u16) -> Result<Self, std::net::AddrParseError> {
        let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
        Ok(Self::new(addr))
    }
}

/// Shared state of the HTTP handlers
#[derive(Clone)]
pub struct HttpState {
    /// Live sessions by ID
    pub sessions: Arc<SessionRegistry<SessionTransport>>,
    factory: Arc<HandlerFactory>,
    id_generator: Arc<IdGenerator>,
    cors: CorsMode,
    server_name: Arc<str>,
    version: Arc<str>,
}

impl HttpState {
    /// Create state with an empty registry and UUID v4 session IDs
    pub fn new<F>(factory: F, config: &HttpConfig) -> Self
    where
        F: Fn() -> RandomNameHandler + Send + Sync + 'static,
    {
        Self {
            sessions: Arc::new(SessionRegistry::new()),
            factory: Arc::new(factory),
            id_generator: Arc::new(|| Uuid::new_v4().to_string()),
            cors: config.cors,
            server_name: config.server_name.as_str().into(),
            version: config.version.as_str().into(),
        }
    }

    /// Replace the session ID generator
    pub fn with_id_generator<G>(mut self, generator: G) -> Self
    where
        G: Fn() -> String + Send + Sync + 'static,
    {
        self.id_generator = Arc::new(generator);
        self
    }

    pub(crate) fn new_session_id(&self) -> String {
        (self.id_generator)()
    }

    pub(crate) fn new_handler(&self) -> RandomNameHandler {
        (self.factory)()
    }
}

/// Build the HTTP router
pub fn router(state: HttpState) -> Router {
    let cors = state.cors;

    let router = Router::new()
        .route(
            "/mcp",
            post(handler::handle_post)
                .get(handler::handle_get)
                .delete(handler::handle_delete),
        )
        .route("/health", get(handler::health))
        .route("/", get(handler::service_info))
        .with_state(state);

    let router = match cors {
        CorsMode::Permissive => router.layer(cors_layer()),
        CorsMode::Disabled => router,
    };

    router
        .layer(TraceLayer::new_for_http())
        .layer(CatchPanicLayer::custom(error::handle_panic))
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers(Any)
        .expose_headers([HeaderName::from_static(MCP_SESSION_ID_HEADER)])
}

/// Run the MCP server using Streamable HTTP transport
///
/// Binds exactly the configured address and serves in the background.
///
/// # Arguments
/// * `handler_factory` - Creates a new handler for each session
/// * `config` - HTTP server configuration
///
/// # Returns
/// A cancellation token that stops the server and closes all sessions
pub async fn run_http<F>(handler_factory: F, config: HttpConfig) -> anyhow::Result<CancellationToken>
where
    F: Fn() -> RandomNameHandler + Send + Sync + 'static,
{
    let (ct, _server) = start_http(handler_factory, config).await?;
    Ok(ct)
}

/// Run the MCP server using Streamable HTTP transport and wait for shutdown
///
/// Stops on Ctrl+C or token cancellation, after every session is closed.
pub async fn run_http_blocking<F>(handler_factory: F, config: HttpConfig) -> anyhow::Result<()>
where
    F: Fn() -> RandomNameHandler + Send + Sync + 'static,
{
    let (ct, server) = start_http(handler_factory, config).await?;

    info!("Press Ctrl+C to stop the server");

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal");
        }
        _ = ct.cancelled() => {
            info!("Server cancelled");
        }
    }

    ct.cancel();
    server.await.context("HTTP server task failed")?;

    info!("HTTP server stopped");
    Ok(())
}

async fn start_http<F>(
    handler_factory: F,
    config: HttpConfig,
) -> anyhow::Result<(CancellationToken, JoinHandle<()>)>
where
    F: Fn() -> RandomNameHandler + Send + Sync + 'static,
{
    let state = HttpState::new(handler_factory, &config);
    let sessions = Arc::clone(&state.sessions);

    let listener = TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("Failed to bind HTTP server to {}", config.bind))?;
    let local_addr = listener.local_addr()?;

    info!("MCP server listening on http://{}", local_addr);
    info!("  MCP endpoint: http://{}/mcp", local_addr);
    info!("  Health check: http://{}/health", local_addr);

    let ct = CancellationToken::new();

    if let Some(timeout) = config.idle_timeout.filter(|timeout| !timeout.is_zero()) {
        info!(timeout_secs = timeout.as_secs(), "Idle session reaper enabled");
        tokio::spawn(reap_idle_sessions(
            Arc::clone(&sessions),
            timeout,
            ct.clone(),
        ));
    }

    let app = router(state);
    let shutdown = ct.clone();
    let server = tokio::spawn(async move {
        let result = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                shutdown.cancelled().await;
                close_all(&sessions).await;
            })
            .await;

        if let Err(e) = result {
            error!(error = %e, "HTTP server failed");
        }
    });

    Ok((ct, server))
}

/// Close every live session
///
/// Open SSE streams end with their session, which lets graceful shutdown finish.
pub async fn close_all(sessions: &SessionRegistry<SessionTransport>) {
    let live = sessions.snapshot();
    if live.is_empty() {
        return;
    }

    info!(count = live.len(), "Closing all sessions");
    futures::future::join_all(live.iter().map(|(_, transport)| transport.close())).await;
}

/// Periodically close sessions without client activity
async fn reap_idle_sessions(
    sessions: Arc<SessionRegistry<SessionTransport>>,
    timeout: Duration,
    ct: CancellationToken,
) {
    let mut ticker = tokio::time::interval(timeout.min(REAPER_MAX_INTERVAL));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ct.cancelled() => break,
            _ = ticker.tick() => {
                for (session_id, transport) in sessions.snapshot() {
                    if transport.idle_for() >= timeout {
                        info!(%session_id, "Closing idle session");
                        transport.close().await;
                    }
                }
            }
        }
    }
}
