//! Per-session transport for the HTTP variant
//!
//! Each session owns one `RandomNameHandler` served by the MCP SDK over an
//! in-memory pipe carrying newline-delimited JSON-RPC. The SDK does all the
//! protocol work; this type only moves messages between HTTP exchanges and
//! the pipe:
//! - POSTed requests wait for the response with the matching `id`
//! - notifications and client responses are fire-and-forget
//! - everything else the server emits goes to the standalone SSE stream
//!
//! The transport emits exactly one close notification, when the SDK service
//! stops for any reason (explicit close, pipe EOF, failed handshake).

use crate::error::{SessionError, TransportError};
use crate::server::RandomNameHandler;
use futures::channel::mpsc;
use futures::{SinkExt, StreamExt};
use rmcp::ServiceExt;
use rmcp::model::ClientJsonRpcMessage;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::{Duration, Instant};
use tokio::io::{DuplexStream, ReadHalf, WriteHalf};
use tokio::sync::{oneshot, watch};
use tokio_util::codec::{FramedRead, FramedWrite, LinesCodec};
use tracing::{debug, info, warn};

/// Buffer size of the in-memory pipe between HTTP and the SDK service
const PIPE_CAPACITY: usize = 64 * 1024;

/// How long `close` waits for the service to wind down
const CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

type CloseCallback = Box<dyn FnOnce(&str) + Send>;
type Outbound = FramedWrite<WriteHalf<DuplexStream>, LinesCodec>;

/// Result of forwarding one POSTed message
#[derive(Debug, Clone, PartialEq)]
pub enum PostOutcome {
    /// The JSON-RPC response to a request
    Response(Value),
    /// A notification or response was delivered; nothing to return
    Accepted,
}

/// Transport bound 1:1 to one MCP session
pub struct SessionTransport {
    session_id: String,
    /// Client-to-server half of the pipe; `None` once closed
    outbound: tokio::sync::Mutex<Option<Outbound>>,
    /// Requests awaiting a response, keyed by serialized JSON-RPC id
    pending: Mutex<HashMap<String, oneshot::Sender<Value>>>,
    /// Standalone server-to-client stream (GET), at most one
    stream: Mutex<Option<mpsc::UnboundedSender<Value>>>,
    last_activity: Mutex<Instant>,
    on_close: Mutex<Option<CloseCallback>>,
    finished: AtomicBool,
    closed: watch::Sender<bool>,
}

impl SessionTransport {
    /// Start serving `handler` for `session_id`
    ///
    /// Spawns the SDK service task and the outbound reader task. Neither keeps
    /// the transport alive: dropping the last handle ends the session.
    pub fn start(handler: RandomNameHandler, session_id: impl Into<String>) -> Arc<Self> {
        let (server_io, client_io) = tokio::io::duplex(PIPE_CAPACITY);
        let (server_read, server_write) = tokio::io::split(server_io);
        let (client_read, client_write) = tokio::io::split(client_io);
        let (closed, _) = watch::channel(false);

        let transport = Arc::new(Self {
            session_id: session_id.into(),
            outbound: tokio::sync::Mutex::new(Some(FramedWrite::new(
                client_write,
                LinesCodec::new(),
            ))),
            pending: Mutex::new(HashMap::new()),
            stream: Mutex::new(None),
            last_activity: Mutex::new(Instant::now()),
            on_close: Mutex::new(None),
            finished: AtomicBool::new(false),
            closed,
        });

        let session_id = transport.session_id.clone();
        let weak = Arc::downgrade(&transport);
        tokio::spawn(async move {
            match handler.serve((server_read, server_write)).await {
                Ok(running) => match running.waiting().await {
                    Ok(reason) => debug!(%session_id, ?reason, "MCP service stopped"),
                    Err(e) => warn!(%session_id, error = %e, "MCP service task failed"),
                },
                Err(e) => {
                    warn!(%session_id, error = %e, "MCP session ended before initialization")
                }
            }

            if let Some(transport) = weak.upgrade() {
                transport.finish();
            }
        });

        tokio::spawn(read_outgoing(
            Arc::downgrade(&transport),
            FramedRead::new(client_read, LinesCodec::new()),
        ));

        transport
    }

    /// Session ID this transport is bound to
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Whether the close notification has fired
    pub fn is_closed(&self) -> bool {
        self.finished.load(Ordering::SeqCst)
    }

    /// Time since the last client interaction
    pub fn idle_for(&self) -> Duration {
        lock(&self.last_activity).elapsed()
    }

    /// Register the close observer
    ///
    /// Runs exactly once with the session ID; immediately if already closed.
    pub fn on_close<F>(&self, callback: F)
    where
        F: FnOnce(&str) + Send + 'static,
    {
        let mut slot = lock(&self.on_close);
        *slot = Some(Box::new(callback));

        if self.is_closed() {
            let callback = slot.take();
            drop(slot);
            if let Some(callback) = callback {
                callback(&self.session_id);
            }
        }
    }

    /// Forward one POSTed JSON-RPC message to the session
    ///
    /// # Errors
    /// - `InvalidMessage` if the body is not a single decodable JSON-RPC message,
    ///   or reuses the id of a request still awaiting its response
    /// - `ConnectionClosed` if the session ends before answering
    pub async fn handle_post(&self, message: Value) -> Result<PostOutcome, TransportError> {
        self.touch();

        let request_key = match message.as_object() {
            Some(object) => match object.get("id") {
                Some(id) if object.contains_key("method") && !id.is_null() => Some(id_key(id)),
                _ => None,
            },
            None => {
                return Err(TransportError::InvalidMessage(
                    "expected a single JSON-RPC message object".to_string(),
                ));
            }
        };

        // The SDK stops the service on a line it cannot decode, so undecodable
        // messages must never reach the pipe
        if let Err(e) = ClientJsonRpcMessage::deserialize(&message) {
            return Err(TransportError::InvalidMessage(e.to_string()));
        }

        let Some(key) = request_key else {
            self.send(&message).await?;
            return Ok(PostOutcome::Accepted);
        };

        let (tx, rx) = oneshot::channel();
        match lock(&self.pending).entry(key.clone()) {
            Entry::Occupied(_) => {
                return Err(TransportError::InvalidMessage(format!(
                    "request id {} is already in flight",
                    key
                )));
            }
            Entry::Vacant(slot) => {
                slot.insert(tx);
            }
        }

        // finish() sets the flag before draining `pending`, so one of the two sees the other
        if self.is_closed() {
            lock(&self.pending).remove(&key);
            return Err(TransportError::ConnectionClosed);
        }

        if let Err(e) = self.send(&message).await {
            lock(&self.pending).remove(&key);
            return Err(e);
        }

        let response = rx.await.map_err(|_| TransportError::ConnectionClosed)?;
        self.touch();
        Ok(PostOutcome::Response(response))
    }

    /// Open the standalone server-to-client stream
    ///
    /// # Errors
    /// - `StreamConflict` if another stream is still attached
    /// - `ConnectionClosed` if the session has ended
    pub fn open_stream(&self) -> Result<mpsc::UnboundedReceiver<Value>, TransportError> {
        self.touch();

        let mut stream = lock(&self.stream);
        if stream.as_ref().is_some_and(|tx| !tx.is_closed()) {
            return Err(SessionError::StreamConflict(self.session_id.clone()).into());
        }

        let (tx, rx) = mpsc::unbounded();
        *stream = Some(tx);

        if self.is_closed() {
            stream.take();
            return Err(TransportError::ConnectionClosed);
        }

        debug!(session_id = %self.session_id, "Opened server stream");
        Ok(rx)
    }

    /// Terminate the session and wait for the close notification
    ///
    /// When this returns the close observer has run, so the session is
    /// already gone from the registry.
    pub async fn close(&self) {
        let mut closed = self.closed.subscribe();

        // EOF on the pipe stops the SDK service
        self.outbound.lock().await.take();

        if tokio::time::timeout(CLOSE_TIMEOUT, closed.wait_for(|closed| *closed))
            .await
            .is_err()
        {
            warn!(session_id = %self.session_id, "MCP service did not stop in time, closing anyway");
            self.finish();
        }
    }

    async fn send(&self, message: &Value) -> Result<(), TransportError> {
        let line = serde_json::to_string(message)?;
        let mut outbound = self.outbound.lock().await;
        let writer = outbound.as_mut().ok_or(TransportError::ConnectionClosed)?;
        writer.send(line).await?;
        Ok(())
    }

    /// Deliver one message emitted by the SDK service
    fn route_outgoing(&self, line: &str) {
        let message: Value = match serde_json::from_str(line) {
            Ok(message) => message,
            Err(e) => {
                warn!(session_id = %self.session_id, error = %e, "Discarding malformed server message");
                return;
            }
        };

        if let Some(id) = response_id(&message) {
            let waiter = lock(&self.pending).remove(&id_key(id));
            if let Some(waiter) = waiter {
                // The POST may have been abandoned by its client
                let _ = waiter.send(message);
                return;
            }
        }

        let mut stream = lock(&self.stream);
        match stream.as_ref() {
            Some(tx) => {
                if tx.unbounded_send(message).is_err() {
                    debug!(session_id = %self.session_id, "Server stream receiver gone");
                    stream.take();
                }
            }
            None => {
                debug!(session_id = %self.session_id, "No open stream, dropping server message")
            }
        }
    }

    /// Fire the close notification, once
    fn finish(&self) {
        if self.finished.swap(true, Ordering::SeqCst) {
            return;
        }

        lock(&self.pending).clear();
        lock(&self.stream).take();

        let callback = lock(&self.on_close).take();
        if let Some(callback) = callback {
            callback(&self.session_id);
        }

        self.closed.send_replace(true);
        info!(session_id = %self.session_id, "MCP session closed");
    }

    fn touch(&self) {
        *lock(&self.last_activity) = Instant::now();
    }
}

/// Pump messages from the SDK service until the pipe closes
async fn read_outgoing(
    transport: Weak<SessionTransport>,
    mut lines: FramedRead<ReadHalf<DuplexStream>, LinesCodec>,
) {
    while let Some(line) = lines.next().await {
        let Some(transport) = transport.upgrade() else {
            break;
        };

        match line {
            Ok(line) => transport.route_outgoing(&line),
            Err(e) => {
                warn!(session_id = %transport.session_id, error = %e, "Server pipe read failed");
                break;
            }
        }
    }
}

/// The `id` of a JSON-RPC response or error message
fn response_id(message: &Value) -> Option<&Value> {
    let object = message.as_object()?;
    if object.contains_key("method") {
        return None;
    }
    if !object.contains_key("result") && !object.contains_key("error") {
        return None;
    }
    object.get("id")
}

/// Map key for a JSON-RPC id; keeps `1` and `"1"` distinct
fn id_key(id: &Value) -> String {
    id.to_string()
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| {
        warn!("session transport lock poisoned, recovering");
        poisoned.into_inner()
    })
}
