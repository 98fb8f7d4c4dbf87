//! Random Name MCP Server
//!
//! A Model Context Protocol server exposing one tool, `get_random_name`,
//! which returns a name picked uniformly from a fixed list.
//!
//! ## Transports
//!
//! - **stdio** - a single client over standard input/output
//! - **Streamable HTTP** - many concurrent clients, each bound to its own
//!   server-minted session and handler instance
//!
//! ## HTTP Endpoints
//!
//! ```text
//! POST   /mcp     initialize a session, or send to an existing one
//! GET    /mcp     server-to-client event stream for a session
//! DELETE /mcp     terminate a session
//! GET    /health  liveness probe
//! GET    /        service descriptor
//! ```
//!
//! The session is carried in the `mcp-session-id` header.
//!
//! ## Example Configuration
//!
//! ```toml
//! [server]
//! transport = "http"
//! port = 3000          # or PORT=3000
//!
//! [session]
//! idle_timeout_secs = 0  # 0 keeps sessions until DELETE or shutdown
//!
//! [logging]
//! level = "info"
//! format = "pretty"
//! ```

pub mod config;
pub mod error;
pub mod logging;
pub mod server;
pub mod tools;
pub mod transport;

// Re-export main types
pub use config::{AppConfig, load_config};
pub use error::{AppError, Result};
pub use server::RandomNameHandler;
