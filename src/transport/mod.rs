//! Transport module
//!
//! Provides the stdio and stateful Streamable HTTP variants of the server.

pub mod http;
pub mod stdio;

pub use http::{DEFAULT_HTTP_PORT, HttpConfig, HttpState, router, run_http, run_http_blocking};
pub use stdio::{run_stdio, serve_io};
