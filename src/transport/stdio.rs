//! Stdio transport
//!
//! Runs the MCP server over standard input/output.

use crate::server::RandomNameHandler;
use rmcp::ServiceExt;
use rmcp::transport::io::stdio;
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::info;

/// Run the MCP server using stdio transport
pub async fn run_stdio(handler: RandomNameHandler) -> anyhow::Result<()> {
    info!("Starting random name MCP server with stdio transport");

    let (stdin, stdout) = stdio();
    serve_io(handler, stdin, stdout).await?;

    info!("Random name MCP server stopped");
    Ok(())
}

/// Serve one handler over an arbitrary byte stream pair until the peer disconnects
///
/// Messages are newline-delimited JSON-RPC, framed by the SDK.
pub async fn serve_io<R, W>(handler: RandomNameHandler, reader: R, writer: W) -> anyhow::Result<()>
where
    R: AsyncRead + Send + Unpin + 'static,
    W: AsyncWrite + Send + Unpin + 'static,
{
    let server = handler.serve((reader, writer)).await?;

    let reason = server.waiting().await?;
    info!(?reason, "MCP connection closed");

    Ok(())
}
