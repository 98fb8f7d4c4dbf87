//! Random Name MCP Server
//!
//! A Model Context Protocol server with a single random name tool.

use clap::Parser;
use mcp_random_name_server::{
    config::{AppConfig, TransportMode, load_config},
    logging::init_logging,
    server::RandomNameHandler,
    transport::{HttpConfig, run_http_blocking, run_stdio},
};
use std::time::Duration;
use tracing::{error, info};

/// Random Name MCP Server - picks a name from a fixed list over MCP
#[derive(Parser, Debug)]
#[command(name = "mcp-random-name-server")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, env = "RANDOM_NAME_MCP_CONFIG")]
    config: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    /// Transport mode (stdio, http)
    #[arg(long)]
    transport: Option<String>,

    /// HTTP server host (for http transport)
    #[arg(long)]
    host: Option<String>,

    /// HTTP server port (for http transport)
    #[arg(long)]
    port: Option<u16>,
}

impl Args {
    /// Apply command-line overrides on top of the loaded configuration
    fn apply(&self, config: &mut AppConfig) -> anyhow::Result<()> {
        if let Some(transport) = self.transport.as_deref() {
            config.server.transport = match transport {
                "stdio" => TransportMode::Stdio,
                "http" => TransportMode::Http,
                other => anyhow::bail!("Unknown transport: {} (expected stdio or http)", other),
            };
        }

        if let Some(host) = &self.host {
            config.server.host = host.clone();
        }

        if let Some(port) = self.port {
            config.server.port = port;
        }

        Ok(())
    }
}

fn http_config(config: &AppConfig) -> anyhow::Result<HttpConfig> {
    let mut http_config = HttpConfig::from_host_port(&config.server.host, config.server.port)?;
    http_config.cors = config.server.cors;
    http_config.server_name = config.server.name.clone();
    http_config.version = config.server.version.clone();
    http_config.idle_timeout = match config.session.idle_timeout_secs {
        0 => None,
        secs => Some(Duration::from_secs(secs)),
    };
    Ok(http_config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let args = Args::parse();

    // Load configuration
    let mut config = load_config(args.config.as_deref())?;
    args.apply(&mut config)?;

    init_logging(&config.logging, args.log_level.as_deref());

    info!(
        version = env!("CARGO_PKG_VERSION"),
        transport = ?config.server.transport,
        "Starting random name MCP server"
    );

    match config.server.transport {
        TransportMode::Stdio => {
            run_stdio(RandomNameHandler::new(&config.server))
                .await
                .inspect_err(|e| error!(error = %e, "Stdio server failed"))?;
        }
        TransportMode::Http => {
            let http_config = http_config(&config)?;
            let server_config = config.server;

            run_http_blocking(move || RandomNameHandler::new(&server_config), http_config)
                .await
                .inspect_err(|e| error!(error = %e, "HTTP server failed"))?;
        }
    }

    Ok(())
}
