//! Logging setup
//!
//! All output goes to stderr: in stdio mode stdout belongs to the protocol.

use crate::config::{LogFormat, LoggingConfig};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Build the level filter. `RUST_LOG` wins, then the CLI override, then the config.
pub fn build_filter(config: &LoggingConfig, level_override: Option<&str>) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level_override.unwrap_or(&config.level)))
}

/// Install the global tracing subscriber
pub fn init_logging(config: &LoggingConfig, level_override: Option<&str>) {
    let filter = build_filter(config, level_override);

    match config.format {
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(fmt::layer().with_writer(std::io::stderr))
            .with(filter)
            .init(),
        LogFormat::Json => tracing_subscriber::registry()
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .with(filter)
            .init(),
    }
}
