//! Configuration loader with layered sources
//!
//! Loads configuration from multiple sources with the following precedence
//! (highest to lowest):
//! 1. The `PORT` environment variable (HTTP port only)
//! 2. Environment variables (RANDOM_NAME_MCP_*)
//! 3. Configuration file (TOML)
//! 4. Default values

use crate::config::types::AppConfig;
use crate::error::ConfigError;
use config::{Config, ConfigBuilder, Environment, File, FileFormat, builder::DefaultState};
use std::path::Path;

/// Default configuration file paths to check (in order)
const DEFAULT_CONFIG_PATHS: &[&str] = &[
    "mcp-random-name-server.toml",
    ".mcp-random-name-server.toml",
    "~/.config/mcp-random-name-server/config.toml",
];

/// Environment variable carrying the HTTP port
const PORT_ENV_VAR: &str = "PORT";

/// Load configuration from a TOML string (useful for testing)
pub fn load_config_from_str(toml_str: &str) -> Result<AppConfig, ConfigError> {
    let config = Config::builder()
        .add_source(File::from_str(toml_str, FileFormat::Toml))
        .build()
        .map_err(|e| ConfigError::Load(e.to_string()))?;

    let app_config: AppConfig = config
        .try_deserialize()
        .map_err(|e| ConfigError::Load(e.to_string()))?;

    validate_config(&app_config)?;

    Ok(app_config)
}

/// Load configuration from files and environment
pub fn load_config(config_path: Option<&str>) -> Result<AppConfig, ConfigError> {
    let mut builder = Config::builder();

    // 1. Start with defaults (handled by serde defaults on AppConfig)

    // 2. Add configuration file
    if let Some(path) = config_path {
        // Explicit path provided - must exist
        if !Path::new(path).exists() {
            return Err(ConfigError::Load(format!(
                "Configuration file not found: {}",
                path
            )));
        }
        builder = builder.add_source(File::new(path, FileFormat::Toml));
    } else {
        // Try default paths (first existing one wins)
        for path in DEFAULT_CONFIG_PATHS {
            let expanded = shellexpand::tilde(path);
            if Path::new(expanded.as_ref()).exists() {
                builder = builder.add_source(File::new(&expanded, FileFormat::Toml));
                break;
            }
        }
    }

    // 3. Add environment variables with RANDOM_NAME_MCP_ prefix
    // e.g., RANDOM_NAME_MCP_SERVER__HOST, RANDOM_NAME_MCP_SESSION__IDLE_TIMEOUT_SECS
    // Double underscore (__) maps to nested keys (server.host)
    builder = builder.add_source(
        Environment::with_prefix("RANDOM_NAME_MCP")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true),
    );

    // 4. PORT is the conventional deployment knob and wins over everything above
    builder = apply_port_override(builder, std::env::var(PORT_ENV_VAR).ok().as_deref())?;

    let config = builder
        .build()
        .map_err(|e| ConfigError::Load(e.to_string()))?;

    let app_config: AppConfig = config
        .try_deserialize()
        .map_err(|e| ConfigError::Load(e.to_string()))?;

    validate_config(&app_config)?;

    Ok(app_config)
}

/// Override `server.port` from a raw `PORT` value, if one is set
fn apply_port_override(
    builder: ConfigBuilder<DefaultState>,
    raw: Option<&str>,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    let Some(raw) = raw else {
        return Ok(builder);
    };

    let port: u16 = raw.trim().parse().map_err(|_| ConfigError::Invalid {
        message: format!("{} must be a port number, got: {}", PORT_ENV_VAR, raw),
    })?;

    builder
        .set_override("server.port", i64::from(port))
        .map_err(|e| ConfigError::Load(e.to_string()))
}

/// Validate configuration values
fn validate_config(config: &AppConfig) -> Result<(), ConfigError> {
    if config.server.name.trim().is_empty() {
        return Err(ConfigError::Missing {
            field: "server.name".to_string(),
        });
    }

    if config.server.port == 0 {
        return Err(ConfigError::Invalid {
            message: "server.port must be greater than 0".to_string(),
        });
    }

    Ok(())
}
