//! Logging setup
//!
//! `RUST_LOG` wins over the configured level so a single run can be made more verbose
//! without touching the config file.

use tracing_subscriber::EnvFilter;

use crate::config::models::{LogFormat, LoggingConfig};
use crate::utils::error::{RelayError, Result};

/// Install the global tracing subscriber
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let filter = build_filter(&config.level)?;

    let installed = match config.format {
        LogFormat::Pretty => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_thread_ids(false)
            .try_init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_current_span(true)
            .try_init(),
    };

    installed.map_err(|e| RelayError::Logging(e.to_string()))
}

fn build_filter(level: &str) -> Result<EnvFilter> {
    match std::env::var("RUST_LOG") {
        Ok(directives) if !directives.trim().is_empty() => EnvFilter::try_new(directives),
        _ => EnvFilter::try_new(level),
    }
    .map_err(|e| RelayError::Logging(format!("invalid log filter: {}", e)))
}
