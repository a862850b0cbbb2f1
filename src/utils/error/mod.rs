//! Application errors
//!
//! [`NormalizedError`] is what the dispatcher and adapters speak; [`RelayError`] covers
//! everything around them (config files, registry bootstrap, logging) and is what the
//! binary reports.

use thiserror::Error;

use crate::core::providers::RegistryError;
use crate::core::types::errors::NormalizedError;

/// Result type alias for the relay
pub type Result<T> = std::result::Result<T, RelayError>;

/// Main application error type
#[derive(Error, Debug)]
pub enum RelayError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Registry bootstrap errors
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    /// Dispatch failures
    #[error("Dispatch failed: {0}")]
    Dispatch(#[from] NormalizedError),

    /// Logging setup errors
    #[error("Logging error: {0}")]
    Logging(String),
}

impl RelayError {
    /// Normalized error behind a dispatch failure
    pub fn as_normalized(&self) -> Option<&NormalizedError> {
        match self {
            RelayError::Dispatch(err) => Some(err),
            _ => None,
        }
    }
}
