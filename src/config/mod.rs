//! Configuration management
//!
//! YAML file with three sections: `logging`, `dispatch` and `providers`. Every optional
//! field has a serde default, and the whole file is checked through [`Validate`] after
//! parsing.

pub mod loader;
pub mod models;
pub mod validation;

pub use loader::{DEFAULT_CONFIG_PATH, load_config};
pub use models::*;
pub use validation::Validate;

use crate::core::types::common::ProviderKey;
use crate::utils::error::{RelayError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

/// Main configuration struct
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub dispatch: DispatchConfig,
    #[serde(default)]
    pub providers: Vec<ProviderConfig>,
}

impl Config {
    /// Load configuration from file
    pub async fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading configuration from: {:?}", path);

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| RelayError::Config(format!("Failed to read config file {:?}: {}", path, e)))?;

        Self::from_yaml_str(&content)
    }

    /// Parse and validate configuration from YAML text
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(content)?;
        config.check()?;
        debug!(providers = config.providers.len(), "Configuration loaded successfully");
        Ok(config)
    }

    /// Validate the entire configuration
    pub fn check(&self) -> Result<()> {
        Validate::validate(self).map_err(RelayError::Config)
    }

    /// Providers registered at startup
    pub fn enabled_providers(&self) -> impl Iterator<Item = &ProviderConfig> {
        self.providers.iter().filter(|p| p.enabled)
    }

    /// Preference order: the configured order, or enabled providers as listed
    pub fn dispatch_order(&self) -> Vec<ProviderKey> {
        if self.dispatch.order.is_empty() {
            self.enabled_providers().map(|p| ProviderKey::new(&p.key)).collect()
        } else {
            self.dispatch.order.iter().map(ProviderKey::new).collect()
        }
    }
}
