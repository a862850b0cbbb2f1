//! Provider configuration

use super::*;
use serde::{Deserialize, Serialize};

use crate::core::providers::ProviderKind;
use crate::core::providers::base::config::AdapterConfig;
use crate::core::types::errors::NormalizedError;

/// One provider entry
///
/// Adapter settings are flattened into the entry, so a YAML item reads
/// `{ key, kind, api_key_env, base_url, models, ... }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Registry key
    pub key: String,
    /// Vendor implementation
    pub kind: ProviderKind,
    /// Environment variable holding the API key when `api_key` is not given inline
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,
    /// Whether the provider is registered at startup
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(flatten)]
    pub adapter: AdapterConfig,
}

impl ProviderConfig {
    pub fn new(key: impl Into<String>, kind: ProviderKind) -> Self {
        Self {
            key: key.into(),
            kind,
            api_key_env: None,
            enabled: true,
            adapter: AdapterConfig::default(),
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.adapter.api_key = Some(api_key.into());
        self
    }

    pub fn with_api_key_env(mut self, var: impl Into<String>) -> Self {
        self.api_key_env = Some(var.into());
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.adapter.base_url = Some(base_url.into());
        self
    }

    /// Adapter configuration with the credential resolved
    ///
    /// An inline key wins over `api_key_env`. A named variable that is unset or empty
    /// is a `ConfigError`.
    pub fn to_adapter_config(&self) -> Result<AdapterConfig, NormalizedError> {
        let mut config = self.adapter.clone();
        if config.api_key.is_none() {
            if let Some(var) = &self.api_key_env {
                match std::env::var(var) {
                    Ok(value) if !value.trim().is_empty() => config.api_key = Some(value),
                    _ => {
                        return Err(NormalizedError::config(format!(
                            "environment variable {} for provider '{}' is not set",
                            var, self.key
                        )));
                    }
                }
            }
        }
        Ok(config)
    }
}
