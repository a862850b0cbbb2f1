//! Provider Registry
//!
//! Live adapters keyed by provider identifier, each stored with the capability set it
//! reported at registration. Built once at startup through `&mut self` and then shared
//! read-only behind an `Arc`, so lookups take no locks.

use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

use crate::config::models::ProviderConfig;
use crate::core::traits::provider::ProviderAdapter;
use crate::core::types::{capability::CapabilitySet, common::ProviderKey, errors::NormalizedError};

/// Registry failures
#[derive(Debug, Clone, Error)]
pub enum RegistryError {
    #[error("provider '{0}' is already registered")]
    DuplicateProvider(ProviderKey),

    #[error("provider '{0}' is not registered")]
    ProviderNotFound(ProviderKey),

    #[error("provider '{key}' reported invalid capabilities {capabilities}")]
    InvalidCapabilities {
        key: ProviderKey,
        capabilities: CapabilitySet,
    },

    #[error("provider key must not be empty")]
    InvalidKey,

    #[error("failed to initialize provider '{key}': {source}")]
    Initialization {
        key: ProviderKey,
        #[source]
        source: NormalizedError,
    },
}

/// One registered adapter and its capability snapshot
#[derive(Debug, Clone)]
pub struct RegistryEntry {
    pub key: ProviderKey,
    pub adapter: Arc<dyn ProviderAdapter>,
    pub capabilities: CapabilitySet,
}

/// Provider registry
#[derive(Default)]
pub struct ProviderRegistry {
    entries: HashMap<ProviderKey, RegistryEntry>,
    /// Registration order, for `list`
    order: Vec<ProviderKey>,
}

impl ProviderRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `adapter` under `key`, returning the new provider count
    ///
    /// Fails if the key is taken; use [`replace`](Self::replace) to swap an adapter.
    pub fn register(
        &mut self,
        key: impl Into<ProviderKey>,
        adapter: Arc<dyn ProviderAdapter>,
    ) -> Result<usize, RegistryError> {
        let key = key.into();
        if self.entries.contains_key(&key) {
            return Err(RegistryError::DuplicateProvider(key));
        }
        let entry = Self::make_entry(key.clone(), adapter)?;

        info!(provider = %key, capabilities = %entry.capabilities, "registered provider");
        self.entries.insert(key.clone(), entry);
        self.order.push(key);
        Ok(self.entries.len())
    }

    /// Register or overwrite `key`, returning the adapter it replaced
    pub fn replace(
        &mut self,
        key: impl Into<ProviderKey>,
        adapter: Arc<dyn ProviderAdapter>,
    ) -> Result<Option<Arc<dyn ProviderAdapter>>, RegistryError> {
        let key = key.into();
        let entry = Self::make_entry(key.clone(), adapter)?;

        let previous = self.entries.insert(key.clone(), entry).map(|old| old.adapter);
        if previous.is_some() {
            info!(provider = %key, "replaced provider");
        } else {
            info!(provider = %key, "registered provider");
            self.order.push(key);
        }
        Ok(previous)
    }

    fn make_entry(key: ProviderKey, adapter: Arc<dyn ProviderAdapter>) -> Result<RegistryEntry, RegistryError> {
        if !key.is_valid() {
            return Err(RegistryError::InvalidKey);
        }
        let capabilities = adapter.describe_capabilities();
        if !capabilities.is_valid() {
            return Err(RegistryError::InvalidCapabilities { key, capabilities });
        }
        if adapter.key() != &key {
            debug!(provider = %key, adapter_key = %adapter.key(), "adapter registered under a different key");
        }
        Ok(RegistryEntry {
            key,
            adapter,
            capabilities,
        })
    }

    /// Adapter registered under `key`
    pub fn get(&self, key: &str) -> Result<&Arc<dyn ProviderAdapter>, RegistryError> {
        self.entry(key).map(|entry| &entry.adapter)
    }

    /// Entry registered under `key`
    pub fn entry(&self, key: &str) -> Result<&RegistryEntry, RegistryError> {
        self.entries
            .get(key)
            .ok_or_else(|| RegistryError::ProviderNotFound(ProviderKey::new(key)))
    }

    /// Registered keys and capabilities in registration order
    ///
    /// For discovery and diagnostics; dispatch order comes from the policy.
    pub fn list(&self) -> Vec<(ProviderKey, CapabilitySet)> {
        self.order
            .iter()
            .filter_map(|key| self.entries.get(key))
            .map(|entry| (entry.key.clone(), entry.capabilities.clone()))
            .collect()
    }

    /// Registered keys in registration order
    pub fn keys(&self) -> impl Iterator<Item = &ProviderKey> {
        self.order.iter()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn count(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Build, initialize and register every enabled provider
    ///
    /// Any initialization failure aborts the whole bootstrap.
    pub async fn from_config(providers: &[ProviderConfig]) -> Result<Self, RegistryError> {
        let mut registry = Self::new();
        for provider in providers.iter().filter(|p| p.enabled) {
            let key = ProviderKey::new(&provider.key);
            let init_error = |source: NormalizedError| RegistryError::Initialization {
                key: key.clone(),
                source,
            };

            let config = provider.to_adapter_config().map_err(init_error)?;
            let mut adapter = super::create_adapter(provider.kind, key.clone());
            adapter.initialize(config).await.map_err(init_error)?;
            registry.register(key.clone(), Arc::from(adapter))?;
        }
        Ok(registry)
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("provider_count", &self.entries.len())
            .field("providers", &self.order)
            .finish()
    }
}
