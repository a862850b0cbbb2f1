//! Configuration validators

use super::trait_def::Validate;
use crate::config::Config;
use crate::config::models::*;
use std::collections::HashSet;
use tracing::debug;
use url::Url;

impl Validate for Config {
    fn validate(&self) -> Result<(), String> {
        debug!("Validating configuration");

        self.logging.validate()?;
        self.dispatch.validate()?;

        let mut keys = HashSet::new();
        for provider in &self.providers {
            if !keys.insert(provider.key.as_str()) {
                return Err(format!("Duplicate provider key: {}", provider.key));
            }
            provider.validate()?;
        }

        let enabled: HashSet<&str> = self
            .providers
            .iter()
            .filter(|p| p.enabled)
            .map(|p| p.key.as_str())
            .collect();
        for key in &self.dispatch.order {
            if !keys.contains(key.as_str()) {
                return Err(format!("Dispatch order names unknown provider: {}", key));
            }
            if !enabled.contains(key.as_str()) {
                debug!(provider = %key, "dispatch order names a disabled provider");
            }
        }

        Ok(())
    }
}

impl Validate for LoggingConfig {
    fn validate(&self) -> Result<(), String> {
        if self.level.trim().is_empty() {
            return Err("Log level cannot be empty".to_string());
        }
        Ok(())
    }
}

impl Validate for DispatchConfig {
    fn validate(&self) -> Result<(), String> {
        if self.deadline_ms == 0 {
            return Err("Dispatch deadline must be greater than 0".to_string());
        }
        if self.min_context_tokens == Some(0) {
            return Err("Minimum context tokens must be greater than 0".to_string());
        }
        self.backoff.validate()
    }
}

impl Validate for BackoffSettings {
    fn validate(&self) -> Result<(), String> {
        if self.initial_delay_ms == 0 {
            return Err("Backoff initial delay must be greater than 0".to_string());
        }
        if self.max_delay_ms < self.initial_delay_ms {
            return Err("Backoff max delay must not be less than the initial delay".to_string());
        }
        if self.multiplier < 1.0 {
            return Err("Backoff multiplier must be at least 1.0".to_string());
        }
        if !(0.0..=1.0).contains(&self.jitter) {
            return Err("Backoff jitter must be between 0.0 and 1.0".to_string());
        }
        Ok(())
    }
}

impl Validate for ProviderConfig {
    fn validate(&self) -> Result<(), String> {
        if self.key.trim().is_empty() {
            return Err("Provider key cannot be empty".to_string());
        }

        let adapter = &self.adapter;
        if adapter.api_key.as_deref().is_some_and(|k| k.trim().is_empty()) {
            return Err(format!("Provider {} has an empty api_key", self.key));
        }
        if self.enabled && adapter.api_key.is_none() && self.api_key_env.is_none() {
            return Err(format!("Provider {} needs api_key or api_key_env", self.key));
        }
        if let Some(base_url) = &adapter.base_url {
            let url = Url::parse(base_url)
                .map_err(|e| format!("Provider {} has an invalid base_url: {}", self.key, e))?;
            if !matches!(url.scheme(), "http" | "https") {
                return Err(format!("Provider {} base_url must be http or https", self.key));
            }
        }
        if adapter.request_timeout_ms == 0 || adapter.connect_timeout_ms == 0 || adapter.stream_timeout_ms == 0 {
            return Err(format!("Provider {} timeouts must be greater than 0", self.key));
        }
        if let (Some(model), false) = (&adapter.default_model, adapter.models.is_empty()) {
            if !adapter.models.contains(model) {
                return Err(format!(
                    "Provider {} default_model {} is not in its models list",
                    self.key, model
                ));
            }
        }
        if adapter.max_context_tokens == Some(0) {
            return Err(format!("Provider {} max_context_tokens must be greater than 0", self.key));
        }
        Ok(())
    }
}
