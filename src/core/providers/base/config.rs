//! Adapter configuration
//!
//! Settings handed to an adapter's `initialize`. Credentials arrive already resolved;
//! adapters never consult the process environment.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use url::Url;

use crate::core::types::errors::NormalizedError;

/// Per-adapter configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct AdapterConfig {
    /// API key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// API base URL, vendor default when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Vendor API version header, where the vendor has one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,

    /// Model used when the request names none or names one outside `models`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_model: Option<String>,

    /// Allow-list of model names; empty accepts any
    #[serde(default)]
    pub models: Vec<String>,

    /// Per-call timeout in milliseconds
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Connection establishment timeout in milliseconds
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// Hard cap on the lifetime of one stream in milliseconds
    #[serde(default = "default_stream_timeout_ms")]
    pub stream_timeout_ms: u64,

    /// Overrides the adapter's advertised context length
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_context_tokens: Option<u32>,

    /// Extra HTTP headers sent with every call
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

fn default_request_timeout_ms() -> u64 {
    60_000
}

fn default_connect_timeout_ms() -> u64 {
    10_000
}

fn default_stream_timeout_ms() -> u64 {
    300_000
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: None,
            api_version: None,
            default_model: None,
            models: Vec::new(),
            request_timeout_ms: default_request_timeout_ms(),
            connect_timeout_ms: default_connect_timeout_ms(),
            stream_timeout_ms: default_stream_timeout_ms(),
            max_context_tokens: None,
            headers: HashMap::new(),
        }
    }
}

impl std::fmt::Debug for AdapterConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdapterConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .field("base_url", &self.base_url)
            .field("api_version", &self.api_version)
            .field("default_model", &self.default_model)
            .field("models", &self.models)
            .field("request_timeout_ms", &self.request_timeout_ms)
            .field("stream_timeout_ms", &self.stream_timeout_ms)
            .finish()
    }
}

impl AdapterConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: Some(api_key.into()),
            ..Default::default()
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn with_default_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = Some(model.into());
        self
    }

    pub fn with_models(mut self, models: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.models = models.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn with_stream_timeout(mut self, timeout: Duration) -> Self {
        self.stream_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn stream_timeout(&self) -> Duration {
        Duration::from_millis(self.stream_timeout_ms)
    }

    /// Non-empty API key or a `ConfigError`
    pub fn require_api_key(&self, provider: &str) -> Result<String, NormalizedError> {
        match self.api_key.as_deref().map(str::trim) {
            Some(key) if !key.is_empty() => Ok(key.to_string()),
            _ => Err(NormalizedError::config(format!(
                "{} adapter requires an api key",
                provider
            ))),
        }
    }

    /// Configured base URL or the vendor default, checked to be http(s)
    pub fn resolve_base_url(&self, default: &str) -> Result<String, NormalizedError> {
        let raw = self.base_url.as_deref().unwrap_or(default);
        let url = Url::parse(raw)
            .map_err(|e| NormalizedError::config(format!("invalid base url '{}': {}", raw, e)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(NormalizedError::config(format!(
                "base url '{}' must use http or https",
                raw
            )));
        }
        Ok(raw.trim_end_matches('/').to_string())
    }

    /// Timeouts must be positive
    pub fn validate_timeouts(&self) -> Result<(), NormalizedError> {
        if self.request_timeout_ms == 0 || self.connect_timeout_ms == 0 || self.stream_timeout_ms == 0 {
            return Err(NormalizedError::config("timeouts must be greater than zero"));
        }
        Ok(())
    }

    /// Model allow-list must contain the default model when both are set
    pub fn validate_models(&self) -> Result<(), NormalizedError> {
        if let Some(default) = &self.default_model {
            if default.trim().is_empty() {
                return Err(NormalizedError::config("default model cannot be empty"));
            }
            if !self.models.is_empty() && !self.models.contains(default) {
                return Err(NormalizedError::config(format!(
                    "default model '{}' is not in the model allow-list",
                    default
                )));
            }
        }
        Ok(())
    }

    /// Model to send for `requested`
    ///
    /// The requested model when the allow-list permits it, otherwise the default model.
    pub fn resolve_model(&self, requested: &str) -> Result<String, NormalizedError> {
        let allowed = self.models.is_empty() || self.models.iter().any(|m| m == requested);
        if !requested.is_empty() && allowed {
            return Ok(requested.to_string());
        }
        self.default_model.clone().ok_or_else(|| {
            NormalizedError::validation(if requested.is_empty() {
                "request names no model and no default model is configured".to_string()
            } else {
                format!("model '{}' is not served by this provider", requested)
            })
        })
    }
}
