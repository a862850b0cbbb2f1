//! Dispatch configuration

use super::*;
use serde::{Deserialize, Serialize};

use crate::core::types::capability::Capability;

/// Dispatch defaults applied when a call leaves an option unset
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Provider preference order; empty means the order providers are configured in
    #[serde(default)]
    pub order: Vec<String>,
    /// Retries per provider after the first attempt
    #[serde(default = "default_retry_limit")]
    pub retry_limit: u32,
    /// Wall-clock budget of one dispatch call in milliseconds
    #[serde(default = "default_deadline_ms")]
    pub deadline_ms: u64,
    /// Capabilities every candidate must have in addition to what the request implies
    #[serde(default)]
    pub required_capabilities: Vec<Capability>,
    /// Minimum context length every candidate must support
    #[serde(default)]
    pub min_context_tokens: Option<u32>,
    #[serde(default)]
    pub backoff: BackoffSettings,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            order: Vec::new(),
            retry_limit: default_retry_limit(),
            deadline_ms: default_deadline_ms(),
            required_capabilities: Vec::new(),
            min_context_tokens: None,
            backoff: BackoffSettings::default(),
        }
    }
}

/// Exponential backoff between retries on the same provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackoffSettings {
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    #[serde(default = "default_backoff_multiplier")]
    pub multiplier: f64,
    /// Fraction of the delay added or removed at random (0.0 to 1.0)
    #[serde(default = "default_jitter")]
    pub jitter: f64,
}

impl Default for BackoffSettings {
    fn default() -> Self {
        Self {
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            multiplier: default_backoff_multiplier(),
            jitter: default_jitter(),
        }
    }
}
