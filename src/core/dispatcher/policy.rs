//! Dispatch policy
//!
//! [`DispatchPolicy`] is the fully resolved set of knobs one dispatch call runs with.
//! [`DispatchOptions`] is the per-call overlay: every unset field falls back to the
//! service defaults.

use std::collections::BTreeSet;
use std::time::Duration;

use crate::config::models::{BackoffSettings, DispatchConfig};
use crate::core::streaming::CancelHandle;
use crate::core::types::{capability::Capability, common::ProviderKey, errors::NormalizedError};

/// Exponential backoff between retries on one provider
#[derive(Debug, Clone, PartialEq)]
pub struct BackoffConfig {
    pub initial_delay: Duration,
    pub multiplier: f64,
    pub max_delay: Duration,
    /// Fraction of the delay randomly added or removed
    pub jitter: f64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(200),
            multiplier: 2.0,
            max_delay: Duration::from_secs(5),
            jitter: 0.1,
        }
    }
}

impl BackoffConfig {
    /// Fixed delay, no growth and no jitter
    pub fn constant(delay: Duration) -> Self {
        Self {
            initial_delay: delay,
            multiplier: 1.0,
            max_delay: delay,
            jitter: 0.0,
        }
    }
}

impl From<&BackoffSettings> for BackoffConfig {
    fn from(settings: &BackoffSettings) -> Self {
        Self {
            initial_delay: Duration::from_millis(settings.initial_delay_ms),
            multiplier: settings.multiplier,
            max_delay: Duration::from_millis(settings.max_delay_ms),
            jitter: settings.jitter,
        }
    }
}

/// Resolved policy of one dispatch call
#[derive(Debug, Clone)]
pub struct DispatchPolicy {
    /// Provider preference order
    pub order: Vec<ProviderKey>,
    /// Provider tried before the order
    pub provider_override: Option<ProviderKey>,
    /// Capabilities required on top of what the request implies
    pub required_capabilities: BTreeSet<Capability>,
    pub min_context_tokens: Option<u32>,
    /// Retries per provider after the first attempt
    pub retry_limit: u32,
    /// Wall-clock budget of the whole call
    pub deadline: Duration,
    pub backoff: BackoffConfig,
    pub cancel: Option<CancelHandle>,
}

impl Default for DispatchPolicy {
    fn default() -> Self {
        Self {
            order: Vec::new(),
            provider_override: None,
            required_capabilities: BTreeSet::new(),
            min_context_tokens: None,
            retry_limit: 2,
            deadline: Duration::from_millis(30_000),
            backoff: BackoffConfig::default(),
            cancel: None,
        }
    }
}

impl DispatchPolicy {
    /// Default policy over `order`
    pub fn new<K: Into<ProviderKey>>(order: impl IntoIterator<Item = K>) -> Self {
        Self {
            order: order.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Policy from the dispatch section of the configuration
    pub fn from_config(config: &DispatchConfig, order: Vec<ProviderKey>) -> Self {
        Self {
            order,
            provider_override: None,
            required_capabilities: config.required_capabilities.iter().copied().collect(),
            min_context_tokens: config.min_context_tokens,
            retry_limit: config.retry_limit,
            deadline: Duration::from_millis(config.deadline_ms),
            backoff: BackoffConfig::from(&config.backoff),
            cancel: None,
        }
    }

    pub fn with_override(mut self, provider: impl Into<ProviderKey>) -> Self {
        self.provider_override = Some(provider.into());
        self
    }

    pub fn require(mut self, capability: Capability) -> Self {
        self.required_capabilities.insert(capability);
        self
    }

    pub fn with_min_context_tokens(mut self, tokens: u32) -> Self {
        self.min_context_tokens = Some(tokens);
        self
    }

    pub fn with_retry_limit(mut self, retry_limit: u32) -> Self {
        self.retry_limit = retry_limit;
        self
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn with_backoff(mut self, backoff: BackoffConfig) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn with_cancel(mut self, cancel: CancelHandle) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Attempts allowed per provider
    pub fn max_attempts(&self) -> u32 {
        self.retry_limit.saturating_add(1)
    }

    /// Reject policies no call could run with
    pub fn validate(&self) -> Result<(), NormalizedError> {
        if self.deadline.is_zero() {
            return Err(NormalizedError::validation("deadline must be positive"));
        }
        if self.order.is_empty() && self.provider_override.is_none() {
            return Err(NormalizedError::validation(
                "dispatch order is empty and no provider override is set",
            ));
        }
        if self.min_context_tokens == Some(0) {
            return Err(NormalizedError::validation(
                "min_context_tokens must be positive",
            ));
        }
        Ok(())
    }
}

/// Per-call overrides of the dispatch defaults
#[derive(Debug, Clone, Default)]
pub struct DispatchOptions {
    pub provider_override: Option<ProviderKey>,
    /// Replaces the default capability filter when set
    pub required_capabilities: Option<BTreeSet<Capability>>,
    pub retry_limit: Option<u32>,
    pub deadline_ms: Option<u64>,
    pub policy_order: Option<Vec<ProviderKey>>,
    pub min_context_tokens: Option<u32>,
    pub cancel: Option<CancelHandle>,
}

impl DispatchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn provider(mut self, provider: impl Into<ProviderKey>) -> Self {
        self.provider_override = Some(provider.into());
        self
    }

    pub fn require(mut self, capability: Capability) -> Self {
        self.required_capabilities
            .get_or_insert_with(BTreeSet::new)
            .insert(capability);
        self
    }

    pub fn retry_limit(mut self, retry_limit: u32) -> Self {
        self.retry_limit = Some(retry_limit);
        self
    }

    pub fn deadline_ms(mut self, deadline_ms: u64) -> Self {
        self.deadline_ms = Some(deadline_ms);
        self
    }

    pub fn order<K: Into<ProviderKey>>(mut self, order: impl IntoIterator<Item = K>) -> Self {
        self.policy_order = Some(order.into_iter().map(Into::into).collect());
        self
    }

    pub fn min_context_tokens(mut self, tokens: u32) -> Self {
        self.min_context_tokens = Some(tokens);
        self
    }

    pub fn cancel(mut self, cancel: CancelHandle) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Overlay these options on `defaults`
    pub fn resolve(self, defaults: &DispatchPolicy) -> DispatchPolicy {
        DispatchPolicy {
            order: self.policy_order.unwrap_or_else(|| defaults.order.clone()),
            provider_override: self
                .provider_override
                .or_else(|| defaults.provider_override.clone()),
            required_capabilities: self
                .required_capabilities
                .unwrap_or_else(|| defaults.required_capabilities.clone()),
            min_context_tokens: self.min_context_tokens.or(defaults.min_context_tokens),
            retry_limit: self.retry_limit.unwrap_or(defaults.retry_limit),
            deadline: self
                .deadline_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.deadline),
            backoff: defaults.backoff.clone(),
            cancel: self.cancel.or_else(|| defaults.cancel.clone()),
        }
    }
}
