//! Common types
//!
//! Provider identifiers and the per-attempt request context handed to adapters

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Stable identifier of a provider inside one registry ("openai", "anthropic", ...)
///
/// Cheap to clone; comparisons are case-sensitive.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProviderKey(Arc<str>);

impl ProviderKey {
    /// Create a new key
    pub fn new(key: impl AsRef<str>) -> Self {
        Self(Arc::from(key.as_ref()))
    }

    /// Key as string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the key is usable as a registry identifier
    pub fn is_valid(&self) -> bool {
        !self.0.trim().is_empty()
    }
}

impl fmt::Display for ProviderKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProviderKey {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ProviderKey {
    fn from(value: String) -> Self {
        Self(Arc::from(value))
    }
}

impl Borrow<str> for ProviderKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for ProviderKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Context of a single adapter attempt
///
/// Created by the dispatcher for every call into an adapter. The deadline is the
/// dispatch-wide wall-clock budget, so adapters must not wait past it.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Dispatch call identifier, shared by all attempts of one call
    pub request_id: String,

    /// 1-based attempt number on the current provider
    pub attempt: u32,

    /// Absolute deadline for this attempt
    pub deadline: Option<Instant>,
}

impl RequestContext {
    /// Context without a deadline
    pub fn new(request_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            attempt: 1,
            deadline: None,
        }
    }

    /// Set the absolute deadline
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Set the attempt number
    pub fn with_attempt(mut self, attempt: u32) -> Self {
        self.attempt = attempt;
        self
    }

    /// Budget left before the deadline, `None` when unbounded
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    /// Timeout an adapter should apply to its network call
    ///
    /// The smaller of the adapter's own timeout and the remaining budget.
    pub fn effective_timeout(&self, adapter_timeout: Duration) -> Duration {
        match self.remaining() {
            Some(remaining) => remaining.min(adapter_timeout),
            None => adapter_timeout,
        }
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new(uuid::Uuid::new_v4().to_string())
    }
}
