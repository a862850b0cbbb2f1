//! Normalized error
//!
//! Single error type crossing the adapter boundary. Adapters translate every vendor
//! failure into one of the kinds below; the dispatcher decides retry and fallback from
//! the `retryable` flag alone.
//!
//! | Kind | Raised by | Retryable |
//! |------|-----------|-----------|
//! | ConfigError | adapter initialization | No |
//! | AuthError | adapter (401/403) | No |
//! | RateLimited | adapter (429) | Yes, with backoff |
//! | Transient | adapter (5xx, network, timeout) | Yes, with backoff |
//! | ProtocolError | adapter (malformed vendor payload) | No |
//! | ValidationError | request checks, vendor 4xx rejections | No |
//! | UnsupportedCapability | dispatcher, before any call | No |
//! | AllProvidersExhausted | dispatcher | No |
//! | DeadlineExceeded | dispatcher | No |
//! | Cancelled | dispatcher | No |

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::time::Duration;

use super::capability::Capability;
use super::common::ProviderKey;

/// Normalized error category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    ConfigError,
    AuthError,
    RateLimited,
    Transient,
    ProtocolError,
    ValidationError,
    UnsupportedCapability,
    AllProvidersExhausted,
    DeadlineExceeded,
    Cancelled,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::ConfigError => "config_error",
            ErrorKind::AuthError => "auth_error",
            ErrorKind::RateLimited => "rate_limited",
            ErrorKind::Transient => "transient",
            ErrorKind::ProtocolError => "protocol_error",
            ErrorKind::ValidationError => "validation_error",
            ErrorKind::UnsupportedCapability => "unsupported_capability",
            ErrorKind::AllProvidersExhausted => "all_providers_exhausted",
            ErrorKind::DeadlineExceeded => "deadline_exceeded",
            ErrorKind::Cancelled => "cancelled",
        }
    }

    /// Retry semantics implied by the kind
    pub fn is_retryable_by_default(&self) -> bool {
        matches!(self, ErrorKind::RateLimited | ErrorKind::Transient)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Provider-independent error
#[derive(Debug, Clone, thiserror::Error)]
#[error("{kind}{}: {message}", provider_suffix(.provider))]
pub struct NormalizedError {
    pub kind: ErrorKind,
    /// Provider that raised the error; absent before any adapter was involved
    pub provider: Option<ProviderKey>,
    /// Vendor HTTP status, when there was one
    pub status: Option<u16>,
    pub retryable: bool,
    pub message: String,
    /// Vendor hint for when to retry
    pub retry_after: Option<Duration>,
    /// Opaque vendor diagnostics, for logging only
    pub raw: Option<Value>,
    /// Terminal error of each attempted candidate, in attempt order
    pub causes: Vec<NormalizedError>,
}

fn provider_suffix(provider: &Option<ProviderKey>) -> String {
    match provider {
        Some(key) => format!(" ({})", key),
        None => String::new(),
    }
}

impl NormalizedError {
    /// Error of `kind` with the kind's default retry flag
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            provider: None,
            status: None,
            retryable: kind.is_retryable_by_default(),
            message: message.into(),
            retry_after: None,
            raw: None,
            causes: Vec::new(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ConfigError, message)
    }

    pub fn auth(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::AuthError, message)
    }

    pub fn rate_limited(message: impl Into<String>, retry_after: Option<Duration>) -> Self {
        Self {
            retry_after,
            ..Self::new(ErrorKind::RateLimited, message)
        }
    }

    pub fn transient(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Transient, message)
    }

    pub fn protocol(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ProtocolError, message)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ValidationError, message)
    }

    /// No candidate offers the required capabilities
    pub fn unsupported_capability(required: &[Capability]) -> Self {
        let names: Vec<&str> = required.iter().map(Capability::as_str).collect();
        Self::new(
            ErrorKind::UnsupportedCapability,
            format!("no registered provider supports [{}]", names.join(", ")),
        )
    }

    /// Every candidate failed; `causes` holds one terminal error per candidate
    pub fn all_providers_exhausted(causes: Vec<NormalizedError>) -> Self {
        let summary: Vec<String> = causes
            .iter()
            .map(|cause| match &cause.provider {
                Some(key) => format!("{}={}", key, cause.kind),
                None => cause.kind.to_string(),
            })
            .collect();
        Self {
            causes,
            ..Self::new(
                ErrorKind::AllProvidersExhausted,
                format!("all providers failed [{}]", summary.join(", ")),
            )
        }
    }

    pub fn deadline_exceeded(budget: Duration, causes: Vec<NormalizedError>) -> Self {
        Self {
            causes,
            ..Self::new(
                ErrorKind::DeadlineExceeded,
                format!("deadline of {} ms exceeded", budget.as_millis()),
            )
        }
    }

    pub fn cancelled() -> Self {
        Self::new(ErrorKind::Cancelled, "request cancelled by caller")
    }

    pub fn with_provider(mut self, provider: ProviderKey) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_raw(mut self, raw: Value) -> Self {
        self.raw = Some(raw);
        self
    }

    pub fn with_causes(mut self, causes: Vec<NormalizedError>) -> Self {
        self.causes = causes;
        self
    }

    pub fn with_retryable(mut self, retryable: bool) -> Self {
        self.retryable = retryable;
        self
    }

    pub fn is_retryable(&self) -> bool {
        self.retryable
    }

    /// Vendor-suggested delay before the next attempt
    pub fn retry_delay(&self) -> Option<Duration> {
        if self.retryable { self.retry_after } else { None }
    }

    /// Kinds of the aggregated causes, in attempt order
    pub fn cause_kinds(&self) -> Vec<ErrorKind> {
        self.causes.iter().map(|c| c.kind).collect()
    }
}
