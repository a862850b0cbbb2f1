//! Dispatch observability hooks
//!
//! The dispatcher reports every state transition of a call to a list of
//! [`DispatchObserver`]s. [`TracingObserver`] is installed by default; embedders add
//! their own to feed metrics or audit sinks.

mod metrics;
mod tracing_observer;

pub use metrics::{MetricsObserver, MetricsSnapshot, ProviderStats};
pub use tracing_observer::TracingObserver;

use std::fmt::Debug;
use std::time::Duration;

use crate::core::types::{common::ProviderKey, errors::NormalizedError};

/// Identity of one adapter attempt
#[derive(Debug, Clone, Copy)]
pub struct AttemptInfo<'a> {
    pub request_id: &'a str,
    pub provider: &'a ProviderKey,
    /// 1-based attempt number on this provider
    pub attempt: u32,
    /// 0-based position of the provider in the candidate list
    pub candidate: usize,
    pub streaming: bool,
}

/// What the dispatcher does after a failed attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Same provider again after `delay`
    Retry { delay: Duration },
    /// Next candidate
    Fallback,
    /// No candidate left, or the call is over
    GiveUp,
}

impl RetryDecision {
    pub fn as_str(&self) -> &'static str {
        match self {
            RetryDecision::Retry { .. } => "retry",
            RetryDecision::Fallback => "fallback",
            RetryDecision::GiveUp => "give_up",
        }
    }
}

/// Callbacks for dispatch lifecycle events
///
/// Called inline on the dispatching task, so implementations must be cheap and must
/// not block.
pub trait DispatchObserver: Send + Sync + Debug {
    fn on_attempt_start(&self, _attempt: &AttemptInfo<'_>) {}

    fn on_attempt_failure(
        &self,
        _attempt: &AttemptInfo<'_>,
        _error: &NormalizedError,
        _decision: RetryDecision,
    ) {
    }

    fn on_success(&self, _attempt: &AttemptInfo<'_>, _elapsed: Duration) {}

    /// Terminal failure of the whole call
    fn on_failure(&self, _request_id: &str, _error: &NormalizedError, _elapsed: Duration) {}
}
