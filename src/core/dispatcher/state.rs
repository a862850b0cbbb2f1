//! Per-call dispatch state machine
//!
//! ```text
//! Pending -> Attempting(p, 1) -> Succeeded(p)
//!                             -> AttemptFailed -> Attempting(p, n + 1)   retry
//!                                              -> Attempting(q, 1)       fallback
//!                                              -> Exhausted
//! Pending | Attempting | AttemptFailed -> Cancelled   (caller or deadline)
//! ```

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::trace;

use crate::core::observability::{AttemptInfo, DispatchObserver, RetryDecision};
use crate::core::types::{
    common::ProviderKey,
    errors::{ErrorKind, NormalizedError},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchState {
    Pending,
    Attempting {
        provider: ProviderKey,
        attempt: u32,
    },
    AttemptFailed {
        provider: ProviderKey,
        attempt: u32,
        kind: ErrorKind,
    },
    Succeeded {
        provider: ProviderKey,
    },
    Exhausted,
    Cancelled,
}

impl DispatchState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            DispatchState::Succeeded { .. } | DispatchState::Exhausted | DispatchState::Cancelled
        )
    }

    pub fn can_transition_to(&self, next: &DispatchState) -> bool {
        use DispatchState::*;
        match (self, next) {
            (Pending, Attempting { attempt, .. }) => *attempt == 1,
            (Pending, Exhausted | Cancelled) => true,
            (Attempting { provider, .. }, Succeeded { provider: p }) => provider == p,
            (
                Attempting { provider, attempt },
                AttemptFailed {
                    provider: p,
                    attempt: n,
                    ..
                },
            ) => provider == p && attempt == n,
            (Attempting { .. }, Cancelled) => true,
            (
                AttemptFailed {
                    provider, attempt, ..
                },
                Attempting {
                    provider: p,
                    attempt: n,
                },
            ) => {
                if provider == p {
                    *n == attempt + 1
                } else {
                    *n == 1
                }
            }
            (AttemptFailed { .. }, Exhausted | Cancelled) => true,
            _ => false,
        }
    }
}

impl fmt::Display for DispatchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchState::Pending => f.write_str("pending"),
            DispatchState::Attempting { provider, attempt } => {
                write!(f, "attempting({}, {})", provider, attempt)
            }
            DispatchState::AttemptFailed {
                provider,
                attempt,
                kind,
            } => write!(f, "attempt_failed({}, {}, {})", provider, attempt, kind),
            DispatchState::Succeeded { provider } => write!(f, "succeeded({})", provider),
            DispatchState::Exhausted => f.write_str("exhausted"),
            DispatchState::Cancelled => f.write_str("cancelled"),
        }
    }
}

/// Tracks one dispatch call and reports its transitions to the observers
pub(crate) struct DispatchRun<'o> {
    request_id: String,
    streaming: bool,
    started: Instant,
    state: DispatchState,
    observers: &'o [Arc<dyn DispatchObserver>],
}

impl<'o> DispatchRun<'o> {
    pub(crate) fn new(observers: &'o [Arc<dyn DispatchObserver>], streaming: bool) -> Self {
        Self {
            request_id: uuid::Uuid::new_v4().to_string(),
            streaming,
            started: Instant::now(),
            state: DispatchState::Pending,
            observers,
        }
    }

    pub(crate) fn request_id(&self) -> &str {
        &self.request_id
    }

    pub(crate) fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    #[cfg(test)]
    pub(crate) fn state(&self) -> &DispatchState {
        &self.state
    }

    fn transition(&mut self, next: DispatchState) {
        debug_assert!(
            self.state.can_transition_to(&next),
            "invalid dispatch transition {} -> {}",
            self.state,
            next
        );
        trace!(request_id = %self.request_id, from = %self.state, to = %next, "dispatch state");
        self.state = next;
    }

    fn info<'a>(&'a self, provider: &'a ProviderKey, candidate: usize, attempt: u32) -> AttemptInfo<'a> {
        AttemptInfo {
            request_id: &self.request_id,
            provider,
            attempt,
            candidate,
            streaming: self.streaming,
        }
    }

    pub(crate) fn attempt_started(&mut self, provider: &ProviderKey, candidate: usize, attempt: u32) {
        self.transition(DispatchState::Attempting {
            provider: provider.clone(),
            attempt,
        });
        let info = self.info(provider, candidate, attempt);
        for observer in self.observers {
            observer.on_attempt_start(&info);
        }
    }

    pub(crate) fn attempt_failed(
        &mut self,
        provider: &ProviderKey,
        candidate: usize,
        attempt: u32,
        error: &NormalizedError,
        decision: RetryDecision,
    ) {
        self.transition(DispatchState::AttemptFailed {
            provider: provider.clone(),
            attempt,
            kind: error.kind,
        });
        let info = self.info(provider, candidate, attempt);
        for observer in self.observers {
            observer.on_attempt_failure(&info, error, decision);
        }
    }

    pub(crate) fn succeeded(&mut self, provider: &ProviderKey, candidate: usize, attempt: u32) {
        self.transition(DispatchState::Succeeded {
            provider: provider.clone(),
        });
        let elapsed = self.elapsed();
        let info = self.info(provider, candidate, attempt);
        for observer in self.observers {
            observer.on_success(&info, elapsed);
        }
    }

    /// End the call with `error` and hand it back for returning
    pub(crate) fn fail(&mut self, error: NormalizedError) -> NormalizedError {
        let next = match error.kind {
            ErrorKind::Cancelled | ErrorKind::DeadlineExceeded => DispatchState::Cancelled,
            _ => DispatchState::Exhausted,
        };
        self.transition(next);
        let elapsed = self.elapsed();
        for observer in self.observers {
            observer.on_failure(&self.request_id, &error, elapsed);
        }
        error
    }
}
