//! Structured log output for dispatch events

use std::time::Duration;
use tracing::{debug, error, info, warn};

use super::{AttemptInfo, DispatchObserver, RetryDecision};
use crate::core::types::errors::{ErrorKind, NormalizedError};

/// Turns dispatch events into `tracing` events
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl DispatchObserver for TracingObserver {
    fn on_attempt_start(&self, attempt: &AttemptInfo<'_>) {
        debug!(
            request_id = attempt.request_id,
            provider = %attempt.provider,
            attempt = attempt.attempt,
            candidate = attempt.candidate,
            streaming = attempt.streaming,
            "attempt started"
        );
    }

    fn on_attempt_failure(
        &self,
        attempt: &AttemptInfo<'_>,
        error: &NormalizedError,
        decision: RetryDecision,
    ) {
        let delay_ms = match decision {
            RetryDecision::Retry { delay } => delay.as_millis() as u64,
            _ => 0,
        };
        if error.retryable {
            warn!(
                request_id = attempt.request_id,
                provider = %attempt.provider,
                attempt = attempt.attempt,
                kind = %error.kind,
                decision = decision.as_str(),
                delay_ms,
                "attempt failed: {}",
                error.message
            );
        } else {
            warn!(
                request_id = attempt.request_id,
                provider = %attempt.provider,
                attempt = attempt.attempt,
                kind = %error.kind,
                status = error.status,
                decision = decision.as_str(),
                "attempt failed with non-retryable error: {}",
                error.message
            );
        }
    }

    fn on_success(&self, attempt: &AttemptInfo<'_>, elapsed: Duration) {
        info!(
            request_id = attempt.request_id,
            provider = %attempt.provider,
            attempt = attempt.attempt,
            fallback = attempt.candidate > 0,
            elapsed_ms = elapsed.as_millis() as u64,
            "dispatch succeeded"
        );
    }

    fn on_failure(&self, request_id: &str, error: &NormalizedError, elapsed: Duration) {
        match error.kind {
            ErrorKind::Cancelled => info!(request_id, "dispatch cancelled"),
            ErrorKind::ValidationError | ErrorKind::UnsupportedCapability => warn!(
                request_id,
                kind = %error.kind,
                "dispatch rejected: {}",
                error.message
            ),
            _ => error!(
                request_id,
                kind = %error.kind,
                causes = error.causes.len(),
                elapsed_ms = elapsed.as_millis() as u64,
                "dispatch failed: {}",
                error.message
            ),
        }
    }
}
