//! Retry and backoff helpers

use rand::Rng;
use std::time::Duration;

use super::policy::BackoffConfig;
use crate::core::observability::RetryDecision;
use crate::core::types::errors::NormalizedError;

/// Whether the dispatcher may retry the same provider after `error`
pub fn is_retryable(error: &NormalizedError) -> bool {
    error.is_retryable()
}

/// Delay before retry number `retry` (1-based)
///
/// `initial * multiplier^(retry - 1)` capped at `max_delay`, then shifted by up to
/// `±jitter` of itself. A vendor retry-after hint raises the result, still capped at
/// `max_delay`.
pub fn backoff_delay(config: &BackoffConfig, retry: u32, retry_after: Option<Duration>) -> Duration {
    let max_ms = config.max_delay.as_secs_f64() * 1000.0;
    let exponent = retry.saturating_sub(1).min(64) as i32;
    let base_ms = (config.initial_delay.as_secs_f64() * 1000.0 * config.multiplier.powi(exponent))
        .min(max_ms);

    let jitter = config.jitter.clamp(0.0, 1.0);
    let offset_ms = if jitter > 0.0 {
        base_ms * jitter * rand::thread_rng().gen_range(-1.0..=1.0)
    } else {
        0.0
    };
    let mut delay_ms = (base_ms + offset_ms).clamp(0.0, max_ms);

    if let Some(hint) = retry_after {
        delay_ms = delay_ms.max(hint.as_secs_f64() * 1000.0).min(max_ms);
    }

    Duration::from_micros((delay_ms * 1000.0).round() as u64)
}

/// What to do after attempt `attempt` of `max_attempts` failed with `error`
pub fn next_step(
    error: &NormalizedError,
    attempt: u32,
    max_attempts: u32,
    more_candidates: bool,
    backoff: &BackoffConfig,
) -> RetryDecision {
    if is_retryable(error) && attempt < max_attempts {
        RetryDecision::Retry {
            delay: backoff_delay(backoff, attempt, error.retry_delay()),
        }
    } else if more_candidates {
        RetryDecision::Fallback
    } else {
        RetryDecision::GiveUp
    }
}
