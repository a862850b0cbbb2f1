//! In-process dispatch counters

use parking_lot::Mutex;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use super::{AttemptInfo, DispatchObserver, RetryDecision};
use crate::core::types::{
    common::ProviderKey,
    errors::{ErrorKind, NormalizedError},
};

/// Counters of one provider
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProviderStats {
    pub attempts: u64,
    pub successes: u64,
    pub retries: u64,
    pub fallbacks: u64,
    /// Failed attempts by error kind name
    pub failures: BTreeMap<String, u64>,
    /// Sum of successful dispatch latencies
    pub total_latency_ms: u64,
}

impl ProviderStats {
    pub fn failure_count(&self, kind: ErrorKind) -> u64 {
        self.failures.get(kind.as_str()).copied().unwrap_or(0)
    }

    pub fn average_latency_ms(&self) -> Option<u64> {
        (self.successes > 0).then(|| self.total_latency_ms / self.successes)
    }
}

/// Point-in-time copy of all counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub providers: BTreeMap<String, ProviderStats>,
    /// Calls that ended in an error, by kind name
    pub dispatch_failures: BTreeMap<String, u64>,
}

impl MetricsSnapshot {
    pub fn provider(&self, key: &str) -> Option<&ProviderStats> {
        self.providers.get(key)
    }
}

#[derive(Debug, Default)]
struct Counters {
    providers: HashMap<ProviderKey, ProviderStats>,
    dispatch_failures: HashMap<ErrorKind, u64>,
}

/// Observer keeping per-provider counters
#[derive(Debug, Default)]
pub struct MetricsObserver {
    counters: Mutex<Counters>,
}

impl MetricsObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let counters = self.counters.lock();
        MetricsSnapshot {
            providers: counters
                .providers
                .iter()
                .map(|(key, stats)| (key.to_string(), stats.clone()))
                .collect(),
            dispatch_failures: counters
                .dispatch_failures
                .iter()
                .map(|(kind, count)| (kind.as_str().to_string(), *count))
                .collect(),
        }
    }

    pub fn reset(&self) {
        *self.counters.lock() = Counters::default();
    }
}

impl DispatchObserver for MetricsObserver {
    fn on_attempt_start(&self, attempt: &AttemptInfo<'_>) {
        let mut counters = self.counters.lock();
        counters
            .providers
            .entry(attempt.provider.clone())
            .or_default()
            .attempts += 1;
    }

    fn on_attempt_failure(
        &self,
        attempt: &AttemptInfo<'_>,
        error: &NormalizedError,
        decision: RetryDecision,
    ) {
        let mut counters = self.counters.lock();
        let stats = counters
            .providers
            .entry(attempt.provider.clone())
            .or_default();
        *stats.failures.entry(error.kind.as_str().to_string()).or_insert(0) += 1;
        match decision {
            RetryDecision::Retry { .. } => stats.retries += 1,
            RetryDecision::Fallback => stats.fallbacks += 1,
            RetryDecision::GiveUp => {}
        }
    }

    fn on_success(&self, attempt: &AttemptInfo<'_>, elapsed: Duration) {
        let mut counters = self.counters.lock();
        let stats = counters
            .providers
            .entry(attempt.provider.clone())
            .or_default();
        stats.successes += 1;
        stats.total_latency_ms += elapsed.as_millis() as u64;
    }

    fn on_failure(&self, _request_id: &str, error: &NormalizedError, _elapsed: Duration) {
        *self
            .counters
            .lock()
            .dispatch_failures
            .entry(error.kind)
            .or_insert(0) += 1;
    }
}
