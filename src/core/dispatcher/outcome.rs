//! Dispatch metadata returned with a successful result

use std::time::Duration;

use crate::core::types::common::ProviderKey;

/// Result of a successful dispatch plus how it was obtained
#[derive(Debug, Clone)]
pub struct DispatchOutcome<T> {
    pub value: T,
    /// Provider that served the call
    pub provider: ProviderKey,
    /// Adapter calls made across all candidates, including the successful one
    pub attempts: u32,
    /// Served by a candidate other than the first
    pub used_fallback: bool,
    pub elapsed: Duration,
}

impl<T> DispatchOutcome<T> {
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> DispatchOutcome<U> {
        DispatchOutcome {
            value: f(self.value),
            provider: self.provider,
            attempts: self.attempts,
            used_fallback: self.used_fallback,
            elapsed: self.elapsed,
        }
    }

    pub fn into_value(self) -> T {
        self.value
    }
}
