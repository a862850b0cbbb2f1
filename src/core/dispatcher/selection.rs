//! Candidate selection
//!
//! Turns the registry and a policy into the ordered list of providers a call may try.
//! Runs before any network call, so capability mismatches fail without side effects.

use std::collections::{BTreeSet, HashSet};
use tracing::{debug, warn};

use super::policy::DispatchPolicy;
use crate::core::providers::{ProviderRegistry, RegistryEntry};
use crate::core::types::{
    capability::Capability, errors::NormalizedError, requests::NormalizedRequest,
};

/// Capabilities a candidate must have to serve `request`
pub fn required_capabilities(
    request: &NormalizedRequest,
    policy: &DispatchPolicy,
    streaming: bool,
) -> BTreeSet<Capability> {
    let mut required = request.required_capabilities();
    required.extend(policy.required_capabilities.iter().copied());
    if streaming {
        required.insert(Capability::Streaming);
    }
    required
}

/// Ordered, deduplicated candidates able to serve `request`
///
/// The override comes first when it is compatible, then `policy.order`. Unknown keys in
/// the order are skipped; an unknown override is a `ValidationError`. An empty result is
/// `UnsupportedCapability`.
pub fn select_candidates<'r>(
    registry: &'r ProviderRegistry,
    request: &NormalizedRequest,
    policy: &DispatchPolicy,
    streaming: bool,
) -> Result<Vec<&'r RegistryEntry>, NormalizedError> {
    let required = required_capabilities(request, policy, streaming);
    let compatible = |entry: &RegistryEntry| {
        entry
            .capabilities
            .satisfies(&required, policy.min_context_tokens)
    };

    let mut candidates = Vec::new();
    let mut seen = HashSet::new();

    if let Some(key) = &policy.provider_override {
        let entry = registry.entry(key.as_str()).map_err(|_| {
            NormalizedError::validation(format!("provider override '{}' is not registered", key))
        })?;
        seen.insert(key.clone());
        if compatible(entry) {
            candidates.push(entry);
        } else {
            debug!(
                provider = %key,
                missing = ?entry.capabilities.missing(&required),
                "provider override lacks required capabilities, skipped"
            );
        }
    }

    for key in &policy.order {
        if !seen.insert(key.clone()) {
            continue;
        }
        match registry.entry(key.as_str()) {
            Ok(entry) if compatible(entry) => candidates.push(entry),
            Ok(entry) => debug!(
                provider = %key,
                missing = ?entry.capabilities.missing(&required),
                max_context_tokens = entry.capabilities.max_context_tokens(),
                "provider lacks required capabilities, skipped"
            ),
            Err(_) => warn!(provider = %key, "unknown provider in dispatch order, skipped"),
        }
    }

    if candidates.is_empty() {
        let required: Vec<Capability> = required.into_iter().collect();
        let mut error = NormalizedError::unsupported_capability(&required);
        if let Some(min) = policy.min_context_tokens {
            error.message = format!("{} with at least {} context tokens", error.message, min);
        }
        return Err(error);
    }

    Ok(candidates)
}
