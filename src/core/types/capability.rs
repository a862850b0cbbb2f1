//! Capability descriptors
//!
//! Feature flags a provider declares at initialization and the dispatcher filters on.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// A single provider feature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// Chat completion
    Chat,
    /// Incremental delivery of chat output
    Streaming,
    /// Tool / function calling
    ToolCalling,
    /// Image input
    Vision,
    /// Embedding generation
    Embeddings,
    /// Dedicated system instruction
    SystemPrompt,
}

impl Capability {
    /// Every known capability
    pub const ALL: [Capability; 6] = [
        Capability::Chat,
        Capability::Streaming,
        Capability::ToolCalling,
        Capability::Vision,
        Capability::Embeddings,
        Capability::SystemPrompt,
    ];

    /// Wire name of the capability
    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::Chat => "chat",
            Capability::Streaming => "streaming",
            Capability::ToolCalling => "tool_calling",
            Capability::Vision => "vision",
            Capability::Embeddings => "embeddings",
            Capability::SystemPrompt => "system_prompt",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Capabilities of one provider plus its maximum context length in tokens
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilitySet {
    flags: BTreeSet<Capability>,
    max_context_tokens: u32,
}

impl CapabilitySet {
    /// Build a set from flags and a context length
    pub fn new(flags: impl IntoIterator<Item = Capability>, max_context_tokens: u32) -> Self {
        Self {
            flags: flags.into_iter().collect(),
            max_context_tokens,
        }
    }

    /// Add a flag
    pub fn with(mut self, capability: Capability) -> Self {
        self.flags.insert(capability);
        self
    }

    /// Remove a flag
    pub fn without(mut self, capability: Capability) -> Self {
        self.flags.remove(&capability);
        self
    }

    /// Replace the context length
    pub fn with_max_context_tokens(mut self, max_context_tokens: u32) -> Self {
        self.max_context_tokens = max_context_tokens;
        self
    }

    /// Whether the flag is present
    pub fn supports(&self, capability: Capability) -> bool {
        self.flags.contains(&capability)
    }

    /// Maximum context length in tokens
    pub fn max_context_tokens(&self) -> u32 {
        self.max_context_tokens
    }

    /// Iterate over the flags in a stable order
    pub fn iter(&self) -> impl Iterator<Item = Capability> + '_ {
        self.flags.iter().copied()
    }

    /// No flag set
    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }

    /// A set the registry accepts: at least one flag and a usable context length
    pub fn is_valid(&self) -> bool {
        !self.flags.is_empty() && self.max_context_tokens > 0
    }

    /// Whether this set covers `required` and, if given, the minimum context length
    pub fn satisfies<'a>(
        &self,
        required: impl IntoIterator<Item = &'a Capability>,
        min_context_tokens: Option<u32>,
    ) -> bool {
        let flags_ok = required.into_iter().all(|cap| self.flags.contains(cap));
        let context_ok = min_context_tokens.is_none_or(|min| self.max_context_tokens >= min);
        flags_ok && context_ok
    }

    /// Required flags this set lacks
    pub fn missing<'a>(
        &self,
        required: impl IntoIterator<Item = &'a Capability>,
    ) -> Vec<Capability> {
        required
            .into_iter()
            .filter(|cap| !self.flags.contains(cap))
            .copied()
            .collect()
    }
}

impl fmt::Display for CapabilitySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.flags.iter().map(Capability::as_str).collect();
        write!(f, "[{}] ctx={}", names.join(", "), self.max_context_tokens)
    }
}
