//! Normalized response schema

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::common::ProviderKey;
use super::requests::{MessageRole, ToolCall};

/// Why generation stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    Stop,
    Length,
    ToolCalls,
    ContentFilter,
    Other,
}

/// Token counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl Usage {
    pub fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens.saturating_add(completion_tokens),
        }
    }

    /// Counters as a vendor reports them
    pub fn from_counts(prompt_tokens: u64, completion_tokens: u64) -> Self {
        Self::new(saturating_tokens(prompt_tokens), saturating_tokens(completion_tokens))
    }
}

/// Vendor token count, saturating at `u32::MAX`
pub fn saturating_tokens(count: u64) -> u32 {
    u32::try_from(count).unwrap_or(u32::MAX)
}

/// One completion alternative
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Choice {
    pub index: u32,
    pub role: MessageRole,
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    pub finish_reason: Option<FinishReason>,
}

impl Choice {
    /// Assistant text choice
    pub fn text(index: u32, content: impl Into<String>, finish_reason: Option<FinishReason>) -> Self {
        Self {
            index,
            role: MessageRole::Assistant,
            content: content.into(),
            tool_calls: Vec::new(),
            finish_reason,
        }
    }
}

/// Provider-independent completion result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedResponse {
    pub id: String,
    /// Provider that produced the response
    pub provider: ProviderKey,
    /// Model that actually served the request
    pub model: String,
    pub created_at: DateTime<Utc>,
    pub choices: Vec<Choice>,
    pub usage: Usage,
    /// Wall-clock latency of the serving attempt
    pub latency_ms: u64,
}

impl NormalizedResponse {
    /// Text of the first choice
    pub fn text(&self) -> Option<&str> {
        self.choices.first().map(|c| c.content.as_str())
    }

    /// Finish reason of the first choice
    pub fn finish_reason(&self) -> Option<FinishReason> {
        self.choices.first().and_then(|c| c.finish_reason)
    }
}

/// Fragment of a tool call being streamed
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolCallDelta {
    pub index: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Partial JSON text of the arguments
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<String>,
}

/// Incremental update to one choice
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChoiceDelta {
    pub index: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<MessageRole>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCallDelta>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<FinishReason>,
}

/// Partial response delivered while streaming
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseChunk {
    pub id: String,
    pub provider: ProviderKey,
    pub model: String,
    pub choices: Vec<ChoiceDelta>,
    /// Usually present only on the final chunk
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

impl ResponseChunk {
    /// Chunk carrying a single text fragment for choice 0
    pub fn text(
        id: impl Into<String>,
        provider: ProviderKey,
        model: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            provider,
            model: model.into(),
            choices: vec![ChoiceDelta {
                content: Some(content.into()),
                ..Default::default()
            }],
            usage: None,
        }
    }

    /// Concatenated text of every choice delta
    pub fn content(&self) -> String {
        self.choices
            .iter()
            .filter_map(|c| c.content.as_deref())
            .collect()
    }

    /// Finish reason carried by any delta
    pub fn finish_reason(&self) -> Option<FinishReason> {
        self.choices.iter().find_map(|c| c.finish_reason)
    }
}
