//! Normalized request schema
//!
//! The provider-independent request every adapter translates into its vendor payload.

use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeSet, HashSet};

use super::capability::Capability;
use super::errors::NormalizedError;

/// Message role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
    Tool,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::System => "system",
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
            MessageRole::Tool => "tool",
        }
    }
}

/// Where attachment bytes come from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AttachmentSource {
    /// Inline base64 payload
    Base64 { data: String },
    /// Remote URL the vendor fetches itself
    Url { url: String },
}

/// Binary content attached to a message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    /// MIME type, e.g. `image/png`
    pub media_type: String,
    pub source: AttachmentSource,
}

impl Attachment {
    /// Attachment from raw bytes, stored base64 encoded
    pub fn from_bytes(media_type: impl Into<String>, bytes: &[u8]) -> Self {
        Self {
            media_type: media_type.into(),
            source: AttachmentSource::Base64 {
                data: base64::engine::general_purpose::STANDARD.encode(bytes),
            },
        }
    }

    /// Attachment referenced by URL
    pub fn from_url(media_type: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            media_type: media_type.into(),
            source: AttachmentSource::Url { url: url.into() },
        }
    }

    /// Images need a vision-capable provider
    pub fn is_image(&self) -> bool {
        self.media_type.starts_with("image/")
    }

    /// `data:` URI form used by OpenAI-style vendors
    pub fn to_data_uri(&self) -> String {
        match &self.source {
            AttachmentSource::Base64 { data } => format!("data:{};base64,{}", self.media_type, data),
            AttachmentSource::Url { url } => url.clone(),
        }
    }
}

/// Tool invocation requested by the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    /// JSON encoded arguments
    pub arguments: String,
}

/// Tool the model may call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// JSON schema of the arguments
    #[serde(default = "empty_object_schema")]
    pub parameters: Value,
}

fn empty_object_schema() -> Value {
    serde_json::json!({ "type": "object", "properties": {} })
}

impl ToolDefinition {
    pub fn new(name: impl Into<String>, description: impl Into<String>, parameters: Value) -> Self {
        Self {
            name: name.into(),
            description: Some(description.into()),
            parameters,
        }
    }
}

/// One conversation turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: MessageRole,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Attachment>,
    /// Tool calls made by an assistant turn
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    /// Call answered by a tool turn
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl ChatMessage {
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            attachments: Vec::new(),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(MessageRole::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }

    /// Result of a tool call
    pub fn tool(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            tool_call_id: Some(tool_call_id.into()),
            ..Self::new(MessageRole::Tool, content)
        }
    }

    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }

    pub fn with_tool_call(mut self, call: ToolCall) -> Self {
        self.tool_calls.push(call);
        self
    }
}

/// Provider-independent chat request
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NormalizedRequest {
    /// Target model; adapters may substitute their default model
    #[serde(default)]
    pub model: String,
    pub messages: Vec<ChatMessage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stop: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolDefinition>,
    #[serde(default)]
    pub stream: bool,
    /// Free-form caller metadata, never sent to vendors
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub metadata: serde_json::Map<String, Value>,
}

impl NormalizedRequest {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Default::default()
        }
    }

    pub fn message(mut self, message: ChatMessage) -> Self {
        self.messages.push(message);
        self
    }

    pub fn system(self, content: impl Into<String>) -> Self {
        self.message(ChatMessage::system(content))
    }

    pub fn user(self, content: impl Into<String>) -> Self {
        self.message(ChatMessage::user(content))
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_stop(mut self, stop: impl Into<String>) -> Self {
        self.stop.push(stop.into());
        self
    }

    pub fn with_tool(mut self, tool: ToolDefinition) -> Self {
        self.tools.push(tool);
        self
    }

    pub fn with_stream(mut self, stream: bool) -> Self {
        self.stream = stream;
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Capabilities implied by the request content
    pub fn required_capabilities(&self) -> BTreeSet<Capability> {
        let mut required = BTreeSet::from([Capability::Chat]);
        if self.stream {
            required.insert(Capability::Streaming);
        }
        if !self.tools.is_empty() || self.messages.iter().any(|m| !m.tool_calls.is_empty()) {
            required.insert(Capability::ToolCalling);
        }
        if self
            .messages
            .iter()
            .flat_map(|m| m.attachments.iter())
            .any(Attachment::is_image)
        {
            required.insert(Capability::Vision);
        }
        if self.messages.iter().any(|m| m.role == MessageRole::System) {
            required.insert(Capability::SystemPrompt);
        }
        required
    }

    /// All system messages joined, for vendors with a dedicated system field
    pub fn system_prompt(&self) -> Option<String> {
        let parts: Vec<&str> = self
            .messages
            .iter()
            .filter(|m| m.role == MessageRole::System)
            .map(|m| m.content.as_str())
            .collect();
        if parts.is_empty() {
            None
        } else {
            Some(parts.join("\n\n"))
        }
    }

    /// Messages other than system instructions, in order
    pub fn conversation(&self) -> impl Iterator<Item = &ChatMessage> {
        self.messages.iter().filter(|m| m.role != MessageRole::System)
    }

    /// Reject requests no provider could serve
    pub fn validate(&self) -> Result<(), NormalizedError> {
        if self.messages.is_empty() {
            return Err(NormalizedError::validation("request has no messages"));
        }
        if self.conversation().next().is_none() {
            return Err(NormalizedError::validation(
                "request has only system messages",
            ));
        }
        if let Some(temperature) = self.temperature {
            if !(0.0..=2.0).contains(&temperature) {
                return Err(NormalizedError::validation(format!(
                    "temperature {} outside [0, 2]",
                    temperature
                )));
            }
        }
        if let Some(top_p) = self.top_p {
            if !(top_p > 0.0 && top_p <= 1.0) {
                return Err(NormalizedError::validation(format!(
                    "top_p {} outside (0, 1]",
                    top_p
                )));
            }
        }
        if self.max_tokens == Some(0) {
            return Err(NormalizedError::validation("max_tokens must be positive"));
        }

        let mut seen = HashSet::new();
        for tool in &self.tools {
            if tool.name.trim().is_empty() {
                return Err(NormalizedError::validation("tool name cannot be empty"));
            }
            if !seen.insert(tool.name.as_str()) {
                return Err(NormalizedError::validation(format!(
                    "duplicate tool name '{}'",
                    tool.name
                )));
            }
        }

        for (index, message) in self.messages.iter().enumerate() {
            if message.role == MessageRole::Tool && message.tool_call_id.is_none() {
                return Err(NormalizedError::validation(format!(
                    "tool message at index {} has no tool_call_id",
                    index
                )));
            }
        }

        Ok(())
    }
}
