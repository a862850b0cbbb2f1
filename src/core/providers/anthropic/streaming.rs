//! Anthropic streaming
//!
//! The Messages stream is a sequence of named events. `message_start` carries the id,
//! model and prompt usage; content arrives as `content_block_*` events; the stop
//! reason and completion usage come in `message_delta`; `message_stop` ends it.

use serde_json::Value;
use std::collections::HashMap;

use super::error::map_stream_error;
use super::transformer::parse_stop_reason;
use crate::core::providers::base::sse::{SseEvent, SseTransformer};
use crate::core::types::{
    common::ProviderKey,
    errors::NormalizedError,
    requests::MessageRole,
    responses::{ChoiceDelta, ResponseChunk, ToolCallDelta, Usage, saturating_tokens},
};

pub struct AnthropicStreamTransformer {
    provider: ProviderKey,
    id: String,
    model: String,
    input_tokens: u32,
    /// Content block index -> ordinal among tool calls
    tool_blocks: HashMap<u64, u32>,
}

impl AnthropicStreamTransformer {
    pub fn new(provider: ProviderKey, requested_model: impl Into<String>) -> Self {
        Self {
            provider,
            id: String::new(),
            model: requested_model.into(),
            input_tokens: 0,
            tool_blocks: HashMap::new(),
        }
    }

    fn chunk(&self, delta: ChoiceDelta, usage: Option<Usage>) -> ResponseChunk {
        ResponseChunk {
            id: self.id.clone(),
            provider: self.provider.clone(),
            model: self.model.clone(),
            choices: vec![delta],
            usage,
        }
    }

    fn tool_delta(&self, call: ToolCallDelta) -> ChoiceDelta {
        ChoiceDelta {
            tool_calls: vec![call],
            ..ChoiceDelta::default()
        }
    }
}

fn event_type(event: &SseEvent, payload: &Value) -> Option<String> {
    event
        .event
        .clone()
        .or_else(|| payload.get("type").and_then(Value::as_str).map(str::to_string))
}

impl SseTransformer for AnthropicStreamTransformer {
    fn is_end_event(&self, event: &SseEvent) -> bool {
        match event.event.as_deref() {
            Some(name) => name == "message_stop",
            None => serde_json::from_str::<Value>(&event.data)
                .ok()
                .and_then(|v| v.get("type").and_then(Value::as_str).map(|t| t == "message_stop"))
                .unwrap_or(false),
        }
    }

    fn transform(&mut self, event: &SseEvent) -> Result<Option<ResponseChunk>, NormalizedError> {
        let payload: Value = serde_json::from_str(&event.data)
            .map_err(|e| NormalizedError::protocol(format!("malformed stream event: {}", e)))?;

        match event_type(event, &payload).as_deref() {
            Some("message_start") => {
                let message = payload.get("message");
                if let Some(id) = message.and_then(|m| m.get("id")).and_then(Value::as_str) {
                    self.id = id.to_string();
                }
                if let Some(model) = message.and_then(|m| m.get("model")).and_then(Value::as_str) {
                    self.model = model.to_string();
                }
                self.input_tokens = message
                    .and_then(|m| m.pointer("/usage/input_tokens"))
                    .and_then(Value::as_u64)
                    .map_or(0, saturating_tokens);
                Ok(Some(self.chunk(
                    ChoiceDelta {
                        role: Some(MessageRole::Assistant),
                        ..ChoiceDelta::default()
                    },
                    None,
                )))
            }
            Some("content_block_start") => {
                let block = payload.get("content_block");
                if block.and_then(|b| b.get("type")).and_then(Value::as_str) != Some("tool_use") {
                    return Ok(None);
                }
                let block_index = payload.get("index").and_then(Value::as_u64).unwrap_or(0);
                let ordinal = self.tool_blocks.len() as u32;
                self.tool_blocks.insert(block_index, ordinal);

                let call = ToolCallDelta {
                    index: ordinal,
                    id: block.and_then(|b| b.get("id")).and_then(Value::as_str).map(str::to_string),
                    name: block.and_then(|b| b.get("name")).and_then(Value::as_str).map(str::to_string),
                    arguments: None,
                };
                Ok(Some(self.chunk(self.tool_delta(call), None)))
            }
            Some("content_block_delta") => {
                let delta = payload.get("delta");
                match delta.and_then(|d| d.get("type")).and_then(Value::as_str) {
                    Some("text_delta") => {
                        let text = delta
                            .and_then(|d| d.get("text"))
                            .and_then(Value::as_str)
                            .unwrap_or_default();
                        Ok(Some(self.chunk(
                            ChoiceDelta {
                                content: Some(text.to_string()),
                                ..ChoiceDelta::default()
                            },
                            None,
                        )))
                    }
                    Some("input_json_delta") => {
                        let block_index = payload.get("index").and_then(Value::as_u64).unwrap_or(0);
                        let Some(ordinal) = self.tool_blocks.get(&block_index).copied() else {
                            return Err(NormalizedError::protocol(format!(
                                "input_json_delta for unknown block {}",
                                block_index
                            )));
                        };
                        let call = ToolCallDelta {
                            index: ordinal,
                            id: None,
                            name: None,
                            arguments: delta
                                .and_then(|d| d.get("partial_json"))
                                .and_then(Value::as_str)
                                .map(str::to_string),
                        };
                        Ok(Some(self.chunk(self.tool_delta(call), None)))
                    }
                    // thinking and signature deltas are not surfaced
                    _ => Ok(None),
                }
            }
            Some("message_delta") => {
                let finish_reason = payload
                    .pointer("/delta/stop_reason")
                    .and_then(Value::as_str)
                    .map(parse_stop_reason);
                let output_tokens = payload
                    .pointer("/usage/output_tokens")
                    .and_then(Value::as_u64)
                    .map(saturating_tokens);
                Ok(Some(self.chunk(
                    ChoiceDelta {
                        finish_reason,
                        ..ChoiceDelta::default()
                    },
                    output_tokens.map(|out| Usage::new(self.input_tokens, out)),
                )))
            }
            Some("error") => Err(map_stream_error(&payload)),
            // ping, content_block_stop
            _ => Ok(None),
        }
    }
}
