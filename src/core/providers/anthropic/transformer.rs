//! Anthropic Messages API transformation
//!
//! System instructions move to the top-level `system` field, the role vocabulary is
//! reduced to `user`/`assistant`, and tool results become `tool_result` blocks.

use chrono::Utc;
use serde_json::{Value, json};

use crate::core::types::{
    common::ProviderKey,
    errors::NormalizedError,
    requests::{AttachmentSource, ChatMessage, MessageRole, NormalizedRequest, ToolCall},
    responses::{Choice, FinishReason, NormalizedResponse, Usage},
};

/// Messages API requires `max_tokens`
pub const DEFAULT_MAX_TOKENS: u32 = 4096;

pub struct AnthropicRequestTransformer;

impl AnthropicRequestTransformer {
    pub fn transform(
        request: &NormalizedRequest,
        model: &str,
        stream: bool,
    ) -> Result<Value, NormalizedError> {
        let mut messages: Vec<Value> = Vec::new();
        let mut last_role: Option<&'static str> = None;

        for message in request.conversation() {
            let role = match message.role {
                MessageRole::Assistant => "assistant",
                _ => "user",
            };
            let blocks = Self::content_blocks(message)?;

            // Consecutive turns with the same role must be merged into one message
            if last_role == Some(role) {
                if let Some(Value::Array(existing)) =
                    messages.last_mut().and_then(|m| m.get_mut("content"))
                {
                    existing.extend(blocks);
                    continue;
                }
            }
            messages.push(json!({ "role": role, "content": blocks }));
            last_role = Some(role);
        }

        let mut body = json!({
            "model": model,
            "max_tokens": request.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            "messages": messages,
        });

        if let Some(system) = request.system_prompt() {
            body["system"] = json!(system);
        }
        if let Some(temperature) = request.temperature {
            body["temperature"] = json!(temperature);
        }
        if let Some(top_p) = request.top_p {
            body["top_p"] = json!(top_p);
        }
        if !request.stop.is_empty() {
            body["stop_sequences"] = json!(request.stop);
        }
        if !request.tools.is_empty() {
            let tools: Vec<Value> = request
                .tools
                .iter()
                .map(|tool| {
                    let mut value = json!({
                        "name": tool.name,
                        "input_schema": tool.parameters,
                    });
                    if let Some(description) = &tool.description {
                        value["description"] = json!(description);
                    }
                    value
                })
                .collect();
            body["tools"] = json!(tools);
        }
        if stream {
            body["stream"] = json!(true);
        }

        Ok(body)
    }

    fn content_blocks(message: &ChatMessage) -> Result<Vec<Value>, NormalizedError> {
        if message.role == MessageRole::Tool {
            let id = message.tool_call_id.clone().unwrap_or_default();
            return Ok(vec![json!({
                "type": "tool_result",
                "tool_use_id": id,
                "content": message.content,
            })]);
        }

        let mut blocks = Vec::new();
        if !message.content.is_empty() {
            blocks.push(json!({ "type": "text", "text": message.content }));
        }

        for attachment in &message.attachments {
            let block_type = if attachment.is_image() {
                "image"
            } else if attachment.media_type == "application/pdf" {
                "document"
            } else {
                return Err(NormalizedError::validation(format!(
                    "attachment type '{}' is not supported",
                    attachment.media_type
                )));
            };
            let source = match &attachment.source {
                AttachmentSource::Base64 { data } => json!({
                    "type": "base64",
                    "media_type": attachment.media_type,
                    "data": data,
                }),
                AttachmentSource::Url { url } => json!({ "type": "url", "url": url }),
            };
            blocks.push(json!({ "type": block_type, "source": source }));
        }

        for call in &message.tool_calls {
            let input: Value = if call.arguments.trim().is_empty() {
                json!({})
            } else {
                serde_json::from_str(&call.arguments).map_err(|e| {
                    NormalizedError::validation(format!(
                        "tool call '{}' has invalid JSON arguments: {}",
                        call.id, e
                    ))
                })?
            };
            blocks.push(json!({
                "type": "tool_use",
                "id": call.id,
                "name": call.name,
                "input": input,
            }));
        }

        Ok(blocks)
    }
}

pub struct AnthropicResponseTransformer;

impl AnthropicResponseTransformer {
    pub fn transform(
        body: Value,
        provider: &ProviderKey,
        requested_model: &str,
        latency_ms: u64,
    ) -> Result<NormalizedResponse, NormalizedError> {
        let blocks = body
            .get("content")
            .and_then(Value::as_array)
            .ok_or_else(|| NormalizedError::protocol("message has no content array"))?;

        let mut text = String::new();
        let mut tool_calls = Vec::new();
        for block in blocks {
            match block.get("type").and_then(Value::as_str) {
                Some("text") => {
                    if let Some(fragment) = block.get("text").and_then(Value::as_str) {
                        text.push_str(fragment);
                    }
                }
                Some("tool_use") => {
                    let id = block.get("id").and_then(Value::as_str);
                    let name = block.get("name").and_then(Value::as_str);
                    match (id, name) {
                        (Some(id), Some(name)) => tool_calls.push(ToolCall {
                            id: id.to_string(),
                            name: name.to_string(),
                            arguments: block.get("input").cloned().unwrap_or(json!({})).to_string(),
                        }),
                        _ => return Err(NormalizedError::protocol("tool_use block without id or name")),
                    }
                }
                _ => {}
            }
        }

        let usage = body.get("usage");
        let token = |field: &str| {
            usage
                .and_then(|u| u.get(field))
                .and_then(Value::as_u64)
                .unwrap_or(0)
        };

        Ok(NormalizedResponse {
            id: body
                .get("id")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
            provider: provider.clone(),
            model: body
                .get("model")
                .and_then(Value::as_str)
                .unwrap_or(requested_model)
                .to_string(),
            created_at: Utc::now(),
            choices: vec![Choice {
                index: 0,
                role: MessageRole::Assistant,
                content: text,
                tool_calls,
                finish_reason: body
                    .get("stop_reason")
                    .and_then(Value::as_str)
                    .map(parse_stop_reason),
            }],
            usage: Usage::from_counts(token("input_tokens"), token("output_tokens")),
            latency_ms,
        })
    }
}

/// Map an Anthropic stop reason
pub fn parse_stop_reason(reason: &str) -> FinishReason {
    match reason {
        "end_turn" | "stop_sequence" => FinishReason::Stop,
        "max_tokens" => FinishReason::Length,
        "tool_use" => FinishReason::ToolCalls,
        "refusal" => FinishReason::ContentFilter,
        _ => FinishReason::Other,
    }
}
