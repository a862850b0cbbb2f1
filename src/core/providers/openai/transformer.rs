//! OpenAI request and response transformers
//!
//! Conversion between the normalized schema and the Chat Completions wire format.

use chrono::Utc;
use serde_json::Value;

use super::models::*;
use crate::core::types::{
    common::ProviderKey,
    errors::NormalizedError,
    requests::{ChatMessage, MessageRole, NormalizedRequest, ToolCall},
    responses::{Choice, FinishReason, NormalizedResponse, Usage},
};

/// Request transformer
pub struct OpenAIRequestTransformer;

impl OpenAIRequestTransformer {
    /// Build the wire request for `model`
    pub fn transform(
        request: &NormalizedRequest,
        model: String,
        stream: bool,
    ) -> Result<OpenAIChatRequest, NormalizedError> {
        let messages = request
            .messages
            .iter()
            .map(Self::transform_message)
            .collect::<Result<Vec<_>, _>>()?;

        let tools = if request.tools.is_empty() {
            None
        } else {
            Some(
                request
                    .tools
                    .iter()
                    .map(|tool| OpenAITool {
                        tool_type: "function".to_string(),
                        function: OpenAIFunctionDef {
                            name: tool.name.clone(),
                            description: tool.description.clone(),
                            parameters: tool.parameters.clone(),
                        },
                    })
                    .collect(),
            )
        };

        Ok(OpenAIChatRequest {
            model,
            messages,
            temperature: request.temperature,
            top_p: request.top_p,
            max_tokens: request.max_tokens,
            stop: (!request.stop.is_empty()).then(|| request.stop.clone()),
            tools,
            stream: stream.then_some(true),
            stream_options: stream.then_some(OpenAIStreamOptions { include_usage: true }),
        })
    }

    fn transform_message(message: &ChatMessage) -> Result<OpenAIMessage, NormalizedError> {
        let content = if message.attachments.is_empty() {
            if message.content.is_empty() && !message.tool_calls.is_empty() {
                None
            } else {
                Some(Value::String(message.content.clone()))
            }
        } else {
            let mut parts = Vec::with_capacity(message.attachments.len() + 1);
            if !message.content.is_empty() {
                parts.push(OpenAIContentPart::Text {
                    text: message.content.clone(),
                });
            }
            for attachment in &message.attachments {
                if !attachment.is_image() {
                    return Err(NormalizedError::validation(format!(
                        "attachment type '{}' is not supported",
                        attachment.media_type
                    )));
                }
                parts.push(OpenAIContentPart::ImageUrl {
                    image_url: OpenAIImageUrl {
                        url: attachment.to_data_uri(),
                    },
                });
            }
            Some(serde_json::to_value(parts).map_err(|e| {
                NormalizedError::validation(format!("failed to encode content parts: {}", e))
            })?)
        };

        let tool_calls = (!message.tool_calls.is_empty()).then(|| {
            message
                .tool_calls
                .iter()
                .map(|call| OpenAIToolCall {
                    id: call.id.clone(),
                    call_type: "function".to_string(),
                    function: OpenAIFunctionCall {
                        name: call.name.clone(),
                        arguments: call.arguments.clone(),
                    },
                })
                .collect()
        });

        Ok(OpenAIMessage {
            role: message.role.as_str().to_string(),
            content,
            tool_calls,
            tool_call_id: message.tool_call_id.clone(),
        })
    }
}

/// Response transformer
pub struct OpenAIResponseTransformer;

impl OpenAIResponseTransformer {
    /// Map a decoded response body
    pub fn transform(
        body: Value,
        provider: &ProviderKey,
        requested_model: &str,
        latency_ms: u64,
    ) -> Result<NormalizedResponse, NormalizedError> {
        let response: OpenAIChatResponse = serde_json::from_value(body).map_err(|e| {
            NormalizedError::protocol(format!("unexpected chat completion shape: {}", e))
        })?;

        if response.choices.is_empty() {
            return Err(NormalizedError::protocol("chat completion has no choices"));
        }

        let choices = response
            .choices
            .into_iter()
            .map(|choice| Choice {
                index: choice.index,
                role: MessageRole::Assistant,
                content: choice.message.content.unwrap_or_default(),
                tool_calls: choice
                    .message
                    .tool_calls
                    .unwrap_or_default()
                    .into_iter()
                    .map(|call| ToolCall {
                        id: call.id,
                        name: call.function.name,
                        arguments: call.function.arguments,
                    })
                    .collect(),
                finish_reason: choice.finish_reason.as_deref().map(parse_finish_reason),
            })
            .collect();

        let usage = response
            .usage
            .map(|u| Usage::from_counts(u.prompt_tokens, u.completion_tokens))
            .unwrap_or_default();

        Ok(NormalizedResponse {
            id: if response.id.is_empty() {
                uuid::Uuid::new_v4().to_string()
            } else {
                response.id
            },
            provider: provider.clone(),
            model: if response.model.is_empty() {
                requested_model.to_string()
            } else {
                response.model
            },
            created_at: Utc::now(),
            choices,
            usage,
            latency_ms,
        })
    }
}

/// Map an OpenAI finish reason
pub fn parse_finish_reason(reason: &str) -> FinishReason {
    match reason {
        "stop" => FinishReason::Stop,
        "length" => FinishReason::Length,
        "tool_calls" | "function_call" => FinishReason::ToolCalls,
        "content_filter" => FinishReason::ContentFilter,
        _ => FinishReason::Other,
    }
}
