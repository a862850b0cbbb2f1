//! OpenAI streaming
//!
//! Chat Completions streams plain `data:` events terminated by `[DONE]`.

use super::error::map_stream_error;
use super::models::OpenAIStreamChunk;
use super::transformer::parse_finish_reason;
use crate::core::providers::base::sse::{SseEvent, SseTransformer};
use crate::core::types::{
    common::ProviderKey,
    errors::NormalizedError,
    requests::MessageRole,
    responses::{ChoiceDelta, ResponseChunk, ToolCallDelta, Usage},
};

/// SSE transformer for OpenAI-compatible streams
pub struct OpenAIStreamTransformer {
    provider: ProviderKey,
}

impl OpenAIStreamTransformer {
    pub fn new(provider: ProviderKey) -> Self {
        Self { provider }
    }
}

impl SseTransformer for OpenAIStreamTransformer {
    fn transform(&mut self, event: &SseEvent) -> Result<Option<ResponseChunk>, NormalizedError> {
        let chunk: OpenAIStreamChunk = serde_json::from_str(&event.data).map_err(|e| {
            NormalizedError::protocol(format!("malformed stream chunk: {}", e))
        })?;

        if let Some(error) = &chunk.error {
            return Err(map_stream_error(error));
        }

        // The usage-only chunk at the end has no choices
        if chunk.choices.is_empty() && chunk.usage.is_none() {
            return Ok(None);
        }

        let choices = chunk
            .choices
            .into_iter()
            .map(|choice| ChoiceDelta {
                index: choice.index,
                role: choice.delta.role.as_deref().and_then(|role| match role {
                    "assistant" => Some(MessageRole::Assistant),
                    _ => None,
                }),
                content: choice.delta.content,
                tool_calls: choice
                    .delta
                    .tool_calls
                    .unwrap_or_default()
                    .into_iter()
                    .map(|call| ToolCallDelta {
                        index: call.index,
                        id: call.id,
                        name: call.function.as_ref().and_then(|f| f.name.clone()),
                        arguments: call.function.and_then(|f| f.arguments),
                    })
                    .collect(),
                finish_reason: choice.finish_reason.as_deref().map(parse_finish_reason),
            })
            .collect();

        Ok(Some(ResponseChunk {
            id: chunk.id,
            provider: self.provider.clone(),
            model: chunk.model,
            choices,
            usage: chunk
                .usage
                .map(|u| Usage::from_counts(u.prompt_tokens, u.completion_tokens)),
        }))
    }
}
