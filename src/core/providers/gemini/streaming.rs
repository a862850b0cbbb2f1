//! Gemini streaming
//!
//! With `alt=sse` every event is a complete `GenerateContentResponse` holding the next
//! slice of the answer. There is no end marker; the body simply ends.

use serde_json::Value;

use super::error::map_stream_error;
use super::transformer::{candidate_content, parse_finish_reason, usage_from};
use crate::core::providers::base::sse::{SseEvent, SseTransformer};
use crate::core::types::{
    common::ProviderKey,
    errors::NormalizedError,
    responses::{ChoiceDelta, ResponseChunk, ToolCallDelta},
};

pub struct GeminiStreamTransformer {
    provider: ProviderKey,
    id: String,
    model: String,
    tool_calls_seen: usize,
}

impl GeminiStreamTransformer {
    pub fn new(provider: ProviderKey, requested_model: impl Into<String>) -> Self {
        Self {
            provider,
            id: uuid::Uuid::new_v4().to_string(),
            model: requested_model.into(),
            tool_calls_seen: 0,
        }
    }
}

impl SseTransformer for GeminiStreamTransformer {
    fn is_end_event(&self, _event: &SseEvent) -> bool {
        false
    }

    fn requires_end_marker(&self) -> bool {
        false
    }

    fn transform(&mut self, event: &SseEvent) -> Result<Option<ResponseChunk>, NormalizedError> {
        let body: Value = serde_json::from_str(&event.data)
            .map_err(|e| NormalizedError::protocol(format!("malformed stream event: {}", e)))?;

        if let Some(error) = body.get("error") {
            return Err(map_stream_error(error));
        }
        if let Some(id) = body.get("responseId").and_then(Value::as_str) {
            self.id = id.to_string();
        }
        if let Some(model) = body.get("modelVersion").and_then(Value::as_str) {
            self.model = model.to_string();
        }

        let mut choices = Vec::new();
        for (position, candidate) in body
            .get("candidates")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default()
            .iter()
            .enumerate()
        {
            let first_call = self.tool_calls_seen;
            let content = candidate_content(candidate, first_call);
            self.tool_calls_seen += content.tool_calls.len();

            let finish_reason = candidate
                .get("finishReason")
                .and_then(Value::as_str)
                .map(|reason| parse_finish_reason(reason, self.tool_calls_seen > 0));

            choices.push(ChoiceDelta {
                index: candidate
                    .get("index")
                    .and_then(Value::as_u64)
                    .map(|i| i as u32)
                    .unwrap_or(position as u32),
                role: None,
                content: (!content.text.is_empty()).then_some(content.text),
                tool_calls: content
                    .tool_calls
                    .into_iter()
                    .enumerate()
                    .map(|(offset, call)| ToolCallDelta {
                        index: (first_call + offset) as u32,
                        id: Some(call.id),
                        name: Some(call.name),
                        arguments: Some(call.arguments),
                    })
                    .collect(),
                finish_reason,
            });
        }

        let usage = usage_from(&body);
        if choices.is_empty() && usage.is_none() {
            return Ok(None);
        }

        Ok(Some(ResponseChunk {
            id: self.id.clone(),
            provider: self.provider.clone(),
            model: self.model.clone(),
            choices,
            usage,
        }))
    }
}
