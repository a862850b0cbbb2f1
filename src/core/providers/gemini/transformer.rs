//! Gemini generateContent transformation

use chrono::Utc;
use serde_json::{Value, json};
use std::collections::HashMap;

use crate::core::types::{
    common::ProviderKey,
    errors::NormalizedError,
    requests::{AttachmentSource, ChatMessage, MessageRole, NormalizedRequest, ToolCall},
    responses::{Choice, FinishReason, NormalizedResponse, Usage},
};

pub struct GeminiRequestTransformer;

impl GeminiRequestTransformer {
    pub fn transform(request: &NormalizedRequest) -> Result<Value, NormalizedError> {
        // functionResponse parts are matched by name, tool messages only carry the call id
        let mut call_names: HashMap<&str, &str> = HashMap::new();
        let mut contents = Vec::new();

        for message in request.conversation() {
            for call in &message.tool_calls {
                call_names.insert(call.id.as_str(), call.name.as_str());
            }
            let role = match message.role {
                MessageRole::Assistant => "model",
                _ => "user",
            };
            let parts = Self::parts(message, &call_names)?;
            contents.push(json!({ "role": role, "parts": parts }));
        }

        let mut body = json!({ "contents": contents });

        if let Some(system) = request.system_prompt() {
            body["systemInstruction"] = json!({ "parts": [{ "text": system }] });
        }

        let mut generation_config = serde_json::Map::new();
        if let Some(max_tokens) = request.max_tokens {
            generation_config.insert("maxOutputTokens".into(), json!(max_tokens));
        }
        if let Some(temperature) = request.temperature {
            generation_config.insert("temperature".into(), json!(temperature));
        }
        if let Some(top_p) = request.top_p {
            generation_config.insert("topP".into(), json!(top_p));
        }
        if !request.stop.is_empty() {
            generation_config.insert("stopSequences".into(), json!(request.stop));
        }
        if !generation_config.is_empty() {
            body["generationConfig"] = Value::Object(generation_config);
        }

        if !request.tools.is_empty() {
            let declarations: Vec<Value> = request
                .tools
                .iter()
                .map(|tool| {
                    let mut decl = json!({ "name": tool.name, "parameters": tool.parameters });
                    if let Some(description) = &tool.description {
                        decl["description"] = json!(description);
                    }
                    decl
                })
                .collect();
            body["tools"] = json!([{ "functionDeclarations": declarations }]);
        }

        Ok(body)
    }

    fn parts(message: &ChatMessage, call_names: &HashMap<&str, &str>) -> Result<Vec<Value>, NormalizedError> {
        if message.role == MessageRole::Tool {
            let id = message.tool_call_id.as_deref().unwrap_or_default();
            let name = call_names.get(id).copied().unwrap_or(id);
            let response = match serde_json::from_str::<Value>(&message.content) {
                Ok(value @ Value::Object(_)) => value,
                _ => json!({ "content": message.content }),
            };
            return Ok(vec![json!({
                "functionResponse": { "name": name, "response": response }
            })]);
        }

        let mut parts = Vec::new();
        if !message.content.is_empty() {
            parts.push(json!({ "text": message.content }));
        }
        for attachment in &message.attachments {
            parts.push(match &attachment.source {
                AttachmentSource::Base64 { data } => json!({
                    "inlineData": { "mimeType": attachment.media_type, "data": data }
                }),
                AttachmentSource::Url { url } => json!({
                    "fileData": { "mimeType": attachment.media_type, "fileUri": url }
                }),
            });
        }
        for call in &message.tool_calls {
            let args: Value = if call.arguments.trim().is_empty() {
                json!({})
            } else {
                serde_json::from_str(&call.arguments).map_err(|e| {
                    NormalizedError::validation(format!(
                        "tool call '{}' has invalid JSON arguments: {}",
                        call.id, e
                    ))
                })?
            };
            parts.push(json!({ "functionCall": { "name": call.name, "args": args } }));
        }
        Ok(parts)
    }
}

/// Text and tool calls found in one candidate
pub(crate) struct CandidateContent {
    pub text: String,
    pub tool_calls: Vec<ToolCall>,
}

/// Collect the parts of `candidate`, numbering tool calls from `first_call`
pub(crate) fn candidate_content(candidate: &Value, first_call: usize) -> CandidateContent {
    let mut text = String::new();
    let mut tool_calls = Vec::new();
    let parts = candidate
        .pointer("/content/parts")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    for part in parts {
        // Thought summaries are not part of the answer
        if part.get("thought").and_then(Value::as_bool) == Some(true) {
            continue;
        }
        if let Some(fragment) = part.get("text").and_then(Value::as_str) {
            text.push_str(fragment);
        }
        if let Some(call) = part.get("functionCall") {
            let name = call.get("name").and_then(Value::as_str).unwrap_or_default();
            tool_calls.push(ToolCall {
                id: call
                    .get("id")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("call_{}", first_call + tool_calls.len())),
                name: name.to_string(),
                arguments: call.get("args").cloned().unwrap_or(json!({})).to_string(),
            });
        }
    }
    CandidateContent { text, tool_calls }
}

pub(crate) fn usage_from(body: &Value) -> Option<Usage> {
    let usage = body.get("usageMetadata")?;
    let count = |field: &str| usage.get(field).and_then(Value::as_u64).unwrap_or(0);
    Some(Usage::from_counts(count("promptTokenCount"), count("candidatesTokenCount")))
}

pub struct GeminiResponseTransformer;

impl GeminiResponseTransformer {
    pub fn transform(
        body: Value,
        provider: &ProviderKey,
        requested_model: &str,
        latency_ms: u64,
    ) -> Result<NormalizedResponse, NormalizedError> {
        let candidates = body.get("candidates").and_then(Value::as_array);

        let choices = match candidates {
            Some(candidates) if !candidates.is_empty() => candidates
                .iter()
                .enumerate()
                .map(|(index, candidate)| {
                    let content = candidate_content(candidate, 0);
                    let finish_reason = candidate
                        .get("finishReason")
                        .and_then(Value::as_str)
                        .map(|reason| parse_finish_reason(reason, !content.tool_calls.is_empty()));
                    Choice {
                        index: candidate
                            .get("index")
                            .and_then(Value::as_u64)
                            .map(|i| i as u32)
                            .unwrap_or(index as u32),
                        role: MessageRole::Assistant,
                        content: content.text,
                        tool_calls: content.tool_calls,
                        finish_reason,
                    }
                })
                .collect(),
            // A blocked prompt comes back without candidates
            _ if body.pointer("/promptFeedback/blockReason").is_some() => {
                vec![Choice::text(0, "", Some(FinishReason::ContentFilter))]
            }
            _ => return Err(NormalizedError::protocol("response has no candidates")),
        };

        Ok(NormalizedResponse {
            id: body
                .get("responseId")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
            provider: provider.clone(),
            model: body
                .get("modelVersion")
                .and_then(Value::as_str)
                .unwrap_or(requested_model)
                .to_string(),
            created_at: Utc::now(),
            choices,
            usage: usage_from(&body).unwrap_or_default(),
            latency_ms,
        })
    }
}

/// Map a Gemini finish reason; `STOP` after a function call means tool calls
pub fn parse_finish_reason(reason: &str, has_tool_calls: bool) -> FinishReason {
    match reason {
        "STOP" if has_tool_calls => FinishReason::ToolCalls,
        "STOP" => FinishReason::Stop,
        "MAX_TOKENS" => FinishReason::Length,
        "SAFETY" | "RECITATION" | "BLOCKLIST" | "PROHIBITED_CONTENT" | "SPII" => {
            FinishReason::ContentFilter
        }
        _ => FinishReason::Other,
    }
}
