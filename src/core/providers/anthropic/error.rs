//! Anthropic error mapping
//!
//! Errors arrive as `{"type": "error", "error": {"type", "message"}}`, both as HTTP
//! bodies and as `error` events inside a stream.

use serde_json::Value;
use std::time::Duration;

use crate::core::traits::error_mapper::{ErrorMapper, classify_status, raw_body};
use crate::core::types::errors::NormalizedError;

pub struct AnthropicErrorMapper;

impl ErrorMapper for AnthropicErrorMapper {
    fn map_http_error(&self, status: u16, body: &str, retry_after: Option<Duration>) -> NormalizedError {
        let raw = raw_body(body);
        let error = raw.get("error");
        let message = error
            .and_then(|e| e.get("message"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| format!("HTTP {}", status));

        let err = match error.and_then(|e| e.get("type")).and_then(Value::as_str) {
            Some(error_type) => map_error_type(error_type, message, retry_after)
                .unwrap_or_else(|message| classify_status(status, message, retry_after)),
            // 529 is Anthropic's "overloaded" status
            None if status == 529 => NormalizedError::transient(message),
            None => classify_status(status, message, retry_after),
        };

        err.with_status(status).with_raw(raw)
    }
}

/// Kind for a documented error type; hands the message back for unknown types
fn map_error_type(
    error_type: &str,
    message: String,
    retry_after: Option<Duration>,
) -> Result<NormalizedError, String> {
    Ok(match error_type {
        "authentication_error" | "permission_error" => NormalizedError::auth(message),
        "rate_limit_error" => NormalizedError::rate_limited(message, retry_after),
        "overloaded_error" | "api_error" | "timeout_error" => NormalizedError::transient(message),
        "invalid_request_error" | "not_found_error" | "request_too_large" => {
            NormalizedError::validation(message)
        }
        _ => return Err(message),
    })
}

/// Map the payload of an `error` stream event
pub fn map_stream_error(payload: &Value) -> NormalizedError {
    let error = payload.get("error").unwrap_or(payload);
    let message = error
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or("stream error")
        .to_string();
    let error_type = error.get("type").and_then(Value::as_str).unwrap_or("api_error");

    map_error_type(error_type, message, None)
        .unwrap_or_else(NormalizedError::transient)
        .with_raw(payload.clone())
}
