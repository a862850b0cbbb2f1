//! OpenAI error mapping
//!
//! OpenAI wraps errors as `{"error": {"message", "type", "code"}}`.

use serde_json::Value;
use std::time::Duration;

use crate::core::traits::error_mapper::{ErrorMapper, classify_status, raw_body};
use crate::core::types::errors::NormalizedError;

/// Error mapper for OpenAI-compatible vendors
pub struct OpenAIErrorMapper;

impl ErrorMapper for OpenAIErrorMapper {
    fn map_http_error(&self, status: u16, body: &str, retry_after: Option<Duration>) -> NormalizedError {
        let raw = raw_body(body);
        let error = raw.get("error");
        let message = error
            .and_then(|e| e.get("message"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| format!("HTTP {}", status));
        let code = error_field(error, "code");
        let error_type = error_field(error, "type");

        let err = match (code.as_deref(), error_type.as_deref()) {
            // Billing exhaustion comes back as 429 but waiting does not help
            (Some("insufficient_quota"), _) | (_, Some("insufficient_quota")) => {
                NormalizedError::rate_limited(message, None).with_retryable(false)
            }
            (Some("invalid_api_key"), _) | (_, Some("authentication_error")) => {
                NormalizedError::auth(message)
            }
            (Some("context_length_exceeded"), _) => NormalizedError::validation(message),
            _ => classify_status(status, message, retry_after),
        };

        err.with_status(status).with_raw(raw)
    }
}

fn error_field(error: Option<&Value>, field: &str) -> Option<String> {
    error
        .and_then(|e| e.get(field))
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// Map an `error` object delivered inside a stream
pub fn map_stream_error(error: &Value) -> NormalizedError {
    let message = error
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or("stream error")
        .to_string();
    let err = match error.get("type").and_then(Value::as_str) {
        Some("invalid_request_error") => NormalizedError::validation(message),
        Some("rate_limit_exceeded") | Some("rate_limit_error") => {
            NormalizedError::rate_limited(message, None)
        }
        _ => NormalizedError::transient(message),
    };
    err.with_raw(error.clone())
}
