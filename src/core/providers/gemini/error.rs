//! Gemini error mapping
//!
//! Google APIs report `{"error": {"code", "message", "status", "details"}}` where
//! `status` is a canonical gRPC code name.

use serde_json::Value;
use std::time::Duration;

use crate::core::traits::error_mapper::{ErrorMapper, classify_status, raw_body};
use crate::core::types::errors::NormalizedError;

pub struct GeminiErrorMapper;

impl ErrorMapper for GeminiErrorMapper {
    fn map_http_error(&self, status: u16, body: &str, retry_after: Option<Duration>) -> NormalizedError {
        let raw = raw_body(body);
        let err = match raw.get("error") {
            Some(error) => map_error_object(error, retry_after)
                .unwrap_or_else(|message| classify_status(status, message, retry_after)),
            None => classify_status(status, format!("HTTP {}", status), retry_after),
        };
        err.with_status(status).with_raw(raw)
    }
}

/// Map an `error` object by its canonical status; hands the message back when unknown
fn map_error_object(error: &Value, retry_after: Option<Duration>) -> Result<NormalizedError, String> {
    let message = error
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or("request failed")
        .to_string();

    // An invalid key is reported as INVALID_ARGUMENT with a detail reason
    if has_reason(error, "API_KEY_INVALID") {
        return Ok(NormalizedError::auth(message));
    }

    Ok(match error.get("status").and_then(Value::as_str) {
        Some("UNAUTHENTICATED") | Some("PERMISSION_DENIED") => NormalizedError::auth(message),
        Some("RESOURCE_EXHAUSTED") => NormalizedError::rate_limited(message, retry_after),
        Some("UNAVAILABLE") | Some("INTERNAL") | Some("DEADLINE_EXCEEDED") | Some("ABORTED") => {
            NormalizedError::transient(message)
        }
        Some("INVALID_ARGUMENT") | Some("FAILED_PRECONDITION") | Some("NOT_FOUND") | Some("OUT_OF_RANGE") => {
            NormalizedError::validation(message)
        }
        _ => return Err(message),
    })
}

fn has_reason(error: &Value, reason: &str) -> bool {
    error
        .get("details")
        .and_then(Value::as_array)
        .is_some_and(|details| {
            details
                .iter()
                .any(|d| d.get("reason").and_then(Value::as_str) == Some(reason))
        })
}

/// Map an `error` object delivered inside a stream
pub fn map_stream_error(error: &Value) -> NormalizedError {
    map_error_object(error, None)
        .unwrap_or_else(NormalizedError::transient)
        .with_raw(error.clone())
}
