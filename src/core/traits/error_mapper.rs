//! Vendor failure classification
//!
//! Every adapter funnels raw failures through an [`ErrorMapper`]. The generic mapping
//! classifies by HTTP status; vendor mappers refine it from the error body.

use serde_json::Value;
use std::time::Duration;

use crate::core::types::errors::{ErrorKind, NormalizedError};

/// Raw failure observed while talking to a vendor, before normalization
#[derive(Debug, Clone)]
pub enum VendorFailure {
    /// Non-success HTTP status
    Http {
        status: u16,
        body: String,
        retry_after: Option<Duration>,
    },
    /// Connection, TLS or I/O failure
    Transport { message: String, connect: bool },
    /// No answer within the allotted time
    Timeout(Duration),
    /// Vendor payload could not be decoded
    Decode { message: String, body: Option<String> },
}

impl From<reqwest::Error> for VendorFailure {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return VendorFailure::Timeout(Duration::ZERO);
        }
        if err.is_decode() {
            return VendorFailure::Decode {
                message: err.to_string(),
                body: None,
            };
        }
        VendorFailure::Transport {
            message: err.to_string(),
            connect: err.is_connect(),
        }
    }
}

impl From<serde_json::Error> for VendorFailure {
    fn from(err: serde_json::Error) -> Self {
        VendorFailure::Decode {
            message: err.to_string(),
            body: None,
        }
    }
}

/// Turns vendor failures into normalized errors
pub trait ErrorMapper: Send + Sync {
    /// Map a non-success HTTP response
    fn map_http_error(&self, status: u16, body: &str, retry_after: Option<Duration>) -> NormalizedError {
        classify_status(status, extract_message(body).unwrap_or_else(|| body.to_string()), retry_after)
            .with_raw(raw_body(body))
    }

    /// Map any failure
    fn map_failure(&self, failure: VendorFailure) -> NormalizedError {
        match failure {
            VendorFailure::Http {
                status,
                body,
                retry_after,
            } => self.map_http_error(status, &body, retry_after),
            VendorFailure::Transport { message, connect } => {
                let prefix = if connect { "connection failed" } else { "network error" };
                NormalizedError::transient(format!("{}: {}", prefix, message))
            }
            VendorFailure::Timeout(after) if after.is_zero() => {
                NormalizedError::transient("request timed out")
            }
            VendorFailure::Timeout(after) => NormalizedError::transient(format!(
                "request timed out after {} ms",
                after.as_millis()
            )),
            VendorFailure::Decode { message, body } => {
                let err = NormalizedError::protocol(format!("malformed vendor response: {}", message));
                match body {
                    Some(body) => err.with_raw(raw_body(&body)),
                    None => err,
                }
            }
        }
    }
}

/// Status-only mapping shared by every vendor
pub struct GenericErrorMapper;

impl ErrorMapper for GenericErrorMapper {}

/// Kind for a status code
pub fn classify_status(status: u16, message: String, retry_after: Option<Duration>) -> NormalizedError {
    let err = match status {
        401 | 403 => NormalizedError::auth(message),
        429 => NormalizedError::rate_limited(message, retry_after),
        408 | 409 | 425 => NormalizedError::transient(message),
        500..=599 => NormalizedError::transient(message),
        400..=499 => NormalizedError::validation(message),
        _ => NormalizedError::new(ErrorKind::ProtocolError, message),
    };
    err.with_status(status)
}

/// Best-effort `error.message` / `message` from a JSON error body
pub fn extract_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    value
        .pointer("/error/message")
        .or_else(|| value.get("message"))
        .or_else(|| value.get("error").filter(|e| e.is_string()))
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// Body as JSON when it parses, otherwise as a string
pub fn raw_body(body: &str) -> Value {
    serde_json::from_str(body).unwrap_or_else(|_| Value::String(body.to_string()))
}
