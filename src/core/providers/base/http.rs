//! Shared HTTP plumbing for adapters
//!
//! Client construction, header assembly and the request/response exchange. Every
//! helper returns a [`VendorFailure`] so adapters can normalize it in one place.

use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue, USER_AGENT};
use reqwest::{Client, Response};
use serde_json::Value;
use std::borrow::Cow;
use std::collections::HashMap;
use std::time::Duration;
use tracing::trace;

use super::config::AdapterConfig;
use crate::core::traits::error_mapper::VendorFailure;
use crate::core::types::errors::NormalizedError;

const CLIENT_USER_AGENT: &str = concat!("llm-relay/", env!("CARGO_PKG_VERSION"));

/// Longest body kept in diagnostics
const MAX_DIAGNOSTIC_BODY: usize = 4_096;

static SECRET_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(sk-[A-Za-z0-9_\-]{8,}|AIza[0-9A-Za-z_\-]{20,}|(?i:bearer)\s+[A-Za-z0-9._\-]{8,})")
        .expect("Invalid secret regex")
});

/// Build the HTTP client for one adapter
pub fn build_client(config: &AdapterConfig) -> Result<Client, NormalizedError> {
    Client::builder()
        .connect_timeout(config.connect_timeout())
        .user_agent(CLIENT_USER_AGENT)
        .build()
        .map_err(|e| NormalizedError::config(format!("failed to build HTTP client: {}", e)))
}

/// Vendor headers plus configured extras
///
/// Invalid names or values are configuration errors.
pub fn build_headers(
    vendor: &[(&str, &str)],
    extra: &HashMap<String, String>,
) -> Result<HeaderMap, NormalizedError> {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(USER_AGENT, HeaderValue::from_static(CLIENT_USER_AGENT));

    let pairs = vendor
        .iter()
        .map(|(name, value)| (*name, *value))
        .chain(extra.iter().map(|(name, value)| (name.as_str(), value.as_str())));

    for (name, value) in pairs {
        let header_name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| NormalizedError::config(format!("invalid header name '{}'", name)))?;
        let mut header_value = HeaderValue::from_str(value)
            .map_err(|_| NormalizedError::config(format!("invalid value for header '{}'", name)))?;
        if is_sensitive(name) {
            header_value.set_sensitive(true);
        }
        headers.insert(header_name, header_value);
    }

    Ok(headers)
}

fn is_sensitive(name: &str) -> bool {
    let name = name.to_ascii_lowercase();
    name == "authorization" || name.contains("api-key")
}

/// POST a JSON body and decode a JSON answer, bounded by `timeout`
pub async fn post_json(
    client: &Client,
    url: &str,
    headers: HeaderMap,
    body: &Value,
    timeout: Duration,
) -> Result<Value, VendorFailure> {
    let exchange = async {
        let response = client.post(url).headers(headers).json(body).send().await?;
        let response = ensure_success(response).await?;
        let text = response.text().await?;
        trace!(url = %url, body = %truncate(&text, 512), "vendor response");
        serde_json::from_str::<Value>(&text).map_err(|e| VendorFailure::Decode {
            message: e.to_string(),
            body: Some(diagnostic_body(&text)),
        })
    };

    match tokio::time::timeout(timeout, exchange).await {
        Ok(result) => result,
        Err(_) => Err(VendorFailure::Timeout(timeout)),
    }
}

/// POST a JSON body and return the response once the status line says success
///
/// Only the handshake is bounded by `timeout`; the caller owns the body stream.
pub async fn post_stream(
    client: &Client,
    url: &str,
    headers: HeaderMap,
    body: &Value,
    timeout: Duration,
) -> Result<Response, VendorFailure> {
    let handshake = async {
        let response = client.post(url).headers(headers).json(body).send().await?;
        ensure_success(response).await
    };

    match tokio::time::timeout(timeout, handshake).await {
        Ok(result) => result,
        Err(_) => Err(VendorFailure::Timeout(timeout)),
    }
}

/// Pass successful responses through, turn the rest into `VendorFailure::Http`
pub async fn ensure_success(response: Response) -> Result<Response, VendorFailure> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let retry_after = parse_retry_after(response.headers());
    let body = response.text().await.unwrap_or_default();
    Err(VendorFailure::Http {
        status: status.as_u16(),
        body: diagnostic_body(&body),
        retry_after,
    })
}

/// `retry-after-ms` or `retry-after` (seconds) header
pub fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    let read = |name: &str| headers.get(name).and_then(|v| v.to_str().ok()).map(str::trim);

    if let Some(ms) = read("retry-after-ms").and_then(|v| v.parse::<f64>().ok()) {
        if ms.is_finite() && ms >= 0.0 {
            return Some(Duration::from_millis(ms as u64));
        }
    }
    read("retry-after")
        .and_then(|v| v.parse::<f64>().ok())
        .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
}

/// Strip credentials that vendors sometimes echo back
pub fn redact_secrets(text: &str) -> Cow<'_, str> {
    SECRET_PATTERN.replace_all(text, "[REDACTED]")
}

/// Redacted and truncated body for error diagnostics
pub fn diagnostic_body(body: &str) -> String {
    truncate(&redact_secrets(body), MAX_DIAGNOSTIC_BODY).into_owned()
}

/// Cut `text` to at most `max` bytes on a char boundary
pub fn truncate(text: &str, max: usize) -> Cow<'_, str> {
    if text.len() <= max {
        return Cow::Borrowed(text);
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    Cow::Owned(format!("{}...", &text[..end]))
}
