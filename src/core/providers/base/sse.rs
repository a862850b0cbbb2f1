//! Unified SSE (Server-Sent Events) parsing
//!
//! Vendors differ only in how an event's payload becomes a chunk and in how the end of
//! the stream is signalled, so adapters implement [`SseTransformer`] and reuse the
//! parser and the stream driver below.

use futures::StreamExt;
use std::time::Duration;
use tokio::time::Instant;

use crate::core::traits::error_mapper::{ErrorMapper, VendorFailure};
use crate::core::traits::provider::ChunkStream;
use crate::core::types::{
    common::ProviderKey, errors::NormalizedError, responses::ResponseChunk,
};

/// One dispatched SSE event
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SseEvent {
    /// Value of the `event:` field
    pub event: Option<String>,
    /// `data:` lines joined with `\n`
    pub data: String,
}

impl SseEvent {
    pub fn data(data: impl Into<String>) -> Self {
        Self {
            event: None,
            data: data.into(),
        }
    }

    pub fn named(event: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            event: Some(event.into()),
            data: data.into(),
        }
    }
}

/// Incremental SSE parser
///
/// Buffers raw bytes until a full line is available, so multi-byte characters split
/// across network reads decode correctly.
#[derive(Debug)]
pub struct SseParser {
    buffer: Vec<u8>,
    /// Leading bytes of `buffer` already known to hold no newline
    scanned: usize,
    max_line_bytes: usize,
    event: Option<String>,
    data: Vec<String>,
}

/// Longest line accepted before the stream is treated as malformed
pub const MAX_LINE_BYTES: usize = 1024 * 1024;

impl Default for SseParser {
    fn default() -> Self {
        Self {
            buffer: Vec::new(),
            scanned: 0,
            max_line_bytes: MAX_LINE_BYTES,
            event: None,
            data: Vec::new(),
        }
    }
}

impl SseParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_line_bytes(mut self, max_line_bytes: usize) -> Self {
        self.max_line_bytes = max_line_bytes;
        self
    }

    /// Feed bytes, returning every event completed by them
    pub fn feed(&mut self, bytes: &[u8]) -> Result<Vec<SseEvent>, NormalizedError> {
        self.buffer.extend_from_slice(bytes);

        let mut events = Vec::new();
        while let Some(offset) = self.buffer[self.scanned..].iter().position(|b| *b == b'\n') {
            let pos = self.scanned + offset;
            if pos > self.max_line_bytes {
                return Err(self.line_too_long());
            }
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            self.scanned = 0;
            let line = String::from_utf8_lossy(&line);
            let line = line.trim_end_matches(['\n', '\r']);
            if let Some(event) = self.process_line(line) {
                events.push(event);
            }
        }
        self.scanned = self.buffer.len();

        if self.buffer.len() > self.max_line_bytes {
            return Err(self.line_too_long());
        }
        Ok(events)
    }

    fn line_too_long(&mut self) -> NormalizedError {
        self.buffer.clear();
        self.scanned = 0;
        NormalizedError::protocol(format!(
            "event stream line exceeds {} bytes",
            self.max_line_bytes
        ))
    }

    /// Flush the pending event at end of input
    pub fn finish(&mut self) -> Option<SseEvent> {
        self.scanned = 0;
        if !self.buffer.is_empty() {
            let rest = std::mem::take(&mut self.buffer);
            let line = String::from_utf8_lossy(&rest).trim_end_matches('\r').to_string();
            if let Some(event) = self.process_line(&line) {
                return Some(event);
            }
        }
        self.dispatch()
    }

    fn process_line(&mut self, line: &str) -> Option<SseEvent> {
        if line.is_empty() {
            return self.dispatch();
        }
        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };

        match field {
            "data" => self.data.push(value.to_string()),
            "event" => self.event = Some(value.to_string()),
            _ => {}
        }
        None
    }

    fn dispatch(&mut self) -> Option<SseEvent> {
        if self.data.is_empty() {
            self.event = None;
            return None;
        }
        Some(SseEvent {
            event: self.event.take(),
            data: std::mem::take(&mut self.data).join("\n"),
        })
    }
}

/// Vendor-specific event handling
pub trait SseTransformer: Send + 'static {
    /// Whether this event is the vendor's end-of-stream marker
    fn is_end_event(&self, event: &SseEvent) -> bool {
        event.data.trim() == "[DONE]"
    }

    /// Whether the body must end with the marker; otherwise end of body is the end
    fn requires_end_marker(&self) -> bool {
        true
    }

    /// Turn one event into a chunk; `Ok(None)` skips bookkeeping events
    fn transform(&mut self, event: &SseEvent) -> Result<Option<ResponseChunk>, NormalizedError>;
}

/// Drive a vendor SSE body into a [`ChunkStream`]
///
/// The stream ends at the end marker, on the first error, or when `stream_timeout`
/// elapses. Dropping it drops the response body and with it the connection.
pub fn sse_chunk_stream<T, M>(
    response: reqwest::Response,
    mut transformer: T,
    mapper: M,
    provider: ProviderKey,
    stream_timeout: Duration,
) -> ChunkStream
where
    T: SseTransformer,
    M: ErrorMapper + 'static,
{
    let deadline = Instant::now() + stream_timeout;
    let mut body = Box::pin(response.bytes_stream());

    Box::pin(async_stream::stream! {
        let mut parser = SseParser::new();
        let mut ended = false;
        let mut failed = false;
        let mut eof = false;

        loop {
            let next = match tokio::time::timeout_at(deadline, body.next()).await {
                Ok(next) => next,
                Err(_) => {
                    yield Err(NormalizedError::transient(format!(
                        "stream exceeded {} ms limit",
                        stream_timeout.as_millis()
                    ))
                    .with_provider(provider.clone()));
                    failed = true;
                    break;
                }
            };

            let events = match next {
                Some(Ok(bytes)) => match parser.feed(&bytes) {
                    Ok(events) => events,
                    Err(e) => {
                        yield Err(e.with_provider(provider.clone()));
                        failed = true;
                        break;
                    }
                },
                Some(Err(e)) => {
                    yield Err(mapper
                        .map_failure(VendorFailure::from(e))
                        .with_provider(provider.clone()));
                    failed = true;
                    break;
                }
                None => {
                    eof = true;
                    parser.finish().into_iter().collect()
                }
            };

            for event in events {
                if transformer.is_end_event(&event) {
                    ended = true;
                    break;
                }
                match transformer.transform(&event) {
                    Ok(Some(chunk)) => yield Ok(chunk),
                    Ok(None) => {}
                    Err(e) => {
                        yield Err(e.with_provider(provider.clone()));
                        failed = true;
                        break;
                    }
                }
            }

            if ended || failed || eof {
                break;
            }
        }

        if eof && !ended && !failed && transformer.requires_end_marker() {
            yield Err(NormalizedError::protocol("stream ended before the end-of-stream marker")
                .with_provider(provider.clone()));
        }
    })
}
