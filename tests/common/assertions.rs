//! Custom assertions for tests

use futures::StreamExt;

use llm_relay::core::types::{ErrorKind, NormalizedError, NormalizedResponse, ResponseChunk};
use llm_relay::ResponseStream;

/// Assertions for normalized responses
pub trait ResponseAssertions {
    fn assert_served_by(&self, provider: &str);
    fn assert_text(&self, expected: &str);
}

impl ResponseAssertions for NormalizedResponse {
    fn assert_served_by(&self, provider: &str) {
        assert_eq!(self.provider.as_str(), provider, "response served by wrong provider");
    }

    fn assert_text(&self, expected: &str) {
        assert!(!self.choices.is_empty(), "response has no choices");
        assert_eq!(self.text(), Some(expected));
    }
}

/// Assert an error kind, printing the whole error on mismatch
pub fn assert_kind(error: &NormalizedError, kind: ErrorKind) {
    assert_eq!(error.kind, kind, "unexpected error: {:?}", error);
}

/// Drain a stream into its chunks and the error that ended it, if any
pub async fn collect_stream(mut stream: ResponseStream) -> (Vec<ResponseChunk>, Option<NormalizedError>) {
    let mut chunks = Vec::new();
    while let Some(item) = stream.next().await {
        match item {
            Ok(chunk) => chunks.push(chunk),
            Err(error) => {
                assert!(stream.next().await.is_none(), "stream continued after an error");
                return (chunks, Some(error));
            }
        }
    }
    (chunks, None)
}

/// Concatenated text of every chunk
pub fn joined_text(chunks: &[ResponseChunk]) -> String {
    chunks.iter().map(ResponseChunk::content).collect()
}
