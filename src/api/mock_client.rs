use crate::api::client::{ByteStream, MockStreamProducer};
use crate::types::ApiMessage;
use anyhow::Result;
use bytes::Bytes;
use futures::stream;
use std::sync::{Arc, Mutex};

/// Serves pre-scripted SSE chunk sequences, one sequence per turn.
///
/// Each scripted chunk that does not already end with the blank-line record
/// terminator gets one appended, so test scripts can list bare
/// `event:`/`data:` records without hand-writing SSE framing. Sequences are
/// consumed in order; requesting a turn beyond the script is an error.
#[derive(Clone)]
pub struct MockAgentClient {
    responses: Arc<Mutex<Vec<Vec<String>>>>,
}

impl MockAgentClient {
    pub fn new(responses: Vec<Vec<String>>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses)),
        }
    }
}

impl MockStreamProducer for MockAgentClient {
    fn create_mock_stream(&self, _messages: &[ApiMessage]) -> Result<ByteStream> {
        let mut responses_guard = self.responses.lock().unwrap();
        if responses_guard.is_empty() {
            return Err(anyhow::anyhow!(
                "MockAgentClient: No more responses configured"
            ));
        }
        let current_sse_chunks = responses_guard.remove(0);

        let sse_byte_chunks: Vec<Result<Bytes>> = current_sse_chunks
            .into_iter()
            .map(|s| {
                let framed = if s.ends_with("\n\n") {
                    s
                } else {
                    format!("{s}\n\n")
                };
                Ok(Bytes::from(framed))
            })
            .collect();

        Ok(Box::pin(stream::iter(sse_byte_chunks)))
    }
}
