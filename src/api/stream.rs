use super::logging::emit_sse_parse_error;
use crate::types::StreamEvent;
use anyhow::Result;

/// Incremental server-sent-event parser for the upstream byte stream.
///
/// Records may be split across network chunks; incomplete records stay
/// buffered until the blank-line terminator arrives. Unparsable records are
/// logged and skipped rather than failing the stream.
#[derive(Default)]
pub struct StreamParser {
    buffer: String,
}

impl StreamParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn process(&mut self, chunk: &[u8]) -> Result<Vec<StreamEvent>> {
        self.buffer.push_str(&String::from_utf8_lossy(chunk));
        let mut events = Vec::new();
        let mut start = 0;

        while let Some(end) = self.buffer[start..].find("\n\n") {
            let record_end = start + end + 2;
            let record = &self.buffer[start..record_end];

            let mut event_type = None;
            let mut data = None;

            for line in record.lines() {
                if let Some(rest) = line.strip_prefix("event: ") {
                    event_type = Some(rest.to_string());
                } else if let Some(rest) = line.strip_prefix("data: ") {
                    data = Some(rest.trim().to_string());
                }
            }

            if let Some(json_data) = data {
                if json_data == "[DONE]" {
                    start = record_end;
                    continue;
                }

                match serde_json::from_str::<StreamEvent>(&json_data) {
                    Ok(event) => events.push(event),
                    Err(error) => {
                        emit_sse_parse_error(event_type.as_deref(), &json_data, &error);
                    }
                }
            }

            start = record_end;
        }

        if start > 0 {
            self.buffer.drain(..start);
        }

        Ok(events)
    }

    /// Remaining unterminated bytes, surrendered at stream end.
    pub fn flush(&mut self) -> String {
        std::mem::take(&mut self.buffer)
    }
}
