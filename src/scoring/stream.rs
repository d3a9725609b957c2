// src/scoring/stream.rs
//! Incremental decoding of a streamed messages response.
//!
//! The body is a sequence of lines; frames of interest start with `data: `.
//! Network chunks may end mid-line or mid-character, so bytes are buffered
//! until a full line is available.

use super::error::ScoringError;
use super::types::StreamEvent;
use tracing::{debug, warn};

const DONE_MARKER: &str = "[DONE]";

#[derive(Debug, Default)]
pub struct StreamAccumulator {
    buffer: Vec<u8>,
    text: String,
    done: bool,
}

impl StreamAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Feed one network chunk. Returns the text deltas completed by it.
    pub fn push_chunk(&mut self, chunk: &[u8]) -> Result<Vec<String>, ScoringError> {
        if self.done {
            return Ok(Vec::new());
        }
        self.buffer.extend_from_slice(chunk);

        let mut deltas = Vec::new();
        while let Some(newline) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=newline).collect();
            let line = String::from_utf8_lossy(&line[..line.len() - 1]).into_owned();
            if let Some(delta) = self.handle_line(&line)? {
                deltas.push(delta);
            }
            if self.done {
                self.buffer.clear();
                break;
            }
        }
        Ok(deltas)
    }

    /// End of body: a trailing line without a newline still counts.
    pub fn finish(mut self) -> Result<String, ScoringError> {
        if !self.done && !self.buffer.is_empty() {
            let rest = std::mem::take(&mut self.buffer);
            let line = String::from_utf8_lossy(&rest).into_owned();
            self.handle_line(&line)?;
        }
        Ok(self.text)
    }

    fn handle_line(&mut self, line: &str) -> Result<Option<String>, ScoringError> {
        let line = line.trim_end_matches('\r');
        let Some(payload) = line.strip_prefix("data:") else {
            return Ok(None);
        };
        let payload = payload.trim();

        if payload == DONE_MARKER {
            debug!("Stream finished with [DONE]");
            self.done = true;
            return Ok(None);
        }

        let event: StreamEvent = match serde_json::from_str(payload) {
            Ok(event) => event,
            Err(e) => {
                warn!("Skipping unparseable stream frame: {} ({})", payload, e);
                return Ok(None);
            }
        };

        match event.kind.as_str() {
            "content_block_delta" => {
                let Some(text) = event.delta.and_then(|delta| delta.text) else {
                    return Ok(None);
                };
                self.text.push_str(&text);
                Ok(Some(text))
            }
            "error" => {
                let message = event
                    .error
                    .map(|error| error.message)
                    .unwrap_or_else(|| payload.to_string());
                Err(ScoringError::Stream(message))
            }
            _ => Ok(None),
        }
    }
}
