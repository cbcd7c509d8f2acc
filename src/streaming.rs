//! Incremental decoder for the chat endpoint's data-stream format.
//!
//! The endpoint answers with newline-terminated lines of the form
//! `<type>:<json>`. Text fragments use type `0` and carry a JSON string,
//! errors use type `3`, and `d` closes the message. Other part types are
//! accepted and skipped.

use crate::error::ChatError;

/// Longest excerpt of an offending line quoted in an error
const LINE_PREVIEW_CHARS: usize = 40;

/// One decoded line of the response body
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamPart {
    /// Text to append to the assistant message
    Text(String),
    /// Error reported by the endpoint mid-stream
    Error(String),
    /// Endpoint finished the message
    Finish,
}

/// Buffers raw body chunks until whole lines are available
#[derive(Debug, Default)]
pub struct StreamDecoder {
    buffer: Vec<u8>,
}

impl StreamDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a body chunk without decoding it
    pub fn extend(&mut self, chunk: &[u8]) {
        self.buffer.extend_from_slice(chunk);
    }

    /// Decode the next complete line, skipping lines that carry no part.
    ///
    /// Returns `None` once no whole line is buffered.
    pub fn next_part(&mut self) -> Result<Option<StreamPart>, ChatError> {
        while let Some(newline_pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=newline_pos).collect();
            if let Some(part) = decode_line(&line[..newline_pos])? {
                return Ok(Some(part));
            }
        }
        Ok(None)
    }

    /// Decode whatever is left once the body has ended
    pub fn finish(&mut self) -> Result<Option<StreamPart>, ChatError> {
        let rest = std::mem::take(&mut self.buffer);
        decode_line(&rest)
    }

    /// Whether bytes are waiting for a line terminator
    pub fn has_pending(&self) -> bool {
        !self.buffer.is_empty()
    }
}

fn decode_line(raw: &[u8]) -> Result<Option<StreamPart>, ChatError> {
    let line = std::str::from_utf8(raw)
        .map_err(|_| ChatError::MalformedStream("response is not valid UTF-8".to_string()))?;
    let line = line.trim_end_matches('\r');

    if line.trim().is_empty() {
        return Ok(None);
    }

    let Some((code, payload)) = line.split_once(':') else {
        return Err(ChatError::MalformedStream(format!(
            "missing part type in '{}'",
            preview(line)
        )));
    };

    match code {
        "0" => parse_string(payload).map(|text| Some(StreamPart::Text(text))),
        "3" => parse_string(payload).map(|message| Some(StreamPart::Error(message))),
        "d" => Ok(Some(StreamPart::Finish)),
        // data, annotations, tool calls, step markers
        "2" | "8" | "9" | "a" | "b" | "c" | "e" | "f" | "g" | "h" | "i" | "j" | "k" => Ok(None),
        other => Err(ChatError::MalformedStream(format!(
            "unknown part type '{}'",
            preview(other)
        ))),
    }
}

fn parse_string(payload: &str) -> Result<String, ChatError> {
    serde_json::from_str::<String>(payload).map_err(|_| {
        ChatError::MalformedStream(format!("expected a JSON string, got '{}'", preview(payload)))
    })
}

fn preview(text: &str) -> String {
    match text.char_indices().nth(LINE_PREVIEW_CHARS) {
        Some((idx, _)) => format!("{}…", &text[..idx]),
        None => text.to_string(),
    }
}
