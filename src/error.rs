use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Longest endpoint error body kept in an error message
const MAX_BODY_CHARS: usize = 200;

/// Failures that end an exchange with the chat endpoint
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ChatError {
    /// Connection, DNS, TLS or body read failure
    #[error("Could not reach the chat service: {0}")]
    Transport(String),

    /// Endpoint answered with a non-success status
    #[error("Chat service returned HTTP {status}{}", format_body(.body))]
    Status { status: u16, body: String },

    /// Response body did not follow the data-stream format
    #[error("Chat service sent an unreadable response: {0}")]
    MalformedStream(String),

    /// Endpoint reported an error inside the stream
    #[error("Chat service reported an error: {0}")]
    Endpoint(String),

    /// No response or no new data within the configured timeout
    #[error("Chat service did not respond within {0} seconds")]
    Timeout(u64),

    /// Exchange was abandoned before it finished
    #[error("Request was cancelled")]
    Cancelled,
}

fn format_body(body: &str) -> String {
    let body = body.trim();
    if body.is_empty() {
        String::new()
    } else {
        format!(": {}", truncate(body, MAX_BODY_CHARS))
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}…", &text[..idx]),
        None => text.to_string(),
    }
}

impl ChatError {
    /// Classify a reqwest failure; its timeouts report `timeout_secs`
    pub fn from_reqwest(err: reqwest::Error, timeout_secs: u64) -> Self {
        if err.is_timeout() {
            return ChatError::Timeout(timeout_secs);
        }
        if let Some(status) = err.status() {
            return ChatError::Status {
                status: status.as_u16(),
                body: String::new(),
            };
        }
        ChatError::Transport(err.to_string())
    }
}

/// Category of a surfaced error, used for styling and tests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    Transport,
    Status,
    MalformedStream,
    Endpoint,
    Timeout,
    Cancelled,
}

/// Error shown in the conversation banner
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub kind: ErrorKind,
    pub message: String,
}

impl ChatError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ChatError::Transport(_) => ErrorKind::Transport,
            ChatError::Status { .. } => ErrorKind::Status,
            ChatError::MalformedStream(_) => ErrorKind::MalformedStream,
            ChatError::Endpoint(_) => ErrorKind::Endpoint,
            ChatError::Timeout(_) => ErrorKind::Timeout,
            ChatError::Cancelled => ErrorKind::Cancelled,
        }
    }
}

impl From<&ChatError> for ErrorInfo {
    fn from(err: &ChatError) -> Self {
        ErrorInfo {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}
