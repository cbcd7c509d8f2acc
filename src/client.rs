use crate::config::Config;
use crate::error::ChatError;
use crate::events::{Role, StreamEvent};
use crate::streaming::{StreamDecoder, StreamPart};
use anyhow::{Context, Result};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Capacity of the per-exchange event channel
const EVENT_BUFFER: usize = 1000;

/// Message in the request transcript
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

/// Body posted to the chat endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
}

/// Transport used by the session controller.
///
/// `open_stream` starts one exchange and returns its events in arrival order.
/// The channel ends with exactly one `Done` or `Failed` event. Cancelling the
/// token aborts the request.
pub trait ChatBackend: Send + Sync {
    fn open_stream(&self, request: ChatRequest, cancel: CancellationToken) -> mpsc::Receiver<StreamEvent>;
}

/// What to do after forwarding a decoded part
#[derive(Debug, PartialEq, Eq)]
enum Flow {
    Continue,
    Finished,
}

/// Streaming HTTP client for the chat endpoint
#[derive(Clone)]
pub struct HttpChatBackend {
    client: reqwest::Client,
    api_url: String,
    timeout: Duration,
}

impl HttpChatBackend {
    pub fn new(config: &Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.request_timeout())
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            api_url: config.api_url.clone(),
            timeout: config.request_timeout(),
        })
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// Post the transcript and forward decoded fragments until the stream ends
    async fn stream_exchange(
        client: reqwest::Client,
        api_url: String,
        timeout: Duration,
        request: ChatRequest,
        tx: mpsc::Sender<StreamEvent>,
        cancel: CancellationToken,
    ) -> Result<(), ChatError> {
        info!(url = %api_url, messages = request.messages.len(), "Opening chat stream");

        let send = client
            .post(&api_url)
            .header("Accept", "text/plain")
            .json(&request)
            .send();

        let response = tokio::select! {
            _ = cancel.cancelled() => return Err(ChatError::Cancelled),
            sent = tokio::time::timeout(timeout, send) => {
                sent.map_err(|_| ChatError::Timeout(timeout.as_secs()))?
                    .map_err(|err| ChatError::from_reqwest(err, timeout.as_secs()))?
            }
        };

        let status = response.status();
        if !status.is_success() {
            let body = tokio::time::timeout(timeout, response.text())
                .await
                .ok()
                .and_then(|text| text.ok())
                .unwrap_or_default();
            return Err(ChatError::Status {
                status: status.as_u16(),
                body: error_detail(&body),
            });
        }

        let mut stream = response.bytes_stream();
        let mut decoder = StreamDecoder::new();

        loop {
            let next = tokio::select! {
                _ = cancel.cancelled() => return Err(ChatError::Cancelled),
                next = tokio::time::timeout(timeout, stream.next()) => {
                    next.map_err(|_| ChatError::Timeout(timeout.as_secs()))?
                }
            };

            let Some(chunk) = next else {
                break;
            };
            let chunk = chunk.map_err(|err| ChatError::from_reqwest(err, timeout.as_secs()))?;

            decoder.extend(&chunk);
            while let Some(part) = decoder.next_part()? {
                if Self::forward(part, &tx).await? == Flow::Finished {
                    return Ok(());
                }
            }
        }

        if decoder.has_pending() {
            debug!("Body ended without a trailing newline");
            if let Some(part) = decoder.finish()? {
                Self::forward(part, &tx).await?;
            }
        }

        Ok(())
    }

    async fn forward(part: StreamPart, tx: &mpsc::Sender<StreamEvent>) -> Result<Flow, ChatError> {
        match part {
            StreamPart::Text(text) => {
                if text.is_empty() {
                    return Ok(Flow::Continue);
                }
                debug!(len = text.len(), "Received fragment");
                if tx.send(StreamEvent::Delta(text)).await.is_err() {
                    // Session is gone, nobody is listening
                    return Ok(Flow::Finished);
                }
                Ok(Flow::Continue)
            }
            StreamPart::Error(message) => Err(ChatError::Endpoint(message)),
            StreamPart::Finish => Ok(Flow::Finished),
        }
    }
}

impl ChatBackend for HttpChatBackend {
    fn open_stream(&self, request: ChatRequest, cancel: CancellationToken) -> mpsc::Receiver<StreamEvent> {
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);

        let client = self.client.clone();
        let api_url = self.api_url.clone();
        let timeout = self.timeout;

        tokio::spawn(async move {
            let outcome =
                Self::stream_exchange(client, api_url, timeout, request, tx.clone(), cancel).await;
            let event = match outcome {
                Ok(()) => StreamEvent::Done,
                Err(err) => {
                    warn!(error = %err, "Chat stream failed");
                    StreamEvent::Failed(err)
                }
            };
            let _ = tx.send(event).await;
        });

        rx
    }
}

/// Pull the human-readable part out of an error body
fn error_detail(body: &str) -> String {
    let parsed: Option<serde_json::Value> = serde_json::from_str(body).ok();
    parsed
        .as_ref()
        .and_then(|json| json.get("detail").or_else(|| json.get("error")))
        .and_then(|detail| detail.as_str())
        .map(str::to_string)
        .unwrap_or_else(|| body.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn request_serializes_like_the_endpoint_expects() {
        let request = ChatRequest {
            messages: vec![
                ChatMessage {
                    role: Role::User,
                    content: "What is Dharma?".to_string(),
                },
                ChatMessage {
                    role: Role::Assistant,
                    content: "Duty.".to_string(),
                },
            ],
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            serde_json::json!({
                "messages": [
                    {"role": "user", "content": "What is Dharma?"},
                    {"role": "assistant", "content": "Duty."}
                ]
            })
        );
    }

    #[test]
    fn error_detail_prefers_json_detail() {
        assert_eq!(error_detail("{\"detail\":\"No messages provided\"}"), "No messages provided");
        assert_eq!(error_detail("{\"error\":\"overloaded\"}"), "overloaded");
        assert_eq!(error_detail("Internal Server Error"), "Internal Server Error");
        assert_eq!(error_detail("{\"detail\":[1,2]}"), "{\"detail\":[1,2]}");
    }
}
