//! Conversation session controller.
//!
//! Owns the transcript, input buffer and the single in-flight exchange.
//! Every transition publishes a fresh [`SessionState`] snapshot to
//! subscribers.

use crate::client::{ChatBackend, ChatMessage, ChatRequest};
use crate::error::{ChatError, ErrorInfo};
use crate::events::{Message, MessageStatus, Role, StreamEvent};
use serde::Serialize;
use tokio::sync::mpsc::{self, error::TryRecvError};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Snapshot of one conversation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SessionState {
    pub messages: Vec<Message>,
    pub input_buffer: String,
    pub is_loading: bool,
    pub last_error: Option<ErrorInfo>,
}

/// Where the current exchange stands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangePhase {
    Idle,
    Pending,
    Streaming,
}

impl SessionState {
    pub fn phase(&self) -> ExchangePhase {
        match self.messages.last() {
            Some(m) if m.role == Role::Assistant && m.status == MessageStatus::Pending => ExchangePhase::Pending,
            Some(m) if m.role == Role::Assistant && m.status == MessageStatus::Streaming => ExchangePhase::Streaming,
            _ => ExchangePhase::Idle,
        }
    }
}

/// Result of a submission attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Exchange started; carries the id of the assistant placeholder
    Accepted { message_id: String },
    Rejected(RejectReason),
}

impl SubmitOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, SubmitOutcome::Accepted { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// Text was empty or whitespace only
    Empty,
    /// Another exchange is still running
    InFlight,
}

/// Runtime handle of the exchange in flight
struct Exchange {
    message_id: String,
    events: mpsc::Receiver<StreamEvent>,
    cancel: CancellationToken,
}

/// Controller for a single ephemeral conversation
pub struct SessionController<B: ChatBackend> {
    backend: B,
    state: SessionState,
    notifier: watch::Sender<SessionState>,
    exchange: Option<Exchange>,
}

impl<B: ChatBackend> SessionController<B> {
    pub fn new(backend: B) -> Self {
        let state = SessionState::default();
        let (notifier, _) = watch::channel(state.clone());

        Self {
            backend,
            state,
            notifier,
            exchange: None,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn messages(&self) -> &[Message] {
        &self.state.messages
    }

    /// Receive a snapshot after every state transition
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.notifier.subscribe()
    }

    pub fn update_input(&mut self, text: impl Into<String>) {
        self.state.input_buffer = text.into();
        self.publish();
    }

    /// Submit whatever is in the input buffer
    pub fn submit_input(&mut self) -> SubmitOutcome {
        let text = self.state.input_buffer.clone();
        self.submit(&text)
    }

    /// Start a new exchange with `text` as the user message.
    ///
    /// Rejected without any state change while another exchange is running
    /// or when `text` is blank.
    pub fn submit(&mut self, text: &str) -> SubmitOutcome {
        if self.state.is_loading || self.exchange.is_some() {
            debug!("Submission ignored, exchange in flight");
            return SubmitOutcome::Rejected(RejectReason::InFlight);
        }

        let text = text.trim();
        if text.is_empty() {
            return SubmitOutcome::Rejected(RejectReason::Empty);
        }

        let request = ChatRequest {
            messages: self.context_with(text),
        };

        let placeholder = Message::assistant_placeholder();
        let message_id = placeholder.id.clone();

        self.state.messages.push(Message::user(text));
        self.state.messages.push(placeholder);
        self.state.is_loading = true;
        self.state.input_buffer.clear();
        self.state.last_error = None;

        let cancel = CancellationToken::new();
        let events = self.backend.open_stream(request, cancel.clone());
        self.exchange = Some(Exchange {
            message_id: message_id.clone(),
            events,
            cancel,
        });

        info!(
            message_id = %message_id,
            transcript_len = self.state.messages.len(),
            "Exchange started"
        );
        self.publish();

        SubmitOutcome::Accepted { message_id }
    }

    /// Apply every event already delivered, without waiting.
    ///
    /// Returns whether the state changed.
    pub fn poll(&mut self) -> bool {
        let mut changed = false;

        while let Some(exchange) = self.exchange.as_mut() {
            match exchange.events.try_recv() {
                Ok(event) => {
                    self.apply(event);
                    changed = true;
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.apply(StreamEvent::Failed(stream_closed()));
                    changed = true;
                }
            }
        }

        changed
    }

    /// Wait for the next event of the current exchange and apply it.
    ///
    /// Returns `false` when no exchange is in flight.
    pub async fn next_event(&mut self) -> bool {
        let Some(exchange) = self.exchange.as_mut() else {
            return false;
        };

        let event = exchange
            .events
            .recv()
            .await
            .unwrap_or_else(|| StreamEvent::Failed(stream_closed()));
        self.apply(event);
        true
    }

    /// Drive the current exchange to completion or failure
    pub async fn finish_exchange(&mut self) {
        while self.next_event().await {}
    }

    /// Abort the exchange in flight; it ends as failed.
    ///
    /// Returns `false` when nothing was running.
    pub fn cancel(&mut self) -> bool {
        let Some(exchange) = self.exchange.as_ref() else {
            return false;
        };
        exchange.cancel.cancel();
        self.apply(StreamEvent::Failed(ChatError::Cancelled));
        true
    }

    fn apply(&mut self, event: StreamEvent) {
        let Some(exchange) = self.exchange.as_ref() else {
            return;
        };

        let Some(message) = self
            .state
            .messages
            .iter_mut()
            .rev()
            .find(|m| m.id == exchange.message_id)
        else {
            return;
        };

        if !message.status.is_open() {
            return;
        }

        let outcome = match event {
            StreamEvent::Delta(text) => {
                message.content.push_str(&text);
                message.status = MessageStatus::Streaming;
                None
            }
            StreamEvent::Done => {
                message.status = MessageStatus::Complete;
                Some(None)
            }
            StreamEvent::Failed(err) => {
                message.status = MessageStatus::Failed;
                Some(Some(err))
            }
        };

        if let Some(error) = outcome {
            self.end_exchange(error);
        }
        self.publish();
    }

    fn end_exchange(&mut self, error: Option<ChatError>) {
        let Some(exchange) = self.exchange.take() else {
            return;
        };
        self.state.is_loading = false;

        match error {
            None => info!(message_id = %exchange.message_id, "Exchange complete"),
            Some(err) => {
                warn!(message_id = %exchange.message_id, error = %err, "Exchange failed");
                self.state.last_error = Some(ErrorInfo::from(&err));
            }
        }
    }

    /// Prior transcript usable as context, followed by the new user message
    fn context_with(&self, text: &str) -> Vec<ChatMessage> {
        self.state
            .messages
            .iter()
            .filter(|m| m.status == MessageStatus::Complete)
            .map(|m| ChatMessage {
                role: m.role,
                content: m.content.clone(),
            })
            .chain(std::iter::once(ChatMessage {
                role: Role::User,
                content: text.to_string(),
            }))
            .collect()
    }

    fn publish(&self) {
        self.notifier.send_replace(self.state.clone());
    }
}

impl<B: ChatBackend> Drop for SessionController<B> {
    fn drop(&mut self) {
        if let Some(exchange) = self.exchange.take() {
            debug!(message_id = %exchange.message_id, "Session dropped, cancelling exchange");
            exchange.cancel.cancel();
        }
    }
}

fn stream_closed() -> ChatError {
    ChatError::Transport("the response stream ended unexpectedly".to_string())
}
