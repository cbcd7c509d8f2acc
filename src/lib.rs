//! Terminal client for The Modern Sage chat service.
//!
//! The [`session::SessionController`] owns the transcript and drives one
//! streaming exchange at a time through a [`client::ChatBackend`]. The
//! terminal UI in [`app`] and the one-shot [`headless`] mode both sit on top
//! of it.

pub mod app;
pub mod client;
pub mod config;
pub mod error;
pub mod events;
pub mod headless;
pub mod logging;
pub mod session;
pub mod streaming;
pub mod ui;

pub use client::{ChatBackend, ChatMessage, ChatRequest, HttpChatBackend};
pub use config::{Config, ConfigOverrides};
pub use error::{ChatError, ErrorInfo, ErrorKind};
pub use events::{Message, MessageStatus, Role};
pub use session::{ExchangePhase, RejectReason, SessionController, SessionState, SubmitOutcome};
