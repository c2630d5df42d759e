//! UI-agnostic conversation types
//!
//! This module contains the data structures shared between the session
//! controller and any front-end (TUI, web view, etc.). Nothing in here depends
//! on a UI framework.

use std::fmt;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::format::FormattedText;

/// Content shown in place of an answer while the assistant is thinking.
pub const THINKING_SENTINEL: &str = "Thinking...";

/// Identifier of a turn within one session. Assigned by the store on append.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TurnId(pub u64);

impl fmt::Display for TurnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The role of a chat message sender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChatRole {
    User,
    Assistant,
}

/// What a turn represents in the conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TurnKind {
    /// A real message that is part of the transmitted history.
    Message,
    /// The "thinking" stand-in for an assistant answer that has not arrived.
    Placeholder,
    /// An assistant-side notice shown after a failed request. Never transmitted.
    Notice,
}

/// One message in the conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub id: TurnId,
    pub role: ChatRole,
    pub kind: TurnKind,
    pub content: String,
    pub formatted: Option<FormattedText>,
    pub created_at: DateTime<Local>,
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(ChatRole::User, TurnKind::Message, content.into(), None)
    }

    pub fn assistant(content: impl Into<String>, formatted: FormattedText) -> Self {
        Self::new(ChatRole::Assistant, TurnKind::Message, content.into(), Some(formatted))
    }

    pub fn placeholder() -> Self {
        Self::new(ChatRole::Assistant, TurnKind::Placeholder, THINKING_SENTINEL.to_string(), None)
    }

    pub fn notice(content: impl Into<String>) -> Self {
        Self::new(ChatRole::Assistant, TurnKind::Notice, content.into(), None)
    }

    fn new(role: ChatRole, kind: TurnKind, content: String, formatted: Option<FormattedText>) -> Self {
        Self {
            id: TurnId::default(),
            role,
            kind,
            content,
            formatted,
            created_at: Local::now(),
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.kind == TurnKind::Placeholder
    }

    /// Whether this turn belongs in the history sent to the completion endpoint.
    pub fn is_transmittable(&self) -> bool {
        self.kind == TurnKind::Message
    }

    /// `HH:MM` display time.
    pub fn timestamp(&self) -> String {
        self.created_at.format("%H:%M").to_string()
    }
}
