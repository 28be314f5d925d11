//! Conversation State
//!
//! Role-tagged message history for a single backend adapter. Every chat
//! backend in scope (cloud API, local model server, assistant daemon)
//! accepts the same `[{role, content}]` message shape, so the history is
//! kept in that wire form and serialized directly into requests.
//!
//! # Ownership
//!
//! A `ConversationState` is owned exclusively by one [`BackendAdapter`];
//! it is never shared between adapters, and the `&mut` access required to
//! append keeps concurrent mutation impossible.
//!
//! [`BackendAdapter`]: crate::backend::BackendAdapter

use serde::{Deserialize, Serialize};

/// Who authored a message
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The human (or the rendered prompt sent on their behalf)
    User,
    /// The model's reply
    Assistant,
    /// Conversation-level instructions
    System,
}

/// A single message in the conversation
///
/// Immutable once appended to a [`ConversationState`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Who sent this message
    pub role: Role,
    /// Message content
    pub content: String,
}

impl Message {
    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Create an assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    /// Create a system message
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }
}

/// Ordered message history for one adapter
///
/// Insertion order is significant and growth is unbounded within a process
/// lifetime. If a system prompt is present it is the first entry, inserted
/// at most once per adapter lifetime.
#[derive(Clone, Debug, Default)]
pub struct ConversationState {
    messages: Vec<Message>,
}

impl ConversationState {
    /// Create an empty conversation
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether any messages have been exchanged
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Number of messages in the history
    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// The full history, oldest first
    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Install a system prompt as the first entry
    ///
    /// Returns `false` without modifying the history if a system prompt is
    /// already installed. The prompt is always inserted at position 0.
    pub fn set_system(&mut self, prompt: impl Into<String>) -> bool {
        if matches!(self.messages.first(), Some(m) if m.role == Role::System) {
            return false;
        }
        self.messages.insert(0, Message::system(prompt));
        true
    }

    /// Append a user message
    pub fn push_user(&mut self, content: impl Into<String>) {
        self.messages.push(Message::user(content));
    }

    /// Append an assistant message
    pub fn push_assistant(&mut self, content: impl Into<String>) {
        self.messages.push(Message::assistant(content));
    }
}
