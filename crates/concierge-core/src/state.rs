//! UI-agnostic conversation state types
//!
//! This module contains data structures that are published by the
//! conversation store and rendered by any front end (TUI, headless `ask`)
//! without depending on a specific UI framework.

use std::fmt;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// Identifier of a message within one session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MessageId(u64);

impl MessageId {
    pub(crate) fn new(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The role of a chat message sender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChatRole {
    User,
    Assistant,
}

/// A chat message in the conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub role: ChatRole,
    pub content: String,
    pub timestamp: DateTime<Local>,
}

impl Message {
    pub fn new(id: MessageId, role: ChatRole, content: impl Into<String>) -> Self {
        Self {
            id,
            role,
            content: content.into(),
            timestamp: Local::now(),
        }
    }

    /// Wall-clock time as shown next to the message ("14:05")
    pub fn time_label(&self) -> String {
        self.timestamp.format("%H:%M").to_string()
    }
}

/// Snapshot of the conversation published after every store mutation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatState {
    pub messages: Vec<Message>,
    pub is_loading: bool,
    pub error: Option<String>,
    /// Bumped once per publish
    pub revision: u64,
}

impl ChatState {
    pub fn message(&self, id: MessageId) -> Option<&Message> {
        self.messages.iter().find(|m| m.id == id)
    }

    pub(crate) fn message_mut(&mut self, id: MessageId) -> Option<&mut Message> {
        self.messages.iter_mut().find(|m| m.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_label_is_hours_and_minutes() {
        let msg = Message::new(MessageId::new(1), ChatRole::User, "hi");
        let label = msg.time_label();
        assert_eq!(label.len(), 5);
        assert_eq!(&label[2..3], ":");
    }

    #[test]
    fn test_message_lookup_by_id() {
        let state = ChatState {
            messages: vec![
                Message::new(MessageId::new(1), ChatRole::User, "a"),
                Message::new(MessageId::new(2), ChatRole::Assistant, "b"),
            ],
            ..ChatState::default()
        };
        assert_eq!(state.message(MessageId::new(2)).map(|m| m.content.as_str()), Some("b"));
        assert!(state.message(MessageId::new(3)).is_none());
    }
}
