//! Conversation transcript entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::foundation::MessageId;

/// Who (or what) produced a transcript entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    /// Text typed by the human.
    User,
    /// Reply produced by the system.
    Assistant,
    /// Operational notice (session created, content ingested).
    System,
    /// Error surfaced to the user as part of the transcript.
    Error,
}

/// One entry in a session's message history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationMessage {
    pub id: MessageId,
    pub kind: MessageKind,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl ConversationMessage {
    pub fn new(kind: MessageKind, text: impl Into<String>) -> Self {
        Self {
            id: MessageId::new(),
            kind,
            text: text.into(),
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_get_unique_ids() {
        let a = ConversationMessage::new(MessageKind::User, "one");
        let b = ConversationMessage::new(MessageKind::User, "two");
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn kind_serializes_snake_case() {
        let json = serde_json::to_string(&MessageKind::Assistant).unwrap();
        assert_eq!(json, "\"assistant\"");
    }
}
