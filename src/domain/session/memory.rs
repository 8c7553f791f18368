//! Session memory aggregate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::foundation::SessionId;

use super::{ConversationMessage, MessageKind, PostContext};

/// Coarse conversation stage, advanced by the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatStage {
    /// No post in flight; free-form conversation.
    Conversing,
    /// The user was asked for source material and has not supplied it.
    AwaitingContent,
    /// A draft exists and is awaiting feedback or approval.
    ReviewingDraft,
    /// The user approved a draft; the session's post is final.
    Completed,
}

impl ChatStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatStage::Conversing => "conversing",
            ChatStage::AwaitingContent => "awaiting_content",
            ChatStage::ReviewingDraft => "reviewing_draft",
            ChatStage::Completed => "completed",
        }
    }
}

/// Everything the system remembers about one conversation.
///
/// Loaded at the start of a turn, mutated in memory, written back before the
/// reply is returned. The message history is FIFO-capped; the post context's
/// version lineage is not.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionMemory {
    pub id: SessionId,
    pub stage: ChatStage,
    messages: Vec<ConversationMessage>,
    pub context: Option<PostContext>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SessionMemory {
    /// Creates an empty session in the conversing stage.
    pub fn new(id: SessionId) -> Self {
        let now = Utc::now();
        Self {
            id,
            stage: ChatStage::Conversing,
            messages: Vec::new(),
            context: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Appends a message, dropping the oldest entries once the history
    /// exceeds `cap`.
    pub fn push_message(&mut self, kind: MessageKind, text: impl Into<String>, cap: usize) {
        self.messages.push(ConversationMessage::new(kind, text));
        if self.messages.len() > cap {
            let excess = self.messages.len() - cap;
            self.messages.drain(..excess);
        }
        self.touch();
    }

    /// Transcript, oldest first.
    pub fn messages(&self) -> &[ConversationMessage] {
        &self.messages
    }

    /// Installs the working post context, discarding any prior lineage.
    pub fn replace_context(&mut self, context: PostContext) {
        self.context = Some(context);
        self.touch();
    }

    /// Advances the conversation stage.
    pub fn set_stage(&mut self, stage: ChatStage) {
        self.stage = stage;
        self.touch();
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
