//! Two-tier intent classifier: rules first, model fallback second.

use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::domain::session::ChatStage;
use crate::ports::IntentFallback;

use super::rules::{RuleTable, TurnInput};

/// What the user is trying to do with one message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageIntent {
    /// Revision directions for the active draft.
    Feedback,
    /// Acceptance of the active draft.
    Approval,
    /// Source material arriving as an uploaded file.
    FileContent,
    /// Source material or a topic arriving as text.
    TextContent,
    /// A question about what the system can do.
    Help,
    /// Anything else; also the safe default.
    Chat,
}

impl MessageIntent {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageIntent::Feedback => "feedback",
            MessageIntent::Approval => "approval",
            MessageIntent::FileContent => "file_content",
            MessageIntent::TextContent => "text_content",
            MessageIntent::Help => "help",
            MessageIntent::Chat => "chat",
        }
    }
}

impl FromStr for MessageIntent {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "feedback" => Ok(MessageIntent::Feedback),
            "approval" => Ok(MessageIntent::Approval),
            "file_content" => Ok(MessageIntent::FileContent),
            "text_content" => Ok(MessageIntent::TextContent),
            "help" => Ok(MessageIntent::Help),
            "chat" => Ok(MessageIntent::Chat),
            other => Err(format!("unknown intent label: {}", other)),
        }
    }
}

impl std::fmt::Display for MessageIntent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of classifying one turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntentDecision {
    pub intent: MessageIntent,
    /// True when the model fallback, not a rule, produced the intent.
    pub via_fallback: bool,
    /// Recoverable classification problem worth logging, never fatal.
    pub note: Option<String>,
}

impl IntentDecision {
    fn rule(intent: MessageIntent) -> Self {
        Self {
            intent,
            via_fallback: false,
            note: None,
        }
    }
}

/// Rules-then-fallback classifier.
///
/// A fallback failure is absorbed: the turn defaults to [`MessageIntent::Chat`]
/// and the problem is carried in the decision's note.
pub struct IntentClassifier {
    table: RuleTable,
    fallback: Arc<dyn IntentFallback>,
}

impl IntentClassifier {
    pub fn new(table: RuleTable, fallback: Arc<dyn IntentFallback>) -> Self {
        Self { table, fallback }
    }

    /// Pure rule pass; `None` means the fallback must decide.
    pub fn classify_rules(&self, input: &TurnInput<'_>) -> Option<MessageIntent> {
        self.table.first_match(input)
    }

    /// Full classification for one turn.
    pub async fn classify(&self, input: TurnInput<'_>, stage: ChatStage) -> IntentDecision {
        if let Some(intent) = self.classify_rules(&input) {
            return IntentDecision::rule(intent);
        }

        match self.fallback.classify(input.text, stage).await {
            Ok(intent) => IntentDecision {
                intent,
                via_fallback: true,
                note: None,
            },
            Err(e) => IntentDecision {
                intent: MessageIntent::Chat,
                via_fallback: true,
                note: Some(format!("intent fallback failed: {}", e)),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::ClassificationError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedFallback {
        intent: Result<MessageIntent, ClassificationError>,
        calls: AtomicUsize,
    }

    impl FixedFallback {
        fn returning(intent: MessageIntent) -> Self {
            Self {
                intent: Ok(intent),
                calls: AtomicUsize::new(0),
            }
        }

        fn failing() -> Self {
            Self {
                intent: Err(ClassificationError::Unavailable("down".into())),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl IntentFallback for FixedFallback {
        async fn classify(
            &self,
            _text: &str,
            _stage: ChatStage,
        ) -> Result<MessageIntent, ClassificationError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.intent.clone()
        }
    }

    fn input(text: &str) -> TurnInput<'_> {
        TurnInput {
            text,
            has_attachment: false,
        }
    }

    #[tokio::test]
    async fn rule_match_skips_the_fallback() {
        let fallback = Arc::new(FixedFallback::returning(MessageIntent::Chat));
        let classifier = IntentClassifier::new(RuleTable::default(), fallback.clone());

        let decision = classifier
            .classify(input("make it shorter"), ChatStage::ReviewingDraft)
            .await;

        assert_eq!(decision.intent, MessageIntent::Feedback);
        assert!(!decision.via_fallback);
        assert_eq!(fallback.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn unmatched_text_goes_to_fallback() {
        let fallback = Arc::new(FixedFallback::returning(MessageIntent::Approval));
        let classifier = IntentClassifier::new(RuleTable::default(), fallback.clone());

        let decision = classifier
            .classify(input("sounds about right to me"), ChatStage::ReviewingDraft)
            .await;

        assert_eq!(decision.intent, MessageIntent::Approval);
        assert!(decision.via_fallback);
        assert_eq!(fallback.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn fallback_failure_defaults_to_chat_with_note() {
        let fallback = Arc::new(FixedFallback::failing());
        let classifier = IntentClassifier::new(RuleTable::default(), fallback);

        let decision = classifier
            .classify(input("hmm okay then"), ChatStage::Conversing)
            .await;

        assert_eq!(decision.intent, MessageIntent::Chat);
        assert!(decision.via_fallback);
        assert!(decision.note.as_ref().unwrap().contains("fallback failed"));
    }

    #[test]
    fn intent_labels_round_trip() {
        for intent in [
            MessageIntent::Feedback,
            MessageIntent::Approval,
            MessageIntent::FileContent,
            MessageIntent::TextContent,
            MessageIntent::Help,
            MessageIntent::Chat,
        ] {
            assert_eq!(intent.as_str().parse::<MessageIntent>().unwrap(), intent);
        }
        assert!("party".parse::<MessageIntent>().is_err());
    }
}
