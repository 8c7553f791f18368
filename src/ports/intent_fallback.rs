//! Intent Fallback Port - best-effort LLM classification.
//!
//! Consulted only when the pattern rule table produced no match. Failure
//! here is non-fatal: the caller defaults to a plain chat intent.

use async_trait::async_trait;

use crate::domain::intent::MessageIntent;
use crate::domain::session::ChatStage;

/// Failure of the fallback classification call. Recovered locally by the
/// classifier, never surfaced as a hard error.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ClassificationError {
    #[error("provider unavailable: {0}")]
    Unavailable(String),

    #[error("request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u32 },

    #[error("unrecognized intent label: {0}")]
    UnknownLabel(String),

    #[error("network error: {0}")]
    Network(String),
}

/// Port for the external intent-classification capability.
#[async_trait]
pub trait IntentFallback: Send + Sync {
    /// Classifies one message into an intent label.
    ///
    /// The current conversation stage is provided as context; implementations
    /// may use it to disambiguate short messages.
    async fn classify(
        &self,
        text: &str,
        stage: ChatStage,
    ) -> Result<MessageIntent, ClassificationError>;
}
