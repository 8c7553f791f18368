//! Generation Port - Interface for the content generation and critique
//! capability.
//!
//! The refinement engine never talks to a model-serving backend directly;
//! it asks this port for a structured post or a structured assessment and
//! treats both as opaque capabilities.

use async_trait::async_trait;

use crate::domain::content::{CritiqueResult, GeneratedPost};
use crate::domain::workflow::WorkflowState;

/// What kind of generation call the engine is making.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GenerationMode {
    /// First draft from source material.
    Draft,
    /// Replacement draft conditioned on critique and feedback.
    Refine,
    /// Final surface-level tightening pass.
    Polish,
}

impl GenerationMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            GenerationMode::Draft => "draft",
            GenerationMode::Refine => "refine",
            GenerationMode::Polish => "polish",
        }
    }
}

/// Everything a generation call may be conditioned on.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub mode: GenerationMode,
    pub source_content: String,
    pub insights: Vec<String>,
    pub requirements: Option<String>,
    pub prior_post: Option<GeneratedPost>,
    pub prior_critique: Option<CritiqueResult>,
    pub feedback: Option<String>,
}

impl GenerationRequest {
    /// Builds a request from the workflow state for the given mode.
    ///
    /// Refine and polish requests carry the prior post and critique as
    /// refinement context; a draft request starts from the source alone.
    pub fn from_state(state: &WorkflowState, mode: GenerationMode) -> Self {
        Self {
            mode,
            source_content: state.source_content.clone(),
            insights: state.insights.clone(),
            requirements: state.requirements.clone(),
            prior_post: state.current_post.clone(),
            prior_critique: state.latest_critique.clone(),
            feedback: state.feedback.clone(),
        }
    }
}

/// Failure producing a structured post.
///
/// Fatal to the current engine run; the session remains usable for a retry.
#[derive(Debug, Clone, thiserror::Error)]
pub enum GenerationError {
    #[error("provider unavailable: {0}")]
    Unavailable(String),

    #[error("request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u32 },

    #[error("malformed structured output: {0}")]
    MalformedOutput(String),

    #[error("rate limited: retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u32 },

    #[error("authentication failed")]
    AuthenticationFailed,

    #[error("network error: {0}")]
    Network(String),
}

impl GenerationError {
    /// True if retrying the same request could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            GenerationError::Unavailable(_)
                | GenerationError::Timeout { .. }
                | GenerationError::RateLimited { .. }
                | GenerationError::Network(_)
        )
    }
}

/// Failure producing a structured quality assessment.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CritiqueError {
    #[error("provider unavailable: {0}")]
    Unavailable(String),

    #[error("request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u32 },

    #[error("malformed structured output: {0}")]
    MalformedOutput(String),

    #[error("rate limited: retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u32 },

    #[error("authentication failed")]
    AuthenticationFailed,

    #[error("network error: {0}")]
    Network(String),
}

impl CritiqueError {
    /// True if retrying the same request could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            CritiqueError::Unavailable(_)
                | CritiqueError::Timeout { .. }
                | CritiqueError::RateLimited { .. }
                | CritiqueError::Network(_)
        )
    }
}

/// Port for the generation and critique capability.
#[async_trait]
pub trait PostGenerator: Send + Sync {
    /// Produces a structured post from the request context.
    async fn generate(&self, request: GenerationRequest) -> Result<GeneratedPost, GenerationError>;

    /// Produces a structured quality assessment of one post.
    async fn critique(&self, post: &GeneratedPost) -> Result<CritiqueResult, CritiqueError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generation_error_retryable_classification() {
        assert!(GenerationError::Unavailable("down".into()).is_retryable());
        assert!(GenerationError::Timeout { timeout_secs: 30 }.is_retryable());
        assert!(GenerationError::Network("reset".into()).is_retryable());
        assert!(!GenerationError::MalformedOutput("bad json".into()).is_retryable());
        assert!(!GenerationError::AuthenticationFailed.is_retryable());
    }

    #[test]
    fn critique_error_retryable_classification() {
        assert!(CritiqueError::RateLimited { retry_after_secs: 5 }.is_retryable());
        assert!(!CritiqueError::MalformedOutput("missing score".into()).is_retryable());
    }

    #[test]
    fn mode_labels() {
        assert_eq!(GenerationMode::Draft.as_str(), "draft");
        assert_eq!(GenerationMode::Refine.as_str(), "refine");
        assert_eq!(GenerationMode::Polish.as_str(), "polish");
    }
}
