//! Workflow State - the unit of work passed through the refinement engine.
//!
//! The engine holds no state across calls: it receives a `WorkflowState`
//! value, returns an updated one, and the orchestrator persists the result.

use serde::{Deserialize, Serialize};

use crate::domain::content::{CritiqueResult, GeneratedPost};
use crate::domain::foundation::ValidationError;

/// State for one refinement engine run.
///
/// Invariants:
/// - `complete == true` implies `final_post` is set.
/// - `iterations <= max_iterations` at the start of any loop step; the loop
///   never begins a new round once the counter reaches the bound.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowState {
    /// Source material the post is drawn from. Required, non-empty.
    pub source_content: String,
    /// Insights derived from the source (headings, key phrases).
    pub insights: Vec<String>,
    /// Free-text user requirements for the post.
    pub requirements: Option<String>,
    /// The post under refinement, absent before the first generation.
    pub current_post: Option<GeneratedPost>,
    /// Critique of `current_post`; always describes the post it sits next to.
    pub latest_critique: Option<CritiqueResult>,
    /// Pending human feedback, cleared once consumed by a refine step.
    pub feedback: Option<String>,
    /// Completed generate+critique rounds.
    pub iterations: u32,
    /// Round budget for this run, at least 1.
    pub max_iterations: u32,
    /// True only when a polish pass produced the terminal post.
    pub complete: bool,
    /// The polished terminal post.
    pub final_post: Option<GeneratedPost>,
    /// Error that ended the last run, if it failed.
    pub last_error: Option<String>,
}

impl WorkflowState {
    /// Creates a fresh state for a new topic.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if the source is blank or the iteration
    /// bound is zero.
    pub fn new(
        source_content: impl Into<String>,
        max_iterations: u32,
    ) -> Result<Self, ValidationError> {
        let source_content = source_content.into();
        if source_content.trim().is_empty() {
            return Err(ValidationError::empty_field("source_content"));
        }
        if max_iterations == 0 {
            return Err(ValidationError::out_of_range("max_iterations", 1, i32::MAX, 0));
        }

        Ok(Self {
            source_content,
            insights: Vec::new(),
            requirements: None,
            current_post: None,
            latest_critique: None,
            feedback: None,
            iterations: 0,
            max_iterations,
            complete: false,
            final_post: None,
            last_error: None,
        })
    }

    /// Attaches content insights.
    pub fn with_insights(mut self, insights: Vec<String>) -> Self {
        self.insights = insights;
        self
    }

    /// Attaches free-text requirements.
    pub fn with_requirements(mut self, requirements: impl Into<String>) -> Self {
        self.requirements = Some(requirements.into());
        self
    }

    /// Attaches pending human feedback.
    pub fn with_feedback(mut self, feedback: impl Into<String>) -> Self {
        self.feedback = Some(feedback.into());
        self
    }

    /// Seeds the state with an existing post/critique pair, as used when a
    /// feedback turn resumes refinement of an active draft.
    pub fn resuming(
        mut self,
        post: GeneratedPost,
        critique: Option<CritiqueResult>,
        iterations: u32,
        max_iterations: u32,
    ) -> Self {
        self.current_post = Some(post);
        self.latest_critique = critique;
        self.iterations = iterations;
        self.max_iterations = max_iterations.max(1);
        self
    }

    /// True once the run reached its iteration bound.
    pub fn budget_exhausted(&self) -> bool {
        self.iterations >= self.max_iterations
    }

    /// True if the run completed because quality passed the gate rather
    /// than because the budget ran out.
    pub fn converged(&self, threshold: u8) -> bool {
        self.complete
            && self
                .latest_critique
                .as_ref()
                .map(|c| c.overall.passes(threshold))
                .unwrap_or(false)
    }
}
