//! Intent classification tuning.

use serde::Deserialize;

use crate::domain::foundation::ValidationError;

#[derive(Debug, Clone, Deserialize)]
pub struct IntentConfig {
    /// Character count above which a plain message is treated as pasted
    /// source material.
    #[serde(default = "default_content_length_threshold")]
    pub content_length_threshold: usize,

    /// Deployment-specific keywords appended to the feedback rule.
    #[serde(default)]
    pub extra_feedback_keywords: Vec<String>,

    /// Deployment-specific keywords appended to the approval rule.
    #[serde(default)]
    pub extra_approval_keywords: Vec<String>,
}

impl IntentConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.content_length_threshold == 0 {
            return Err(ValidationError::out_of_range(
                "intent.content_length_threshold",
                1,
                i32::MAX,
                0,
            ));
        }
        Ok(())
    }
}

impl Default for IntentConfig {
    fn default() -> Self {
        Self {
            content_length_threshold: default_content_length_threshold(),
            extra_feedback_keywords: Vec::new(),
            extra_approval_keywords: Vec::new(),
        }
    }
}

fn default_content_length_threshold() -> usize {
    200
}
