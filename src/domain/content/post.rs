//! Generated Post value object.
//!
//! A post is immutable once produced by a generation call: refinement rounds
//! supersede it with a new instance, they never edit it in place.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::ValidationError;

/// Minimum number of hashtags on a valid post.
pub const MIN_HASHTAGS: usize = 5;

/// Maximum number of hashtags on a valid post.
pub const MAX_HASHTAGS: usize = 8;

/// A structured short-form social post produced by one generation call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedPost {
    /// Post title.
    pub title: String,
    /// Opening hook, the first line readers see.
    pub hook: String,
    /// Main body text.
    pub body: String,
    /// Closing call-to-action.
    pub call_to_action: String,
    /// Hashtags, 5 to 8, non-empty, no duplicates.
    pub hashtags: Vec<String>,
    /// Label describing who the post is written for.
    pub target_audience: String,
}

impl GeneratedPost {
    /// Constructs a post, enforcing the hashtag invariants.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if any text field is empty, the hashtag
    /// count is outside 5..=8, or a hashtag is blank or repeated.
    pub fn new(
        title: impl Into<String>,
        hook: impl Into<String>,
        body: impl Into<String>,
        call_to_action: impl Into<String>,
        hashtags: Vec<String>,
        target_audience: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let post = Self {
            title: title.into(),
            hook: hook.into(),
            body: body.into(),
            call_to_action: call_to_action.into(),
            hashtags,
            target_audience: target_audience.into(),
        };
        post.validate()?;
        Ok(post)
    }

    /// Validates all invariants on an already-constructed post.
    ///
    /// Used when a post arrives from a deserialized provider response
    /// rather than through [`GeneratedPost::new`].
    pub fn validate(&self) -> Result<(), ValidationError> {
        for (field, value) in [
            ("title", &self.title),
            ("hook", &self.hook),
            ("body", &self.body),
            ("call_to_action", &self.call_to_action),
            ("target_audience", &self.target_audience),
        ] {
            if value.trim().is_empty() {
                return Err(ValidationError::empty_field(field));
            }
        }

        if self.hashtags.len() < MIN_HASHTAGS || self.hashtags.len() > MAX_HASHTAGS {
            return Err(ValidationError::out_of_range(
                "hashtags",
                MIN_HASHTAGS as i32,
                MAX_HASHTAGS as i32,
                self.hashtags.len() as i32,
            ));
        }

        let mut seen = Vec::with_capacity(self.hashtags.len());
        for tag in &self.hashtags {
            if tag.trim().is_empty() {
                return Err(ValidationError::empty_field("hashtags"));
            }
            let lowered = tag.to_lowercase();
            if seen.contains(&lowered) {
                return Err(ValidationError::duplicate("hashtags", tag.clone()));
            }
            seen.push(lowered);
        }

        Ok(())
    }

    /// Renders the post as display text, the shape shown to the reviewer.
    pub fn render(&self) -> String {
        format!(
            "{}\n\n{}\n\n{}\n\n{}\n\n{}",
            self.title,
            self.hook,
            self.body,
            self.call_to_action,
            self.hashtags.join(" "),
        )
    }
}
