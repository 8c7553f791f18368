//! Post context: source material and the append-only version lineage for
//! the post a session is working on.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::content::{CritiqueResult, GeneratedPost, QualityScore};
use crate::domain::foundation::{ValidationError, VersionId};

/// Where a session's source material came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceKind {
    /// Pasted or typed directly into the conversation.
    Text,
    /// Extracted from an uploaded file.
    File { name: String },
}

/// One immutable snapshot in a post's version lineage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostVersion {
    pub id: VersionId,
    pub post: GeneratedPost,
    pub critique: Option<CritiqueResult>,
    pub created_at: DateTime<Utc>,
}

impl PostVersion {
    pub fn new(post: GeneratedPost, critique: Option<CritiqueResult>) -> Self {
        Self {
            id: VersionId::new(),
            post,
            critique,
            created_at: Utc::now(),
        }
    }

    /// Overall score of this version's critique, if one exists.
    pub fn score(&self) -> Option<QualityScore> {
        self.critique.as_ref().map(|c| c.overall)
    }
}

/// Source material plus the version history of the post built from it.
///
/// Versions are append-only: refinement supersedes, it never rewrites. The
/// newest version is the active one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostContext {
    pub source_content: String,
    pub source: SourceKind,
    pub insights: Vec<String>,
    pub requirements: Option<String>,
    versions: Vec<PostVersion>,
    /// Rounds spent across all runs on this context, used to grow the
    /// iteration budget when feedback arrives.
    pub iterations: u32,
    pub created_at: DateTime<Utc>,
}

impl PostContext {
    /// Creates a context around new source material.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if the source is blank.
    pub fn new(
        source_content: impl Into<String>,
        source: SourceKind,
    ) -> Result<Self, ValidationError> {
        let source_content = source_content.into();
        if source_content.trim().is_empty() {
            return Err(ValidationError::empty_field("source_content"));
        }
        Ok(Self {
            source_content,
            source,
            insights: Vec::new(),
            requirements: None,
            versions: Vec::new(),
            iterations: 0,
            created_at: Utc::now(),
        })
    }

    pub fn with_insights(mut self, insights: Vec<String>) -> Self {
        self.insights = insights;
        self
    }

    pub fn with_requirements(mut self, requirements: impl Into<String>) -> Self {
        self.requirements = Some(requirements.into());
        self
    }

    /// Appends a new version, making it the active one.
    pub fn push_version(&mut self, post: GeneratedPost, critique: Option<CritiqueResult>) {
        self.versions.push(PostVersion::new(post, critique));
    }

    /// Full lineage, oldest first.
    pub fn versions(&self) -> &[PostVersion] {
        &self.versions
    }

    /// The newest version, if any exists yet.
    pub fn active(&self) -> Option<&PostVersion> {
        self.versions.last()
    }

    /// Critique attached to the active version.
    pub fn latest_critique(&self) -> Option<&CritiqueResult> {
        self.active().and_then(|v| v.critique.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post(tag: &str) -> GeneratedPost {
        GeneratedPost::new(
            format!("title-{}", tag),
            "hook",
            "body",
            "cta",
            (0..5).map(|i| format!("#t{}", i)).collect(),
            "audience",
        )
        .unwrap()
    }

    fn critique(score: u8) -> CritiqueResult {
        CritiqueResult::new(
            score,
            score,
            score,
            score,
            score,
            vec!["s".into()],
            vec!["w".into()],
            vec!["i".into()],
        )
        .unwrap()
    }

    #[test]
    fn new_rejects_blank_source() {
        let result = PostContext::new("  ", SourceKind::Text);
        assert!(result.is_err());
    }

    #[test]
    fn lineage_appends_and_newest_is_active() {
        let mut ctx = PostContext::new("source", SourceKind::Text).unwrap();
        assert!(ctx.active().is_none());

        ctx.push_version(post("v1"), Some(critique(5)));
        ctx.push_version(post("v2"), Some(critique(8)));

        assert_eq!(ctx.versions().len(), 2);
        assert_eq!(ctx.active().unwrap().post.title, "title-v2");
        assert_eq!(ctx.versions()[0].post.title, "title-v1");
        assert_eq!(
            ctx.latest_critique().unwrap().overall.value(),
            8
        );
    }

    #[test]
    fn version_score_comes_from_critique() {
        let v = PostVersion::new(post("v"), Some(critique(7)));
        assert_eq!(v.score().unwrap().value(), 7);
        let v = PostVersion::new(post("v"), None);
        assert!(v.score().is_none());
    }

    #[test]
    fn file_source_round_trips() {
        let ctx = PostContext::new("text", SourceKind::File { name: "notes.md".into() }).unwrap();
        let json = serde_json::to_string(&ctx).unwrap();
        let back: PostContext = serde_json::from_str(&json).unwrap();
        assert_eq!(ctx, back);
    }
}
