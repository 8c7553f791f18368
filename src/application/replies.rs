//! Reply templates the orchestrator speaks with.

use crate::domain::content::{CritiqueResult, GeneratedPost, QualityScore};

pub fn draft_ready(post: &GeneratedPost, critique: Option<&CritiqueResult>, iterations: u32) -> String {
    let score_line = critique
        .map(|c| format!("Quality score: {}.", c.overall))
        .unwrap_or_default();
    format!(
        "Here's the draft after {} round{}:\n\n{}\n\n{} Reply with feedback to revise it, or approve it to finish.",
        iterations,
        if iterations == 1 { "" } else { "s" },
        post.render(),
        score_line,
    )
}

pub fn completion_summary(
    post: &GeneratedPost,
    versions: usize,
    iterations: u32,
    score: Option<QualityScore>,
) -> String {
    let score_line = score
        .map(|s| format!(" Final quality score: {}.", s))
        .unwrap_or_default();
    format!(
        "Approved. Final post after {} version{} and {} refinement round{}.{}\n\n{}",
        versions,
        if versions == 1 { "" } else { "s" },
        iterations,
        if iterations == 1 { "" } else { "s" },
        score_line,
        post.render(),
    )
}

pub fn no_draft_for_feedback() -> String {
    "There's no draft to revise yet. Share a topic, paste your source text, or upload a .txt/.md file and I'll write one.".to_string()
}

pub fn no_draft_for_approval() -> String {
    "There's nothing to approve yet. Share a topic or source material and I'll draft a post first.".to_string()
}

pub fn help_text() -> String {
    "I turn source material into short social posts. Give me a topic, paste text, or upload a .txt/.md file; I'll draft, self-critique and refine a post. Then reply with feedback to revise it or approve it to finish.".to_string()
}

pub fn chat_reply(has_context: bool) -> String {
    if has_context {
        "Happy to keep going. Give me feedback on the current draft, approve it, or share new material for a fresh post.".to_string()
    } else {
        "Tell me what you'd like a post about, or paste the source text you want it drawn from.".to_string()
    }
}

pub fn ingestion_failure(error: &str) -> String {
    format!("I couldn't read that file: {}. Try a plain-text .txt or .md file.", error)
}

pub fn engine_failure(error: &str) -> String {
    format!(
        "I hit a problem while drafting ({}). Your session is intact; send the request again to retry.",
        error
    )
}

pub fn session_completed() -> String {
    "This post is already approved and final. Share new material to start another one.".to_string()
}
