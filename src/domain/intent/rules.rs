//! Ordered pattern rules for intent classification.
//!
//! Rule order is a correctness contract, not an optimization: an attachment
//! always wins, feedback keywords outrank content-request keywords so that
//! "make it shorter" on an active draft is never mistaken for a new topic,
//! and a long paste outranks the help rule so pasted prose mentioning
//! "helpful" still becomes source material. Keywords match whole words, not
//! bare substrings, so "published reviews" is not an approval and "stone"
//! is not a tone note.

use once_cell::sync::Lazy;

use super::MessageIntent;

/// Keywords that signal revision feedback on an existing draft.
pub static FEEDBACK_KEYWORDS: Lazy<Vec<&'static str>> = Lazy::new(|| {
    vec![
        "make it",
        "change",
        "shorter",
        "longer",
        "instead",
        "rewrite",
        "rephrase",
        "tone",
        "tweak",
        "adjust",
        "revise",
        "don't like",
        "too",
    ]
});

/// Keywords that signal acceptance of the active draft.
pub static APPROVAL_KEYWORDS: Lazy<Vec<&'static str>> = Lazy::new(|| {
    vec![
        "approve",
        "approved",
        "looks good",
        "lgtm",
        "ship it",
        "perfect",
        "love it",
        "publish",
        "go ahead",
        "that works",
    ]
});

/// Keywords asking what the system can do.
pub static HELP_KEYWORDS: Lazy<Vec<&'static str>> =
    Lazy::new(|| vec!["help", "what can you do", "how do"]);

/// Keywords asking for a new post.
pub static CONTENT_REQUEST_KEYWORDS: Lazy<Vec<&'static str>> = Lazy::new(|| {
    vec![
        "write a post",
        "create a post",
        "draft",
        "generate",
        "post about",
        "write about",
    ]
});

/// One turn's classifiable surface.
#[derive(Debug, Clone, Copy)]
pub struct TurnInput<'a> {
    pub text: &'a str,
    pub has_attachment: bool,
}

/// A single classification predicate.
#[derive(Debug, Clone)]
pub enum RuleMatcher {
    /// The turn carries an uploaded file.
    Attachment,
    /// Case-insensitive whole-word match on any listed keyword.
    KeywordAny(Vec<String>),
    /// The message body exceeds the given character count.
    LongerThan(usize),
}

impl RuleMatcher {
    fn matches(&self, input: &TurnInput<'_>) -> bool {
        match self {
            RuleMatcher::Attachment => input.has_attachment,
            RuleMatcher::KeywordAny(keywords) => {
                let lowered = input.text.to_lowercase();
                keywords.iter().any(|k| contains_phrase(&lowered, k))
            }
            RuleMatcher::LongerThan(chars) => input.text.chars().count() > *chars,
        }
    }
}

/// Case-sensitive phrase search bounded by non-alphanumeric characters on
/// both sides, so "publish" never fires inside "published". Callers lower-case
/// both sides first.
fn contains_phrase(haystack: &str, phrase: &str) -> bool {
    let boundary = |c: Option<char>| c.map_or(true, |c| !c.is_alphanumeric());
    haystack.match_indices(phrase).any(|(begin, matched)| {
        let end = begin + matched.len();
        boundary(haystack[..begin].chars().next_back())
            && boundary(haystack[end..].chars().next())
    })
}

/// An ordered rule table; the first matching rule decides.
#[derive(Debug, Clone)]
pub struct RuleTable {
    rules: Vec<(RuleMatcher, MessageIntent)>,
}

impl RuleTable {
    pub fn new(rules: Vec<(RuleMatcher, MessageIntent)>) -> Self {
        Self { rules }
    }

    /// The standard table. `extra` keyword lists extend the defaults without
    /// disturbing rule order; `length_threshold` drives the long-paste rule.
    pub fn standard(
        length_threshold: usize,
        extra_feedback: &[String],
        extra_approval: &[String],
    ) -> Self {
        let mut feedback: Vec<String> =
            FEEDBACK_KEYWORDS.iter().map(|s| s.to_string()).collect();
        feedback.extend(extra_feedback.iter().map(|s| s.to_lowercase()));
        let mut approval: Vec<String> =
            APPROVAL_KEYWORDS.iter().map(|s| s.to_string()).collect();
        approval.extend(extra_approval.iter().map(|s| s.to_lowercase()));

        // The help rule sits below the content rules: long pasted prose that
        // happens to mention "help" is still source material.
        Self::new(vec![
            (RuleMatcher::Attachment, MessageIntent::FileContent),
            (RuleMatcher::KeywordAny(feedback), MessageIntent::Feedback),
            (RuleMatcher::KeywordAny(approval), MessageIntent::Approval),
            (
                RuleMatcher::KeywordAny(
                    CONTENT_REQUEST_KEYWORDS.iter().map(|s| s.to_string()).collect(),
                ),
                MessageIntent::TextContent,
            ),
            (
                RuleMatcher::LongerThan(length_threshold),
                MessageIntent::TextContent,
            ),
            (
                RuleMatcher::KeywordAny(
                    HELP_KEYWORDS.iter().map(|s| s.to_string()).collect(),
                ),
                MessageIntent::Help,
            ),
        ])
    }

    /// Returns the first matching rule's intent, or `None` when no rule
    /// fires and the fallback should decide.
    pub fn first_match(&self, input: &TurnInput<'_>) -> Option<MessageIntent> {
        self.rules
            .iter()
            .find(|(matcher, _)| matcher.matches(input))
            .map(|(_, intent)| *intent)
    }
}

impl Default for RuleTable {
    fn default() -> Self {
        Self::standard(200, &[], &[])
    }
}
