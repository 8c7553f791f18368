//! Mock Provider - deterministic scripted backend for tests and offline use.
//!
//! Responses are consumed from queues in FIFO order; once a queue empties
//! the mock falls back to a canned response so long conversations keep
//! working without exhaustive scripting.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::domain::content::{CritiqueResult, GeneratedPost};
use crate::domain::intent::MessageIntent;
use crate::domain::session::ChatStage;
use crate::ports::{
    ClassificationError, CritiqueError, GenerationError, GenerationRequest, IntentFallback,
    PostGenerator,
};

/// Scripted provider implementing generation, critique and intent fallback.
#[derive(Default)]
pub struct MockProvider {
    posts: Mutex<VecDeque<Result<GeneratedPost, GenerationError>>>,
    critiques: Mutex<VecDeque<Result<CritiqueResult, CritiqueError>>>,
    intents: Mutex<VecDeque<Result<MessageIntent, ClassificationError>>>,
    generate_calls: AtomicUsize,
    critique_calls: AtomicUsize,
    classify_calls: AtomicUsize,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl MockProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a post response.
    pub fn push_post(&self, post: GeneratedPost) {
        self.posts.lock().unwrap().push_back(Ok(post));
    }

    /// Queues a generation failure.
    pub fn push_post_error(&self, error: GenerationError) {
        self.posts.lock().unwrap().push_back(Err(error));
    }

    /// Queues a critique with the given overall score.
    pub fn push_score(&self, score: u8) {
        self.critiques
            .lock()
            .unwrap()
            .push_back(Ok(Self::canned_critique(score)));
    }

    /// Queues a critique failure.
    pub fn push_critique_error(&self, error: CritiqueError) {
        self.critiques.lock().unwrap().push_back(Err(error));
    }

    /// Queues an intent fallback response.
    pub fn push_intent(&self, intent: MessageIntent) {
        self.intents.lock().unwrap().push_back(Ok(intent));
    }

    /// Queues an intent fallback failure.
    pub fn push_intent_error(&self, error: ClassificationError) {
        self.intents.lock().unwrap().push_back(Err(error));
    }

    pub fn generate_calls(&self) -> usize {
        self.generate_calls.load(Ordering::SeqCst)
    }

    pub fn critique_calls(&self) -> usize {
        self.critique_calls.load(Ordering::SeqCst)
    }

    pub fn classify_calls(&self) -> usize {
        self.classify_calls.load(Ordering::SeqCst)
    }

    /// Generation requests seen so far, in order.
    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn canned_post(seq: usize) -> GeneratedPost {
        GeneratedPost::new(
            format!("Mock Post {}", seq),
            "A hook that stops the scroll.",
            "A body paragraph with one concrete idea.",
            "What would you try first?",
            (0..5).map(|i| format!("#mock{}", i)).collect(),
            "general audience",
        )
        .unwrap_or_else(|_| unreachable!("canned post is always valid"))
    }

    fn canned_critique(score: u8) -> CritiqueResult {
        let score = score.clamp(1, 10);
        CritiqueResult::new(
            score,
            score,
            score,
            score,
            score,
            vec!["clear single idea".to_string()],
            vec!["generic call to action".to_string()],
            vec!["make the call to action concrete".to_string()],
        )
        .unwrap_or_else(|_| unreachable!("canned critique is always valid"))
    }
}

#[async_trait]
impl PostGenerator for MockProvider {
    async fn generate(
        &self,
        request: GenerationRequest,
    ) -> Result<GeneratedPost, GenerationError> {
        let seq = self.generate_calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request);
        self.posts
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Self::canned_post(seq)))
    }

    async fn critique(&self, _post: &GeneratedPost) -> Result<CritiqueResult, CritiqueError> {
        self.critique_calls.fetch_add(1, Ordering::SeqCst);
        self.critiques
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Self::canned_critique(8)))
    }
}

#[async_trait]
impl IntentFallback for MockProvider {
    async fn classify(
        &self,
        _text: &str,
        _stage: ChatStage,
    ) -> Result<MessageIntent, ClassificationError> {
        self.classify_calls.fetch_add(1, Ordering::SeqCst);
        self.intents
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(MessageIntent::Chat))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::workflow::WorkflowState;
    use crate::ports::GenerationMode;

    #[tokio::test]
    async fn queued_responses_come_back_in_order() {
        let mock = MockProvider::new();
        mock.push_score(4);
        mock.push_score(9);

        let post = MockProvider::canned_post(0);
        let first = mock.critique(&post).await.unwrap();
        let second = mock.critique(&post).await.unwrap();

        assert_eq!(first.overall.value(), 4);
        assert_eq!(second.overall.value(), 9);
        assert_eq!(mock.critique_calls(), 2);
    }

    #[tokio::test]
    async fn empty_queue_falls_back_to_canned_responses() {
        let mock = MockProvider::new();
        let state = WorkflowState::new("topic", 3).unwrap();
        let request = GenerationRequest::from_state(&state, GenerationMode::Draft);

        let post = mock.generate(request).await.unwrap();
        assert!(post.title.starts_with("Mock Post"));
        assert_eq!(
            mock.classify("hello", ChatStage::Conversing).await.unwrap(),
            MessageIntent::Chat
        );
    }

    #[tokio::test]
    async fn queued_errors_surface() {
        let mock = MockProvider::new();
        mock.push_post_error(GenerationError::Unavailable("down".into()));
        let state = WorkflowState::new("topic", 3).unwrap();
        let request = GenerationRequest::from_state(&state, GenerationMode::Draft);

        assert!(mock.generate(request).await.is_err());
    }
}
