//! End-to-end conversation flows through the orchestrator with a scripted
//! provider and in-memory persistence.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Duration;

use postsmith::adapters::ai::MockProvider;
use postsmith::adapters::extract::PlainTextExtractor;
use postsmith::adapters::storage::InMemorySessionStore;
use postsmith::adapters::trace::MemorySink;
use postsmith::application::{ConversationOrchestrator, OrchestratorError};
use postsmith::config::IngestionConfig;
use postsmith::domain::foundation::SessionId;
use postsmith::domain::intent::{IntentClassifier, MessageIntent, RuleTable};
use postsmith::domain::session::{ChatStage, SessionMemory};
use postsmith::domain::workflow::{EngineConfig, RefinementEngine};
use postsmith::ports::{
    SessionStore, SessionStoreError, TraceEvent, TraceSink,
};

struct Harness {
    orchestrator: ConversationOrchestrator,
    provider: Arc<MockProvider>,
    store: Arc<InMemorySessionStore>,
    sink: Arc<MemorySink>,
}

fn harness_with(history_cap: usize, store: Arc<dyn SessionStore>) -> (ConversationOrchestrator, Arc<MockProvider>, Arc<MemorySink>) {
    let provider = Arc::new(MockProvider::new());
    let sink = Arc::new(MemorySink::new());
    let trace: Arc<dyn TraceSink> = sink.clone();

    let engine = RefinementEngine::new(provider.clone(), trace.clone(), EngineConfig::default());
    let classifier = IntentClassifier::new(RuleTable::default(), provider.clone());
    let extractor = Arc::new(PlainTextExtractor::new(IngestionConfig::default()));

    let orchestrator = ConversationOrchestrator::new(
        engine,
        classifier,
        extractor,
        store,
        trace,
        history_cap,
    );
    (orchestrator, provider, sink)
}

fn harness() -> Harness {
    let store = Arc::new(InMemorySessionStore::new());
    let (orchestrator, provider, sink) = harness_with(100, store.clone());
    Harness {
        orchestrator,
        provider,
        store,
        sink,
    }
}

#[tokio::test]
async fn persistent_low_scores_stop_at_the_iteration_bound() {
    let h = harness();
    let id = SessionId::new();
    for _ in 0..5 {
        h.provider.push_score(4);
    }

    let reply = h
        .orchestrator
        .process(id, "write a post about ai in medical diagnostics", None)
        .await
        .unwrap();

    // Default bound is 3 rounds: 3 critiques, then a forced polish.
    assert_eq!(h.provider.critique_calls(), 3);
    assert_eq!(reply.stage, ChatStage::ReviewingDraft);
    assert!(reply.text.contains("3 rounds"));
}

#[tokio::test]
async fn passing_score_on_round_one_short_circuits() {
    let h = harness();
    let id = SessionId::new();
    h.provider.push_score(9);

    h.orchestrator
        .process(id, "write a post about ai in medical diagnostics", None)
        .await
        .unwrap();

    assert_eq!(h.provider.critique_calls(), 1);
    // Draft plus polish, no refine pass.
    assert_eq!(h.provider.generate_calls(), 2);
}

#[tokio::test]
async fn full_conversation_draft_feedback_approve() {
    let h = harness();
    let id = SessionId::new();

    let draft = h
        .orchestrator
        .process(id, "write a post about ai improving diagnostics", None)
        .await
        .unwrap();
    assert_eq!(draft.stage, ChatStage::ReviewingDraft);

    let revised = h
        .orchestrator
        .process(id, "make it shorter and punchier", None)
        .await
        .unwrap();
    assert_eq!(revised.intent, MessageIntent::Feedback);
    assert_eq!(revised.stage, ChatStage::ReviewingDraft);

    let done = h.orchestrator.process(id, "ship it", None).await.unwrap();
    assert_eq!(done.stage, ChatStage::Completed);

    // Lineage: one version per successful run, append-only.
    let session = h.store.load(id).await.unwrap();
    let ctx = session.context.as_ref().unwrap();
    assert_eq!(ctx.versions().len(), 2);
    assert!(ctx.versions()[0].created_at <= ctx.versions()[1].created_at);

    // Transcript: user + reply per turn.
    assert_eq!(session.messages().len(), 6);

    // Turn events were emitted for every turn.
    let turns = h
        .sink
        .events()
        .iter()
        .filter(|e| matches!(e, TraceEvent::TurnProcessed { .. }))
        .count();
    assert_eq!(turns, 3);
}

#[tokio::test]
async fn feedback_keywords_outrank_content_request_keywords() {
    let h = harness();
    let id = SessionId::new();

    h.orchestrator
        .process(id, "write a post about rust", None)
        .await
        .unwrap();
    // Contains both "rewrite" (feedback) and "draft" (content request).
    let reply = h
        .orchestrator
        .process(id, "rewrite the draft with more energy", None)
        .await
        .unwrap();

    assert_eq!(reply.intent, MessageIntent::Feedback);
    let session = h.store.load(id).await.unwrap();
    // Refined the existing lineage rather than starting a new one.
    assert_eq!(session.context.as_ref().unwrap().versions().len(), 2);
}

#[tokio::test]
async fn feedback_with_no_session_history_makes_no_model_calls() {
    let h = harness();

    let reply = h
        .orchestrator
        .process(SessionId::new(), "change the tone please", None)
        .await
        .unwrap();

    assert_eq!(reply.intent, MessageIntent::Feedback);
    assert_eq!(h.provider.generate_calls(), 0);
    assert_eq!(h.provider.critique_calls(), 0);
    assert_eq!(reply.stage, ChatStage::Conversing);
}

#[tokio::test]
async fn transcript_is_fifo_capped_across_turns() {
    let store = Arc::new(InMemorySessionStore::new());
    let (orchestrator, _provider, _sink) = harness_with(4, store.clone());
    let id = SessionId::new();

    for greeting in ["hello there", "how are you", "nice weather"] {
        orchestrator.process(id, greeting, None).await.unwrap();
    }

    let session = store.load(id).await.unwrap();
    let texts: Vec<&str> = session.messages().iter().map(|m| m.text.as_str()).collect();
    // 6 messages were written; only the newest 4 survive.
    assert_eq!(texts.len(), 4);
    assert_eq!(texts[0], "how are you");
}

#[tokio::test]
async fn sessions_survive_process_boundaries() {
    // Same store, two orchestrators: the second picks up where the first left off.
    let store: Arc<InMemorySessionStore> = Arc::new(InMemorySessionStore::new());
    let id = SessionId::new();

    let (first, _, _) = harness_with(100, store.clone());
    first
        .process(id, "write a post about rust", None)
        .await
        .unwrap();

    let (second, provider, _) = harness_with(100, store.clone());
    let reply = second.process(id, "looks good", None).await.unwrap();

    assert_eq!(reply.stage, ChatStage::Completed);
    assert_eq!(provider.generate_calls(), 0);
}

/// Store whose writes always fail.
struct BrokenStore;

#[async_trait]
impl SessionStore for BrokenStore {
    async fn save(&self, _session: &SessionMemory) -> Result<(), SessionStoreError> {
        Err(SessionStoreError::IoError("disk full".to_string()))
    }

    async fn load(&self, id: SessionId) -> Result<SessionMemory, SessionStoreError> {
        Err(SessionStoreError::NotFound(id))
    }

    async fn exists(&self, _id: SessionId) -> Result<bool, SessionStoreError> {
        Ok(false)
    }

    async fn delete(&self, _id: SessionId) -> Result<(), SessionStoreError> {
        Ok(())
    }

    async fn stale_sessions(
        &self,
        _older_than: Duration,
    ) -> Result<Vec<SessionId>, SessionStoreError> {
        Ok(Vec::new())
    }
}

#[tokio::test]
async fn persistence_failure_is_a_hard_error() {
    let (orchestrator, _, _) = harness_with(100, Arc::new(BrokenStore));

    let result = orchestrator
        .process(SessionId::new(), "write a post about rust", None)
        .await;

    assert!(matches!(result, Err(OrchestratorError::Persistence(_))));
}
