//! Conversation Orchestrator - the single entry point for a user turn.
//!
//! One call per turn: classify the message, dispatch on intent, run the
//! refinement engine when content work is needed, and write the session back
//! before replying. Turns on the same session are serialized by a per-session
//! lock; turns on different sessions run concurrently.
//!
//! Failure policy: a persistence failure is a hard error, an ingestion
//! failure ends the turn with an error reply, and an engine failure becomes
//! a retry-suggestion reply with the session left intact.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::domain::foundation::SessionId;
use crate::domain::intent::{IntentClassifier, MessageIntent, TurnInput};
use crate::domain::session::{
    ChatStage, MessageKind, PostContext, SessionMemory, SourceKind,
};
use crate::domain::workflow::{RefinementEngine, WorkflowState};
use crate::ports::{
    ContentExtractor, SessionStore, SessionStoreError, TraceEvent, TraceSink, UploadedFile,
};

use super::replies;

/// Hard failure of a turn. Everything else becomes a reply.
#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    #[error("session persistence failed: {0}")]
    Persistence(#[from] SessionStoreError),
}

/// What the caller gets back from one processed turn.
#[derive(Debug, Clone)]
pub struct TurnReply {
    pub session_id: SessionId,
    pub text: String,
    pub stage: ChatStage,
    pub intent: MessageIntent,
}

/// Reply text paired with the transcript kind it is recorded under.
struct TurnOutcome {
    text: String,
    kind: MessageKind,
}

impl TurnOutcome {
    fn assistant(text: String) -> Self {
        Self {
            text,
            kind: MessageKind::Assistant,
        }
    }

    fn error(text: String) -> Self {
        Self {
            text,
            kind: MessageKind::Error,
        }
    }
}

pub struct ConversationOrchestrator {
    engine: RefinementEngine,
    classifier: IntentClassifier,
    extractor: Arc<dyn ContentExtractor>,
    store: Arc<dyn SessionStore>,
    trace: Arc<dyn TraceSink>,
    history_cap: usize,
    locks: Mutex<HashMap<SessionId, Arc<Mutex<()>>>>,
}

impl ConversationOrchestrator {
    pub fn new(
        engine: RefinementEngine,
        classifier: IntentClassifier,
        extractor: Arc<dyn ContentExtractor>,
        store: Arc<dyn SessionStore>,
        trace: Arc<dyn TraceSink>,
        history_cap: usize,
    ) -> Self {
        Self {
            engine,
            classifier,
            extractor,
            store,
            trace,
            history_cap,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Processes one user turn against a session.
    ///
    /// The session is created on first contact, mutated in memory, and
    /// written back before the reply is returned.
    pub async fn process(
        &self,
        session_id: SessionId,
        text: &str,
        file: Option<UploadedFile>,
    ) -> Result<TurnReply, OrchestratorError> {
        let lock = self.session_lock(session_id).await;
        let result = {
            let _guard = lock.lock().await;
            self.process_locked(session_id, text, file).await
        };
        self.release_session_lock(session_id, &lock).await;
        result
    }

    async fn process_locked(
        &self,
        session_id: SessionId,
        text: &str,
        file: Option<UploadedFile>,
    ) -> Result<TurnReply, OrchestratorError> {
        let mut session = self.load_or_create(session_id).await?;

        let input = TurnInput {
            text,
            has_attachment: file.is_some(),
        };
        let decision = self.classifier.classify(input, session.stage).await;
        if let Some(note) = &decision.note {
            tracing::warn!(session = %session_id, note = %note, "intent classification degraded");
        }
        self.trace.emit(TraceEvent::IntentResolved {
            session: session_id,
            intent: decision.intent.as_str(),
            via_fallback: decision.via_fallback,
        });

        let user_text = if text.trim().is_empty() {
            file.as_ref()
                .map(|f| format!("[uploaded {}]", f.name))
                .unwrap_or_default()
        } else {
            text.to_string()
        };
        session.push_message(MessageKind::User, user_text, self.history_cap);

        let outcome = match decision.intent {
            MessageIntent::FileContent => self.handle_file(&mut session, file, text).await,
            MessageIntent::TextContent => self.handle_text(&mut session, text).await,
            MessageIntent::Feedback => self.handle_feedback(&mut session, text).await,
            MessageIntent::Approval => self.handle_approval(&mut session),
            MessageIntent::Help => {
                self.invite_content(&mut session);
                TurnOutcome::assistant(replies::help_text())
            }
            MessageIntent::Chat => {
                let has_context = session.context.is_some();
                self.invite_content(&mut session);
                TurnOutcome::assistant(replies::chat_reply(has_context))
            }
        };

        session.push_message(outcome.kind, &outcome.text, self.history_cap);
        self.store.save(&session).await?;

        self.trace.emit(TraceEvent::TurnProcessed {
            session: session_id,
            stage: session.stage.as_str(),
        });

        Ok(TurnReply {
            session_id,
            text: outcome.text,
            stage: session.stage,
            intent: decision.intent,
        })
    }

    async fn session_lock(&self, id: SessionId) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks
            .entry(id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Drops the lock entry once no other turn holds a clone of it, keeping
    /// the map bounded by the number of in-flight turns.
    async fn release_session_lock(&self, id: SessionId, lock: &Arc<Mutex<()>>) {
        let mut locks = self.locks.lock().await;
        // Exactly two strong refs: the map's and ours. Nobody can take a new
        // clone while we hold the map mutex, so removal cannot strand a waiter.
        if Arc::strong_count(lock) == 2 {
            locks.remove(&id);
        }
    }

    #[cfg(test)]
    pub(crate) async fn lock_count(&self) -> usize {
        self.locks.lock().await.len()
    }

    async fn load_or_create(
        &self,
        id: SessionId,
    ) -> Result<SessionMemory, OrchestratorError> {
        match self.store.load(id).await {
            Ok(session) => Ok(session),
            Err(SessionStoreError::NotFound(_)) => Ok(SessionMemory::new(id)),
            Err(e) => Err(e.into()),
        }
    }

    /// A session with no working material gets nudged toward providing some.
    fn invite_content(&self, session: &mut SessionMemory) {
        if session.context.is_none() && session.stage == ChatStage::Conversing {
            session.set_stage(ChatStage::AwaitingContent);
        }
    }

    async fn handle_file(
        &self,
        session: &mut SessionMemory,
        file: Option<UploadedFile>,
        text: &str,
    ) -> TurnOutcome {
        let Some(file) = file else {
            // The fallback can mislabel a bare message as a file turn.
            return TurnOutcome::assistant(replies::chat_reply(session.context.is_some()));
        };

        let content = match self.extractor.extract(&file).await {
            Ok(content) => content,
            Err(e) => {
                tracing::warn!(file = %file.name, error = %e, "file ingestion failed");
                return TurnOutcome::error(replies::ingestion_failure(&e.to_string()));
            }
        };

        let context = match PostContext::new(
            content.text,
            SourceKind::File {
                name: file.name.clone(),
            },
        ) {
            Ok(ctx) => {
                let ctx = ctx.with_insights(content.insights);
                if text.trim().is_empty() {
                    ctx
                } else {
                    ctx.with_requirements(text.trim())
                }
            }
            Err(_) => {
                return TurnOutcome::error(replies::ingestion_failure("no usable text"));
            }
        };

        self.run_generation(session, context).await
    }

    async fn handle_text(&self, session: &mut SessionMemory, text: &str) -> TurnOutcome {
        let context = match PostContext::new(text.trim(), SourceKind::Text) {
            Ok(ctx) => ctx,
            Err(_) => return TurnOutcome::assistant(replies::chat_reply(false)),
        };
        self.run_generation(session, context).await
    }

    async fn handle_feedback(&self, session: &mut SessionMemory, text: &str) -> TurnOutcome {
        if session.stage == ChatStage::Completed {
            return TurnOutcome::assistant(replies::session_completed());
        }
        let Some(context) = session.context.clone() else {
            return TurnOutcome::assistant(replies::no_draft_for_feedback());
        };
        let Some(active) = context.active().cloned() else {
            return TurnOutcome::assistant(replies::no_draft_for_feedback());
        };

        // Feedback buys additional refinement budget on top of what this
        // context has already spent.
        let max_iterations =
            context.iterations + self.engine.config().feedback_iteration_increment;
        let state = match WorkflowState::new(&context.source_content, max_iterations.max(1)) {
            Ok(state) => state
                .with_insights(context.insights.clone())
                .resuming(active.post, active.critique, context.iterations, max_iterations.max(1))
                .with_feedback(text),
            Err(_) => return TurnOutcome::assistant(replies::no_draft_for_feedback()),
        };
        let state = match &context.requirements {
            Some(req) => state.with_requirements(req.clone()),
            None => state,
        };

        let result = self.engine.run(state).await;
        self.finish_run(session, context, result)
    }

    fn handle_approval(&self, session: &mut SessionMemory) -> TurnOutcome {
        if session.stage == ChatStage::Completed {
            return TurnOutcome::assistant(replies::session_completed());
        }
        let Some(context) = session.context.as_ref() else {
            return TurnOutcome::assistant(replies::no_draft_for_approval());
        };
        let Some(active) = context.active() else {
            return TurnOutcome::assistant(replies::no_draft_for_approval());
        };

        let summary = replies::completion_summary(
            &active.post,
            context.versions().len(),
            context.iterations,
            active.score(),
        );
        session.set_stage(ChatStage::Completed);
        TurnOutcome::assistant(summary)
    }

    /// Runs a fresh engine pass over new source material.
    async fn run_generation(
        &self,
        session: &mut SessionMemory,
        context: PostContext,
    ) -> TurnOutcome {
        let state = match WorkflowState::new(
            &context.source_content,
            self.engine.config().max_iterations,
        ) {
            Ok(state) => state.with_insights(context.insights.clone()),
            Err(_) => return TurnOutcome::assistant(replies::chat_reply(false)),
        };
        let state = match &context.requirements {
            Some(req) => state.with_requirements(req.clone()),
            None => state,
        };

        let result = self.engine.run(state).await;
        self.finish_run(session, context, result)
    }

    /// Folds an engine result back into the session.
    fn finish_run(
        &self,
        session: &mut SessionMemory,
        mut context: PostContext,
        result: WorkflowState,
    ) -> TurnOutcome {
        if !result.complete {
            let error = result
                .last_error
                .unwrap_or_else(|| "unknown failure".to_string());
            // Session and lineage are untouched; the user can simply retry.
            return TurnOutcome::assistant(replies::engine_failure(&error));
        }

        let Some(post) = result.final_post else {
            return TurnOutcome::assistant(replies::engine_failure("run ended without a post"));
        };

        context.iterations = result.iterations;
        context.push_version(post, result.latest_critique);

        let outcome = match context.active() {
            Some(version) => TurnOutcome::assistant(replies::draft_ready(
                &version.post,
                version.critique.as_ref(),
                result.iterations,
            )),
            None => TurnOutcome::assistant(replies::engine_failure("lineage update failed")),
        };

        session.replace_context(context);
        session.set_stage(ChatStage::ReviewingDraft);
        outcome
    }
}
