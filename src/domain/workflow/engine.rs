//! Refinement Engine - the bounded generate-critique-refine state machine.
//!
//! States: GENERATE, CRITIQUE, DECIDE, REFINE, POLISH, DONE. CRITIQUE
//! (scoring) is separate from DECIDE (pure branching) so the quality gate is
//! testable without a model call, and the "converged vs ran out of budget"
//! distinction stays visible in the returned state.
//!
//! The engine is stateless across calls: `run` takes a [`WorkflowState`],
//! returns an updated one, and leaves persistence to the orchestrator.
//! Capability failures are returned as data in `last_error`, never thrown.

use std::sync::Arc;

use serde::Deserialize;
use tokio::sync::watch;

use crate::domain::foundation::ValidationError;
use crate::ports::{
    GenerationMode, GenerationRequest, PostGenerator, TraceEvent, TraceSink,
};

use super::WorkflowState;

/// Tuning knobs for the refinement loop.
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Overall critique score at or above which the draft passes the gate.
    #[serde(default = "default_quality_threshold")]
    pub quality_threshold: u8,

    /// Round budget for a fresh run.
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,

    /// Extra rounds a feedback turn buys on top of the previous bound.
    #[serde(default = "default_feedback_increment")]
    pub feedback_iteration_increment: u32,
}

impl EngineConfig {
    /// Validates threshold and budget bounds.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !(1..=10).contains(&self.quality_threshold) {
            return Err(ValidationError::out_of_range(
                "quality_threshold",
                1,
                10,
                self.quality_threshold as i32,
            ));
        }
        if self.max_iterations == 0 {
            return Err(ValidationError::out_of_range("max_iterations", 1, i32::MAX, 0));
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            quality_threshold: default_quality_threshold(),
            max_iterations: default_max_iterations(),
            feedback_iteration_increment: default_feedback_increment(),
        }
    }
}

fn default_quality_threshold() -> u8 {
    7
}

fn default_max_iterations() -> u32 {
    3
}

fn default_feedback_increment() -> u32 {
    1
}

/// Handle used by a caller to abort a run between steps.
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    /// Signals the paired run to stop before its next step.
    pub fn cancel(&self) {
        let _ = self.tx.send(true);
    }
}

/// Cancellation signal checked by the engine between steps.
#[derive(Debug, Clone)]
pub struct CancelSignal {
    rx: Option<watch::Receiver<bool>>,
}

impl CancelSignal {
    /// A signal that never fires.
    pub fn never() -> Self {
        Self { rx: None }
    }

    /// Creates a paired handle and signal.
    pub fn pair() -> (CancelHandle, CancelSignal) {
        let (tx, rx) = watch::channel(false);
        (CancelHandle { tx }, CancelSignal { rx: Some(rx) })
    }

    /// Non-blocking check.
    pub fn is_cancelled(&self) -> bool {
        self.rx.as_ref().map(|rx| *rx.borrow()).unwrap_or(false)
    }
}

/// Internal state-machine phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Generate,
    Critique,
    Decide,
    Refine,
    Polish,
    Done,
}

impl Phase {
    fn name(&self) -> &'static str {
        match self {
            Phase::Generate => "generate",
            Phase::Critique => "critique",
            Phase::Decide => "decide",
            Phase::Refine => "refine",
            Phase::Polish => "polish",
            Phase::Done => "done",
        }
    }
}

/// Runs the bounded refinement loop over one [`WorkflowState`].
pub struct RefinementEngine {
    generator: Arc<dyn PostGenerator>,
    trace: Arc<dyn TraceSink>,
    config: EngineConfig,
}

impl RefinementEngine {
    pub fn new(
        generator: Arc<dyn PostGenerator>,
        trace: Arc<dyn TraceSink>,
        config: EngineConfig,
    ) -> Self {
        Self {
            generator,
            trace,
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Runs the loop to completion or failure.
    ///
    /// Idempotent on an already-completed state: returned unchanged with no
    /// external calls made.
    pub async fn run(&self, state: WorkflowState) -> WorkflowState {
        self.run_with_signal(state, CancelSignal::never()).await
    }

    /// Runs the loop, aborting between steps once `cancel` fires.
    ///
    /// On cancellation the last fully-completed state is returned with
    /// `complete == false` and a recorded error; a post and its critique are
    /// never left mismatched.
    pub async fn run_with_signal(
        &self,
        mut state: WorkflowState,
        cancel: CancelSignal,
    ) -> WorkflowState {
        if state.complete {
            return state;
        }
        state.last_error = None;

        self.trace.emit(TraceEvent::RunStarted {
            iterations: state.iterations,
            max_iterations: state.max_iterations,
        });

        let mut phase = Self::initial_phase(&state);
        loop {
            if cancel.is_cancelled() && phase != Phase::Done {
                state.last_error = Some("run cancelled before next step".to_string());
                self.trace.emit(TraceEvent::RunCancelled {
                    iteration: state.iterations,
                });
                return state;
            }

            phase = match phase {
                Phase::Generate => {
                    let request = GenerationRequest::from_state(&state, GenerationMode::Draft);
                    match self.generator.generate(request).await {
                        Ok(post) => {
                            state.current_post = Some(post);
                            state.latest_critique = None;
                            self.emit_phase(Phase::Generate, state.iterations);
                            Phase::Critique
                        }
                        Err(e) => return self.fail(state, Phase::Generate, e.to_string()),
                    }
                }

                Phase::Critique => {
                    let Some(post) = state.current_post.as_ref() else {
                        return self.fail(
                            state,
                            Phase::Critique,
                            "no post available to critique".to_string(),
                        );
                    };
                    match self.generator.critique(post).await {
                        Ok(critique) => {
                            state.latest_critique = Some(critique);
                            // A round is one generate+critique pair; count it here.
                            state.iterations += 1;
                            self.emit_phase(Phase::Critique, state.iterations);
                            Phase::Decide
                        }
                        Err(e) => return self.fail(state, Phase::Critique, e.to_string()),
                    }
                }

                Phase::Decide => {
                    let Some(critique) = state.latest_critique.as_ref() else {
                        return self.fail(
                            state,
                            Phase::Decide,
                            "no critique available to gate on".to_string(),
                        );
                    };
                    let passed = critique.overall.passes(self.config.quality_threshold);
                    // Reaching the bound forces POLISH even below threshold:
                    // bounded effort takes precedence over quality.
                    let refining = !passed && !state.budget_exhausted();
                    self.trace.emit(TraceEvent::QualityGate {
                        score: critique.overall.value(),
                        threshold: self.config.quality_threshold,
                        refining,
                    });
                    if refining {
                        Phase::Refine
                    } else {
                        Phase::Polish
                    }
                }

                Phase::Refine => {
                    let request = GenerationRequest::from_state(&state, GenerationMode::Refine);
                    // Feedback is consumed by this round; don't reapply it later.
                    state.feedback = None;
                    match self.generator.generate(request).await {
                        Ok(post) => {
                            state.current_post = Some(post);
                            state.latest_critique = None;
                            self.emit_phase(Phase::Refine, state.iterations);
                            Phase::Critique
                        }
                        Err(e) => return self.fail(state, Phase::Refine, e.to_string()),
                    }
                }

                Phase::Polish => {
                    let request = GenerationRequest::from_state(&state, GenerationMode::Polish);
                    match self.generator.generate(request).await {
                        Ok(post) => {
                            state.final_post = Some(post);
                            state.complete = true;
                            self.emit_phase(Phase::Polish, state.iterations);
                            Phase::Done
                        }
                        Err(e) => return self.fail(state, Phase::Polish, e.to_string()),
                    }
                }

                Phase::Done => {
                    self.trace.emit(TraceEvent::RunFinished {
                        completed: state.complete,
                        iterations: state.iterations,
                    });
                    return state;
                }
            };
        }
    }

    /// Picks where the machine enters for a given state.
    ///
    /// GENERATE only when no post exists yet; a post with pending feedback
    /// resumes at REFINE unless the iteration budget is already spent, in
    /// which case the gate routes straight to POLISH; a post without its
    /// critique resumes at CRITIQUE; otherwise the gate decides.
    fn initial_phase(state: &WorkflowState) -> Phase {
        if state.current_post.is_none() {
            Phase::Generate
        } else if state.feedback.is_some() && !state.budget_exhausted() {
            Phase::Refine
        } else if state.latest_critique.is_none() {
            Phase::Critique
        } else {
            Phase::Decide
        }
    }

    fn emit_phase(&self, phase: Phase, iteration: u32) {
        self.trace.emit(TraceEvent::PhaseFinished {
            phase: phase.name(),
            iteration,
        });
    }

    fn fail(&self, mut state: WorkflowState, phase: Phase, error: String) -> WorkflowState {
        self.trace.emit(TraceEvent::RunFailed {
            phase: phase.name(),
            error: error.clone(),
        });
        state.complete = false;
        state.last_error = Some(format!("{}: {}", phase.name(), error));
        state
    }

    /// Helper used by callers presenting run results.
    pub fn converged(&self, state: &WorkflowState) -> bool {
        state.converged(self.config.quality_threshold)
    }

    #[cfg(test)]
    pub(crate) fn initial_phase_name(state: &WorkflowState) -> &'static str {
        Self::initial_phase(state).name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::content::{CritiqueResult, GeneratedPost};
    use crate::ports::{CritiqueError, GenerationError, NoopSink};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

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
            vec!["strength".into()],
            vec!["weakness".into()],
            vec!["tighten the hook".into()],
        )
        .unwrap()
    }

    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Scripted generator: queued responses, recorded calls.
    struct StubGenerator {
        posts: Mutex<VecDeque<Result<GeneratedPost, GenerationError>>>,
        critiques: Mutex<VecDeque<Result<CritiqueResult, CritiqueError>>>,
        generate_modes: Mutex<Vec<GenerationMode>>,
        requests: Mutex<Vec<GenerationRequest>>,
        critique_consumed: AtomicUsize,
    }

    impl StubGenerator {
        fn new() -> Self {
            Self {
                posts: Mutex::new(VecDeque::new()),
                critiques: Mutex::new(VecDeque::new()),
                generate_modes: Mutex::new(Vec::new()),
                requests: Mutex::new(Vec::new()),
                critique_consumed: AtomicUsize::new(0),
            }
        }

        fn queue_post(&self, p: GeneratedPost) {
            self.posts.lock().unwrap().push_back(Ok(p));
        }

        fn queue_post_error(&self, e: GenerationError) {
            self.posts.lock().unwrap().push_back(Err(e));
        }

        fn queue_critique(&self, c: CritiqueResult) {
            self.critiques.lock().unwrap().push_back(Ok(c));
        }

        fn queue_critique_error(&self, e: CritiqueError) {
            self.critiques.lock().unwrap().push_back(Err(e));
        }

        fn modes(&self) -> Vec<GenerationMode> {
            self.generate_modes.lock().unwrap().clone()
        }

        fn consumed_critiques(&self) -> usize {
            self.critique_consumed.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl PostGenerator for StubGenerator {
        async fn generate(
            &self,
            request: GenerationRequest,
        ) -> Result<GeneratedPost, GenerationError> {
            self.generate_modes.lock().unwrap().push(request.mode);
            self.requests.lock().unwrap().push(request);
            self.posts
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(GenerationError::Unavailable("queue empty".into())))
        }

        async fn critique(
            &self,
            _post: &GeneratedPost,
        ) -> Result<CritiqueResult, CritiqueError> {
            self.critique_consumed.fetch_add(1, Ordering::SeqCst);
            self.critiques
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(CritiqueError::Unavailable("queue empty".into())))
        }
    }

    fn engine(stub: std::sync::Arc<StubGenerator>) -> RefinementEngine {
        RefinementEngine::new(stub, std::sync::Arc::new(NoopSink), EngineConfig::default())
    }

    fn state(max: u32) -> WorkflowState {
        WorkflowState::new("AI improves diagnostics", max)
            .unwrap()
            .with_insights(vec!["faster detection".into()])
    }

    #[tokio::test]
    async fn completed_state_is_returned_unchanged_with_no_calls() {
        let stub = std::sync::Arc::new(StubGenerator::new());
        let engine = engine(stub.clone());

        let mut s = state(3);
        s.complete = true;
        s.final_post = Some(post("final"));
        let before = s.clone();

        let after = engine.run(s).await;

        assert_eq!(after, before);
        assert!(stub.modes().is_empty());
        assert_eq!(stub.consumed_critiques(), 0);
    }

    #[tokio::test]
    async fn first_round_pass_short_circuits_to_polish() {
        let stub = std::sync::Arc::new(StubGenerator::new());
        stub.queue_post(post("draft"));
        stub.queue_critique(critique(8));
        stub.queue_post(post("polished"));
        let engine = engine(stub.clone());

        let result = engine.run(state(3)).await;

        assert!(result.complete);
        assert_eq!(result.iterations, 1);
        assert_eq!(
            stub.modes(),
            vec![GenerationMode::Draft, GenerationMode::Polish]
        );
        assert_eq!(stub.consumed_critiques(), 1);
        assert_eq!(result.final_post.as_ref().unwrap().title, "title-polished");
        assert!(result.converged(7));
    }

    #[tokio::test]
    async fn persistent_low_scores_hit_the_bound_then_polish() {
        let stub = std::sync::Arc::new(StubGenerator::new());
        stub.queue_post(post("d1"));
        stub.queue_critique(critique(5));
        stub.queue_post(post("d2"));
        stub.queue_critique(critique(5));
        stub.queue_post(post("d3"));
        stub.queue_critique(critique(5));
        stub.queue_post(post("polished"));
        let engine = engine(stub.clone());

        let result = engine.run(state(3)).await;

        assert!(result.complete);
        assert_eq!(result.iterations, 3);
        assert_eq!(
            stub.modes(),
            vec![
                GenerationMode::Draft,
                GenerationMode::Refine,
                GenerationMode::Refine,
                GenerationMode::Polish,
            ]
        );
        assert_eq!(stub.consumed_critiques(), 3);
        // Budget exhaustion completed the run, but quality never passed.
        assert!(!result.converged(7));
    }

    #[tokio::test]
    async fn score_recovery_mid_run_stops_refining() {
        let stub = std::sync::Arc::new(StubGenerator::new());
        stub.queue_post(post("d1"));
        stub.queue_critique(critique(5));
        stub.queue_post(post("d2"));
        stub.queue_critique(critique(8));
        stub.queue_post(post("polished"));
        let engine = engine(stub.clone());

        let result = engine.run(state(3)).await;

        assert!(result.complete);
        assert_eq!(result.iterations, 2);
        assert!(result.converged(7));
    }

    #[tokio::test]
    async fn feedback_resume_enters_at_refine_and_consumes_feedback() {
        let stub = std::sync::Arc::new(StubGenerator::new());
        stub.queue_post(post("revised"));
        stub.queue_critique(critique(8));
        stub.queue_post(post("polished"));
        let engine = engine(stub.clone());

        let s = state(3)
            .resuming(post("active"), Some(critique(6)), 1, 2)
            .with_feedback("make it shorter");
        let result = engine.run(s).await;

        assert!(result.complete);
        assert!(result.feedback.is_none());
        assert_eq!(
            stub.modes(),
            vec![GenerationMode::Refine, GenerationMode::Polish]
        );
        // The refine request carried the feedback and prior context.
        let requests = stub.requests.lock().unwrap();
        assert_eq!(requests[0].feedback.as_deref(), Some("make it shorter"));
        assert!(requests[0].prior_post.is_some());
        assert!(requests[0].prior_critique.is_some());
    }

    #[tokio::test]
    async fn generation_failure_records_error_without_critique_calls() {
        let stub = std::sync::Arc::new(StubGenerator::new());
        stub.queue_post_error(GenerationError::Timeout { timeout_secs: 30 });
        let engine = engine(stub.clone());

        let result = engine.run(state(3)).await;

        assert!(!result.complete);
        assert!(result.final_post.is_none());
        assert!(result.last_error.as_ref().unwrap().starts_with("generate:"));
        assert_eq!(stub.consumed_critiques(), 0);
    }

    #[tokio::test]
    async fn critique_failure_keeps_post_for_retry() {
        let stub = std::sync::Arc::new(StubGenerator::new());
        stub.queue_post(post("draft"));
        stub.queue_critique_error(CritiqueError::Unavailable("overloaded".into()));
        let engine = engine(stub.clone());

        let result = engine.run(state(3)).await;

        assert!(!result.complete);
        assert!(result.current_post.is_some());
        assert!(result.latest_critique.is_none());
        assert!(result.last_error.as_ref().unwrap().starts_with("critique:"));
        // A retry of this state resumes at the critique step.
        assert_eq!(RefinementEngine::initial_phase_name(&result), "critique");
    }

    #[tokio::test]
    async fn failed_run_retries_cleanly() {
        let stub = std::sync::Arc::new(StubGenerator::new());
        stub.queue_post(post("draft"));
        stub.queue_critique_error(CritiqueError::Unavailable("overloaded".into()));
        let engine1 = engine(stub.clone());
        let failed = engine1.run(state(3)).await;
        assert!(failed.last_error.is_some());

        stub.queue_critique(critique(9));
        stub.queue_post(post("polished"));
        let result = engine1.run(failed).await;

        assert!(result.complete);
        assert!(result.last_error.is_none());
        assert_eq!(result.iterations, 1);
    }

    #[tokio::test]
    async fn cancellation_before_first_step_makes_no_calls() {
        let stub = std::sync::Arc::new(StubGenerator::new());
        let engine = engine(stub.clone());
        let (handle, signal) = CancelSignal::pair();
        handle.cancel();

        let result = engine.run_with_signal(state(3), signal).await;

        assert!(!result.complete);
        assert!(result.last_error.as_ref().unwrap().contains("cancelled"));
        assert!(stub.modes().is_empty());
    }

    #[tokio::test]
    async fn polish_forced_at_bound_when_budget_already_spent() {
        let stub = std::sync::Arc::new(StubGenerator::new());
        stub.queue_post(post("polished"));
        let engine = engine(stub.clone());

        // Post + failing critique, but iterations already at the bound.
        let s = state(2).resuming(post("active"), Some(critique(4)), 2, 2);
        let result = engine.run(s).await;

        assert!(result.complete);
        assert_eq!(result.iterations, 2);
        assert_eq!(stub.modes(), vec![GenerationMode::Polish]);
    }

    #[tokio::test]
    async fn feedback_with_spent_budget_polishes_without_refining() {
        let stub = std::sync::Arc::new(StubGenerator::new());
        stub.queue_post(post("polished"));
        let engine = engine(stub.clone());

        // Feedback pending but no iterations left: the gate goes straight
        // to polish rather than buying an extra refine round.
        let s = state(2)
            .resuming(post("active"), Some(critique(4)), 2, 2)
            .with_feedback("make it shorter");
        let result = engine.run(s).await;

        assert!(result.complete);
        assert_eq!(result.iterations, 2);
        assert_eq!(stub.modes(), vec![GenerationMode::Polish]);
        assert_eq!(stub.consumed_critiques(), 0);
        assert!(result.final_post.is_some());
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(64))]

            /// Bounded loop: at most `max` rounds regardless of scores, and
            /// a completed run always carries a terminal post.
            #[test]
            fn bounded_rounds_and_terminal_post(
                scores in proptest::collection::vec(1u8..=10, 1..8),
                max in 1u32..=4,
            ) {
                let rt = tokio::runtime::Builder::new_current_thread()
                    .build()
                    .unwrap();
                rt.block_on(async move {
                    let stub = std::sync::Arc::new(StubGenerator::new());
                    // Enough queued outputs for any path.
                    for i in 0..(max as usize + 2) {
                        stub.queue_post(post(&format!("p{}", i)));
                    }
                    for s in &scores {
                        stub.queue_critique(critique(*s));
                    }
                    let engine = engine(stub.clone());

                    let result = engine.run(state(max)).await;

                    if result.complete {
                        prop_assert!(result.final_post.is_some());
                    }
                    prop_assert!(result.iterations <= max);
                    prop_assert!(stub.consumed_critiques() as u32 <= max);
                    Ok(())
                })?;
            }
        }
    }
}
