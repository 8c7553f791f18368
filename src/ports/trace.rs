//! Trace Port - fire-and-forget observability sink.
//!
//! The signature is infallible on purpose: a sink failure must never
//! propagate to the caller, so implementations swallow their own errors.

use serde::Serialize;

use crate::domain::foundation::SessionId;

/// Structured events emitted by the engine and orchestrator.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TraceEvent {
    RunStarted {
        iterations: u32,
        max_iterations: u32,
    },
    PhaseFinished {
        phase: &'static str,
        iteration: u32,
    },
    QualityGate {
        score: u8,
        threshold: u8,
        refining: bool,
    },
    RunFinished {
        completed: bool,
        iterations: u32,
    },
    RunFailed {
        phase: &'static str,
        error: String,
    },
    RunCancelled {
        iteration: u32,
    },
    IntentResolved {
        session: SessionId,
        intent: &'static str,
        via_fallback: bool,
    },
    TurnProcessed {
        session: SessionId,
        stage: &'static str,
    },
    SessionEvicted {
        session: SessionId,
    },
}

/// Port for the observability sink.
pub trait TraceSink: Send + Sync {
    /// Records one event. Must not block and must not fail.
    fn emit(&self, event: TraceEvent);
}

/// Sink that drops every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl TraceSink for NoopSink {
    fn emit(&self, _event: TraceEvent) {}
}
