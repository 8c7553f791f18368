//! Trace sink adapters.

use std::sync::Mutex;

use crate::ports::{TraceEvent, TraceSink};

/// Sink that forwards events to the `tracing` subscriber.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl TraceSink for LogSink {
    fn emit(&self, event: TraceEvent) {
        match &event {
            TraceEvent::RunFailed { phase, error } => {
                tracing::warn!(phase = %phase, error = %error, "refinement run failed");
            }
            TraceEvent::RunCancelled { iteration } => {
                tracing::warn!(iteration = %iteration, "refinement run cancelled");
            }
            other => match serde_json::to_string(other) {
                Ok(json) => tracing::info!(event = %json, "trace"),
                Err(_) => tracing::info!(?other, "trace"),
            },
        }
    }
}

/// Sink that records events for assertions in tests.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<TraceEvent>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<TraceEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }
}

impl TraceSink for MemorySink {
    fn emit(&self, event: TraceEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_sink_records_in_order() {
        let sink = MemorySink::new();
        sink.emit(TraceEvent::RunStarted {
            iterations: 0,
            max_iterations: 3,
        });
        sink.emit(TraceEvent::RunFinished {
            completed: true,
            iterations: 1,
        });

        let events = sink.events();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], TraceEvent::RunStarted { .. }));
        assert!(matches!(events[1], TraceEvent::RunFinished { completed: true, .. }));
    }
}
