//! Ports: interfaces to external capabilities.
//!
//! The core consumes generation, critique, intent classification, file
//! ingestion, persistence and tracing through these narrow traits; any
//! concrete backend may be substituted.

mod generation;
mod ingestion;
mod intent_fallback;
mod session_store;
mod trace;

pub use generation::{
    CritiqueError, GenerationError, GenerationMode, GenerationRequest, PostGenerator,
};
pub use ingestion::{ContentExtractor, ExtractedContent, IngestionError, UploadedFile};
pub use intent_fallback::{ClassificationError, IntentFallback};
pub use session_store::{SessionStore, SessionStoreError};
pub use trace::{NoopSink, TraceEvent, TraceSink};
