//! Refinement workflow: the state value threaded through the engine and
//! the bounded generate-critique-refine state machine itself.

mod engine;
mod state;

pub use engine::{CancelHandle, CancelSignal, EngineConfig, RefinementEngine};
pub use state::WorkflowState;
