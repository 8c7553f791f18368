//! Application layer: the conversation orchestrator and its helpers.

mod orchestrator;
mod replies;
mod sweeper;

pub use orchestrator::{ConversationOrchestrator, OrchestratorError, TurnReply};
pub use sweeper::SessionSweeper;
