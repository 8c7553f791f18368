//! Session memory: the durable per-conversation record the orchestrator
//! loads at the start of every turn and writes back after it.

mod context;
mod memory;
mod message;

pub use context::{PostContext, PostVersion, SourceKind};
pub use memory::{ChatStage, SessionMemory};
pub use message::{ConversationMessage, MessageKind};
