//! Domain layer: content models, the refinement state machine, session
//! memory, and intent classification. No I/O lives here; external
//! capabilities are reached through the ports layer.

pub mod content;
pub mod foundation;
pub mod intent;
pub mod session;
pub mod workflow;
