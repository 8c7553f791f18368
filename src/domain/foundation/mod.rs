//! Shared foundation types: identifiers and validation errors.

mod errors;
mod ids;

pub use errors::ValidationError;
pub use ids::{MessageId, SessionId, VersionId};
