//! Session Store Port - durable persistence for session memory.
//!
//! One record per session, addressable by id, last-write-wins. The core
//! persists write-through after every mutating turn and never expires
//! sessions itself; `stale_sessions` exposes the enumeration a caller needs
//! to apply its own retention policy.

use async_trait::async_trait;
use chrono::Duration;

use crate::domain::foundation::SessionId;
use crate::domain::session::SessionMemory;

/// Errors that can occur during session persistence.
///
/// Unlike engine failures these are surfaced to the caller as hard errors:
/// silently losing a session write is not acceptable.
#[derive(Debug, thiserror::Error)]
pub enum SessionStoreError {
    #[error("Session not found: {0}")]
    NotFound(SessionId),

    #[error("Failed to serialize session: {0}")]
    SerializationFailed(String),

    #[error("Failed to deserialize session: {0}")]
    DeserializationFailed(String),

    #[error("IO error: {0}")]
    IoError(String),
}

/// Port for persisting and loading session memory.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Persists a session record, replacing any previous one.
    async fn save(&self, session: &SessionMemory) -> Result<(), SessionStoreError>;

    /// Loads a session by id.
    ///
    /// # Errors
    /// Returns `SessionStoreError::NotFound` if no record exists.
    async fn load(&self, id: SessionId) -> Result<SessionMemory, SessionStoreError>;

    /// Checks whether a record exists for the id.
    async fn exists(&self, id: SessionId) -> Result<bool, SessionStoreError>;

    /// Deletes a session record. Deleting a missing record is not an error.
    async fn delete(&self, id: SessionId) -> Result<(), SessionStoreError>;

    /// Enumerates sessions whose last update is older than the given age.
    async fn stale_sessions(&self, older_than: Duration)
        -> Result<Vec<SessionId>, SessionStoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_displays_session_id() {
        let id = SessionId::new();
        let err = SessionStoreError::NotFound(id);
        assert!(err.to_string().contains(&id.to_string()));
    }
}
