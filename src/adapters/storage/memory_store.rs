//! In-memory session store for tests and ephemeral runs.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use tokio::sync::RwLock;

use crate::domain::foundation::SessionId;
use crate::domain::session::SessionMemory;
use crate::ports::{SessionStore, SessionStoreError};

#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<SessionId, SessionMemory>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored sessions.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn save(&self, session: &SessionMemory) -> Result<(), SessionStoreError> {
        self.sessions
            .write()
            .await
            .insert(session.id, session.clone());
        Ok(())
    }

    async fn load(&self, id: SessionId) -> Result<SessionMemory, SessionStoreError> {
        self.sessions
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(SessionStoreError::NotFound(id))
    }

    async fn exists(&self, id: SessionId) -> Result<bool, SessionStoreError> {
        Ok(self.sessions.read().await.contains_key(&id))
    }

    async fn delete(&self, id: SessionId) -> Result<(), SessionStoreError> {
        self.sessions.write().await.remove(&id);
        Ok(())
    }

    async fn stale_sessions(
        &self,
        older_than: Duration,
    ) -> Result<Vec<SessionId>, SessionStoreError> {
        let cutoff = Utc::now() - older_than;
        Ok(self
            .sessions
            .read()
            .await
            .values()
            .filter(|s| s.updated_at < cutoff)
            .map(|s| s.id)
            .collect())
    }
}
