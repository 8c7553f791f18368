//! File-backed session store.
//!
//! One YAML document per session, named `<session-id>.yaml` under the base
//! directory. Writes replace the whole document; the newest write wins.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use tokio::fs;

use crate::domain::foundation::SessionId;
use crate::domain::session::SessionMemory;
use crate::ports::{SessionStore, SessionStoreError};

pub struct FileSessionStore {
    base_dir: PathBuf,
}

impl FileSessionStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    fn session_path(&self, id: SessionId) -> PathBuf {
        self.base_dir.join(format!("{}.yaml", id))
    }

    async fn ensure_base_dir(&self) -> Result<(), SessionStoreError> {
        fs::create_dir_all(&self.base_dir)
            .await
            .map_err(|e| SessionStoreError::IoError(e.to_string()))
    }

    fn id_from_path(path: &Path) -> Option<SessionId> {
        let stem = path.file_stem()?.to_str()?;
        stem.parse().ok()
    }
}

#[async_trait]
impl SessionStore for FileSessionStore {
    async fn save(&self, session: &SessionMemory) -> Result<(), SessionStoreError> {
        self.ensure_base_dir().await?;

        let yaml = serde_yaml::to_string(session)
            .map_err(|e| SessionStoreError::SerializationFailed(e.to_string()))?;

        // Write to a temp file first so a crash never leaves a torn record.
        let path = self.session_path(session.id);
        let tmp = path.with_extension("yaml.tmp");
        fs::write(&tmp, yaml.as_bytes())
            .await
            .map_err(|e| SessionStoreError::IoError(e.to_string()))?;
        fs::rename(&tmp, &path)
            .await
            .map_err(|e| SessionStoreError::IoError(e.to_string()))
    }

    async fn load(&self, id: SessionId) -> Result<SessionMemory, SessionStoreError> {
        let path = self.session_path(id);
        let yaml = match fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(SessionStoreError::NotFound(id));
            }
            Err(e) => return Err(SessionStoreError::IoError(e.to_string())),
        };

        serde_yaml::from_str(&yaml)
            .map_err(|e| SessionStoreError::DeserializationFailed(e.to_string()))
    }

    async fn exists(&self, id: SessionId) -> Result<bool, SessionStoreError> {
        Ok(fs::try_exists(self.session_path(id))
            .await
            .map_err(|e| SessionStoreError::IoError(e.to_string()))?)
    }

    async fn delete(&self, id: SessionId) -> Result<(), SessionStoreError> {
        match fs::remove_file(self.session_path(id)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(SessionStoreError::IoError(e.to_string())),
        }
    }

    async fn stale_sessions(
        &self,
        older_than: Duration,
    ) -> Result<Vec<SessionId>, SessionStoreError> {
        let cutoff = Utc::now() - older_than;
        let mut stale = Vec::new();

        let mut entries = match fs::read_dir(&self.base_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(stale),
            Err(e) => return Err(SessionStoreError::IoError(e.to_string())),
        };

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| SessionStoreError::IoError(e.to_string()))?
        {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("yaml") {
                continue;
            }
            let Some(id) = Self::id_from_path(&path) else {
                continue;
            };
            // An unreadable record is skipped, not fatal to the sweep.
            if let Ok(session) = self.load(id).await {
                if session.updated_at < cutoff {
                    stale.push(id);
                }
            }
        }

        Ok(stale)
    }
}
