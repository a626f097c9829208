//! File-backed session store.
//!
//! Each session is stored as one JSON document under the cache directory.
//! Writes go to a temporary file first and are then renamed over the target,
//! so readers see either the previous or the new session, never a mix.

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

use paralegal_core::{traits::SessionStore, types::Session, Error, Result};

/// Persistent session storage using one JSON file per session.
pub struct FileSessionStore {
    dir: PathBuf,
}

impl FileSessionStore {
    /// Open (and create if needed) the cache directory.
    ///
    /// Fails with a configuration error if the directory cannot be created.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|e| {
            Error::configuration(format!(
                "Session cache directory {} is unavailable: {}",
                dir.display(),
                e
            ))
        })?;
        if !dir.is_dir() {
            return Err(Error::configuration(format!(
                "Session cache path {} is not a directory",
                dir.display()
            )));
        }
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Session ids are opaque: short ids are hex encoded, longer ones are
    /// replaced by their SHA-256 digest to stay under the file name limit.
    /// The real id is kept inside the document.
    fn path_for(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", file_stem(id)))
    }
}

/// Longest hex-encoded id used verbatim as a file stem.
const MAX_HEX_STEM: usize = 128;

fn file_stem(id: &str) -> String {
    let encoded = hex::encode(id);
    if encoded.len() <= MAX_HEX_STEM {
        return encoded;
    }
    format!("sha256-{}", hex::encode(Sha256::digest(id.as_bytes())))
}

#[async_trait]
impl SessionStore for FileSessionStore {
    async fn save(&self, session: &Session) -> Result<()> {
        let target = self.path_for(&session.id);
        let tmp = self
            .dir
            .join(format!(".{}.tmp", uuid::Uuid::new_v4()));

        let content = serde_json::to_vec_pretty(session)
            .map_err(|e| Error::storage(format!("Failed to serialize session: {}", e)))?;

        tokio::fs::write(&tmp, content)
            .await
            .map_err(|e| Error::storage(format!("Failed to write session file: {}", e)))?;

        if let Err(e) = tokio::fs::rename(&tmp, &target).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(Error::storage(format!("Failed to replace session file: {}", e)));
        }

        tracing::debug!(
            session_id = %session.id,
            path = %target.display(),
            "Saved session to disk"
        );
        Ok(())
    }

    async fn load(&self, session_id: &str) -> Result<Option<Session>> {
        let path = self.path_for(session_id);
        let content = match tokio::fs::read(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(Error::storage(format!("Failed to read session file: {}", e)))
            }
        };

        let session = serde_json::from_slice(&content)
            .map_err(|e| Error::storage(format!("Failed to parse session file: {}", e)))?;
        Ok(Some(session))
    }

    async fn delete(&self, session_id: &str) -> Result<()> {
        match tokio::fs::remove_file(self.path_for(session_id)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::storage(format!("Failed to delete session file: {}", e))),
        }
    }

    async fn list(&self) -> Result<Vec<String>> {
        let mut entries = tokio::fs::read_dir(&self.dir)
            .await
            .map_err(|e| Error::storage(format!("Failed to list session directory: {}", e)))?;

        let mut ids = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| Error::storage(format!("Failed to list session directory: {}", e)))?
        {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }

            let content = match tokio::fs::read(&path).await {
                Ok(content) => content,
                // Removed between listing and reading.
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => {
                    return Err(Error::storage(format!("Failed to read session file: {}", e)))
                }
            };
            match serde_json::from_slice::<Session>(&content) {
                Ok(session) => ids.push(session.id),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Skipping unreadable session file")
                }
            }
        }
        Ok(ids)
    }
}
