//! In-memory session store implementation using DashMap.

use async_trait::async_trait;
use dashmap::DashMap;

use paralegal_core::{traits::SessionStore, types::Session, Result};

/// In-memory session store.
///
/// Sessions live for the lifetime of the process.
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    sessions: DashMap<String, Session>,
}

impl InMemorySessionStore {
    /// Create a new in-memory session store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the number of stored sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Check if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn save(&self, session: &Session) -> Result<()> {
        tracing::trace!(
            session_id = %session.id,
            messages = session.history.len(),
            "Storing session in memory"
        );
        self.sessions.insert(session.id.clone(), session.clone());
        Ok(())
    }

    async fn load(&self, session_id: &str) -> Result<Option<Session>> {
        Ok(self.sessions.get(session_id).map(|r| r.clone()))
    }

    async fn delete(&self, session_id: &str) -> Result<()> {
        self.sessions.remove(session_id);
        Ok(())
    }

    async fn list(&self) -> Result<Vec<String>> {
        Ok(self.sessions.iter().map(|r| r.key().clone()).collect())
    }
}
