//! Session persistence traits.

use async_trait::async_trait;
use crate::error::Result;
use crate::types::Session;

/// Backend holding whole sessions under their id.
///
/// Writes replace the stored session atomically; a backend never exposes a
/// partially written session.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Save a session.
    async fn save(&self, session: &Session) -> Result<()>;

    /// Load a session by ID.
    async fn load(&self, session_id: &str) -> Result<Option<Session>>;

    /// Delete a session.
    async fn delete(&self, session_id: &str) -> Result<()>;

    /// List stored session ids.
    async fn list(&self) -> Result<Vec<String>>;
}
