//! Bounded session cache on top of a [`SessionStore`] backend.

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

use paralegal_core::{
    traits::SessionStore,
    types::{ConversationState, Session, TranscriptEntry, DEFAULT_HISTORY_BOUND},
    Result,
};

/// Per-session history cache.
///
/// Every session id gets its own async mutex. A conversation run takes the
/// guard from [`SessionCache::lock`] and holds it for its whole duration, so
/// two requests for the same id never interleave. Apart from [`clear`], the
/// other methods do not lock on their own.
///
/// A session's mutex lives only while someone holds or waits for it.
///
/// [`clear`]: SessionCache::clear
pub struct SessionCache {
    store: Arc<dyn SessionStore>,
    bound: usize,
    ttl_secs: u64,
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl SessionCache {
    /// Create a cache with the default bound and no expiry.
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self {
            store,
            bound: DEFAULT_HISTORY_BOUND,
            ttl_secs: 0,
            locks: DashMap::new(),
        }
    }

    /// Set the number of messages kept per session.
    pub fn with_bound(mut self, bound: usize) -> Self {
        self.bound = bound.max(1);
        self
    }

    /// Set the idle time after which a session is discarded (0 disables).
    pub fn with_ttl(mut self, ttl_secs: u64) -> Self {
        self.ttl_secs = ttl_secs;
        self
    }

    pub fn bound(&self) -> usize {
        self.bound
    }

    /// Acquire the single-writer guard for a session.
    pub async fn lock(&self, session_id: &str) -> SessionGuard<'_> {
        let mutex = self
            .locks
            .entry(session_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        SessionGuard {
            guard: Some(mutex.lock_owned().await),
            session_id: session_id.to_string(),
            locks: &self.locks,
        }
    }

    /// Load a session, or start a fresh one when absent or expired.
    ///
    /// Expired sessions are deleted from the backend.
    pub async fn session(&self, session_id: &str) -> Result<Session> {
        let Some(mut session) = self.store.load(session_id).await? else {
            tracing::debug!(session_id = %session_id, "Starting new session");
            return Ok(Session::new(session_id, self.bound));
        };

        let now = chrono::Utc::now().timestamp();
        if session.is_expired(self.ttl_secs, now) {
            tracing::info!(
                session_id = %session_id,
                idle_secs = now - session.updated_at,
                "Session expired, starting fresh"
            );
            self.store.delete(session_id).await?;
            return Ok(Session::new(session_id, self.bound));
        }

        session.history.set_bound(self.bound);
        Ok(session)
    }

    /// Bounded history for a session; empty on first access.
    pub async fn get(&self, session_id: &str) -> Result<ConversationState> {
        Ok(self.session(session_id).await?.history)
    }

    /// Append one message to the tail, evicting from the head over the bound.
    pub async fn append(&self, session_id: &str, entry: TranscriptEntry) -> Result<()> {
        self.append_all(session_id, std::iter::once(entry)).await?;
        Ok(())
    }

    /// Append several messages and persist the whole bounded sequence once.
    pub async fn append_all(
        &self,
        session_id: &str,
        entries: impl IntoIterator<Item = TranscriptEntry> + Send,
    ) -> Result<ConversationState> {
        let mut session = self.session(session_id).await?;
        for entry in entries {
            session.history.push(entry);
        }
        self.save(&mut session).await?;
        Ok(session.history)
    }

    /// Persist a session after local modifications.
    pub async fn save(&self, session: &mut Session) -> Result<()> {
        session.history.set_bound(self.bound);
        session.touch();
        self.store.save(session).await
    }

    /// Re-apply the bound and the expiry policy to a stored session.
    pub async fn prune(&self, session_id: &str) -> Result<()> {
        let Some(mut session) = self.store.load(session_id).await? else {
            return Ok(());
        };

        let now = chrono::Utc::now().timestamp();
        if session.is_expired(self.ttl_secs, now) {
            tracing::info!(session_id = %session_id, "Pruned expired session");
            return self.store.delete(session_id).await;
        }

        if session.history.len() > self.bound || session.history.bound() != self.bound {
            session.history.set_bound(self.bound);
            self.store.save(&session).await?;
        }
        Ok(())
    }

    /// Delete a session, waiting for any run on it to finish first.
    pub async fn clear(&self, session_id: &str) -> Result<()> {
        let _guard = self.lock(session_id).await;
        self.store.delete(session_id).await
    }

    /// Ids of every stored session.
    pub async fn list(&self) -> Result<Vec<String>> {
        self.store.list().await
    }
}

/// Exclusive access to one session, released on drop.
pub struct SessionGuard<'a> {
    guard: Option<OwnedMutexGuard<()>>,
    session_id: String,
    locks: &'a DashMap<String, Arc<Mutex<()>>>,
}

impl Drop for SessionGuard<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        // Waiters clone the mutex under the map's shard lock, so a count of
        // one here means nobody else holds or awaits it.
        self.locks
            .remove_if(&self.session_id, |_, mutex| Arc::strong_count(mutex) == 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::InMemorySessionStore;
    use paralegal_core::mocks::MockSessionStore;
    use paralegal_core::types::AgentRole;
    use paralegal_core::Error;
    use std::time::Duration;

    fn cache() -> (Arc<InMemorySessionStore>, SessionCache) {
        let store = Arc::new(InMemorySessionStore::new());
        let cache = SessionCache::new(store.clone());
        (store, cache)
    }

    #[tokio::test]
    async fn test_first_access_is_empty() {
        let (_, cache) = cache();
        let history = cache.get("fresh").await.unwrap();
        assert!(history.is_empty());
        assert_eq!(history.bound(), 10);
    }

    #[tokio::test]
    async fn test_append_is_bounded_fifo() {
        let (_, cache) = cache();
        for i in 0..13 {
            cache
                .append("chat", TranscriptEntry::text(AgentRole::Router, format!("m{i}")))
                .await
                .unwrap();
            assert!(cache.get("chat").await.unwrap().len() <= 10);
        }
        let history = cache.get("chat").await.unwrap();
        assert_eq!(history.len(), 10);
        assert_eq!(history.iter().next().unwrap().content.to_text(), "m3");
    }

    #[tokio::test]
    async fn test_expired_session_is_fresh_and_deleted() {
        let (store, cache) = cache();
        let cache = cache.with_ttl(60);

        let mut old = Session::new("stale", 10);
        old.history.push(TranscriptEntry::text(AgentRole::Tax, "old"));
        old.updated_at -= 3600;
        store.save(&old).await.unwrap();

        assert!(cache.get("stale").await.unwrap().is_empty());
        assert!(store.load("stale").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_prune_reapplies_bound() {
        let (store, cache) = cache();
        let mut wide = Session::new("wide", 20);
        for i in 0..15 {
            wide.history.push(TranscriptEntry::text(AgentRole::Tax, format!("m{i}")));
        }
        store.save(&wide).await.unwrap();

        cache.prune("wide").await.unwrap();
        let stored = store.load("wide").await.unwrap().unwrap();
        assert_eq!(stored.history.len(), 10);
        assert_eq!(stored.history.iter().next().unwrap().content.to_text(), "m5");

        cache.prune("missing").await.unwrap();
    }

    #[tokio::test]
    async fn test_unavailable_backend_fails_loudly() {
        let cache = SessionCache::new(Arc::new(MockSessionStore::unavailable()));
        let result = cache
            .append("chat", TranscriptEntry::text(AgentRole::Router, "x"))
            .await;
        assert!(matches!(result, Err(Error::Storage(_))));
    }

    #[tokio::test]
    async fn test_lock_serialises_same_session() {
        let (_, cache) = cache();
        let cache = Arc::new(cache);

        let guard = cache.lock("chat").await;
        let contender = {
            let cache = cache.clone();
            tokio::spawn(async move {
                let _guard = cache.lock("chat").await;
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        // Other sessions are not blocked.
        let _other = cache.lock("other").await;

        drop(guard);
        contender.await.unwrap();
    }

    #[tokio::test]
    async fn test_released_locks_are_evicted() {
        let (_, cache) = cache();
        for i in 0..1000 {
            let _guard = cache.lock(&format!("s{i}")).await;
        }
        assert_eq!(cache.locks.len(), 0);
    }

    #[tokio::test]
    async fn test_waited_lock_survives_holder_release() {
        let (_, cache) = cache();
        let cache = Arc::new(cache);

        let guard = cache.lock("chat").await;
        let contender = {
            let cache = cache.clone();
            tokio::spawn(async move {
                let _guard = cache.lock("chat").await;
                tokio::time::sleep(Duration::from_millis(20)).await;
            })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        drop(guard);

        // The contender now holds the mutex, so the entry stays.
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert_eq!(cache.locks.len(), 1);

        contender.await.unwrap();
        assert_eq!(cache.locks.len(), 0);
    }

    #[tokio::test]
    async fn test_clear_waits_for_running_session() {
        let (store, cache) = cache();
        let cache = Arc::new(cache);
        cache
            .append("chat", TranscriptEntry::text(AgentRole::Router, "m"))
            .await
            .unwrap();

        let guard = cache.lock("chat").await;
        let clearing = {
            let cache = cache.clone();
            tokio::spawn(async move { cache.clear("chat").await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!clearing.is_finished());
        assert!(store.load("chat").await.unwrap().is_some());

        // No second writer gets in while the first still holds the session.
        let second = tokio::time::timeout(Duration::from_millis(50), cache.lock("chat")).await;
        assert!(second.is_err());

        drop(guard);
        clearing.await.unwrap().unwrap();
        assert!(store.load("chat").await.unwrap().is_none());
        assert_eq!(cache.locks.len(), 0);
    }
}
