//! Redis implementation of SessionStore.

use async_trait::async_trait;
use redis::{AsyncCommands, Client};

use paralegal_core::{traits::SessionStore, types::Session, Error, Result};

/// Redis persistence for sessions.
///
/// Each session is one JSON value; `SET EX` replaces it in a single command
/// and lets Redis expire idle sessions on its own.
pub struct RedisSessionStore {
    client: Client,
    prefix: String,
    ttl_seconds: u64,
}

impl RedisSessionStore {
    /// Create a new Redis session store.
    ///
    /// A `ttl_seconds` of 0 stores sessions without expiry.
    pub fn new(url: &str, prefix: &str, ttl_seconds: u64) -> Result<Self> {
        let client = Client::open(url)
            .map_err(|e| Error::configuration(format!("Invalid Redis URL {}: {}", url, e)))?;

        Ok(Self {
            client,
            prefix: prefix.to_string(),
            ttl_seconds,
        })
    }

    fn key(&self, id: &str) -> String {
        format!("{}:{}", self.prefix, id)
    }

    async fn connection(&self) -> Result<redis::aio::MultiplexedConnection> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| Error::storage(format!("Redis connection error: {}", e)))
    }
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn load(&self, id: &str) -> Result<Option<Session>> {
        let mut conn = self.connection().await?;

        let data: Option<String> = conn
            .get(self.key(id))
            .await
            .map_err(|e| Error::storage(format!("Redis get error: {}", e)))?;

        match data {
            Some(json) => {
                let session = serde_json::from_str(&json)
                    .map_err(|e| Error::storage(format!("Failed to deserialize session: {}", e)))?;
                Ok(Some(session))
            }
            None => Ok(None),
        }
    }

    async fn save(&self, session: &Session) -> Result<()> {
        let mut conn = self.connection().await?;

        let key = self.key(&session.id);
        let json = serde_json::to_string(session)
            .map_err(|e| Error::storage(format!("Failed to serialize session: {}", e)))?;

        let result: redis::RedisResult<()> = if self.ttl_seconds > 0 {
            conn.set_ex(&key, json, self.ttl_seconds).await
        } else {
            conn.set(&key, json).await
        };
        result.map_err(|e| Error::storage(format!("Redis set error: {}", e)))?;

        tracing::debug!(session_id = %session.id, ttl = self.ttl_seconds, "Saved session to Redis");
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let mut conn = self.connection().await?;

        let _: () = conn
            .del(self.key(id))
            .await
            .map_err(|e| Error::storage(format!("Redis delete error: {}", e)))?;

        Ok(())
    }

    async fn list(&self) -> Result<Vec<String>> {
        let mut conn = self.connection().await?;

        let pattern = format!("{}:*", self.prefix);
        let keys: Vec<String> = conn
            .keys(&pattern)
            .await
            .map_err(|e| Error::storage(format!("Redis keys error: {}", e)))?;

        let strip = format!("{}:", self.prefix);
        Ok(keys
            .into_iter()
            .filter_map(|k| k.strip_prefix(&strip).map(str::to_string))
            .collect())
    }
}
