//! Presence storage in Redis.
//!
//! Publishes "this identity lives on this node" records for cross-instance
//! routing. Every record carries a TTL refreshed by accepted heartbeats, so
//! an ungracefully dropped connection lapses on its own; this tier never
//! deletes records (explicit offline is a backend concern).

use async_trait::async_trait;
use im_core::{DomainError, PresenceRecord, PresenceRepository, RepoResult, SessionKey};

use crate::pool::{RedisPool, RedisPoolError};

/// Key prefix for presence records
const PRESENCE_PREFIX: &str = "presence:";

/// Record TTL in seconds - refreshed by every accepted heartbeat
const PRESENCE_TTL: u64 = 300;

/// Redis-backed presence store
#[derive(Debug, Clone)]
pub struct PresenceStore {
    pool: RedisPool,
}

impl PresenceStore {
    #[must_use]
    pub fn new(pool: RedisPool) -> Self {
        Self { pool }
    }

    /// Generate the Redis key for an identity, `presence:{appID}:{userID}`.
    fn presence_key(key: &SessionKey) -> String {
        format!("{PRESENCE_PREFIX}{}", key.cache_key())
    }
}

impl From<RedisPoolError> for DomainError {
    fn from(err: RedisPoolError) -> Self {
        match err {
            RedisPoolError::Serialization(e) => DomainError::Serialization(e.to_string()),
            other => DomainError::PresenceStore(other.to_string()),
        }
    }
}

#[async_trait]
impl PresenceRepository for PresenceStore {
    async fn set_online(&self, record: &PresenceRecord) -> RepoResult<()> {
        let key = Self::presence_key(&record.session_key());
        self.pool.set(&key, record, Some(PRESENCE_TTL)).await?;

        tracing::debug!(
            key = %key,
            node = %record.node_address,
            "Presence record written"
        );

        Ok(())
    }

    async fn get_online(&self, key: &SessionKey) -> RepoResult<Option<PresenceRecord>> {
        let redis_key = Self::presence_key(key);
        let record = self.pool.get_value(&redis_key).await?;
        Ok(record)
    }
}
