//! Redis-backed history store for multi-instance deployments.
//!
//! Each history is a JSON array under `{prefix}:{user_id}:{action}` with a
//! `PX` expiry equal to the policy window, so Redis drops idle users itself.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::redis::{PoolError, RedisPool};

use super::store::{HistoryBackendType, HistoryStore, RateLimitEntry, StoreError};

/// Redis-backed history store.
pub struct RedisHistoryStore {
    pool: Arc<RedisPool>,
    prefix: String,
}

impl RedisHistoryStore {
    pub fn new(pool: Arc<RedisPool>, prefix: String) -> Self {
        Self { pool, prefix }
    }

    /// Redis key for a history key.
    fn storage_key(&self, key: &str) -> String {
        format!("{}:{}", self.prefix, key)
    }

    fn map_error(err: PoolError) -> StoreError {
        match err {
            PoolError::Redis(e) => StoreError::Redis(e),
            PoolError::ConnectionUnavailable(msg) => StoreError::Unavailable(msg),
        }
    }
}

#[async_trait]
impl HistoryStore for RedisHistoryStore {
    fn backend_type(&self) -> HistoryBackendType {
        HistoryBackendType::Redis
    }

    async fn get(&self, key: &str) -> Result<Vec<RateLimitEntry>, StoreError> {
        let raw = self
            .pool
            .get(&self.storage_key(key))
            .await
            .map_err(Self::map_error)?;

        match raw {
            Some(json) => Ok(serde_json::from_str(&json)?),
            None => Ok(Vec::new()),
        }
    }

    async fn set(
        &self,
        key: &str,
        entries: Vec<RateLimitEntry>,
        retention: Duration,
    ) -> Result<(), StoreError> {
        let storage_key = self.storage_key(key);

        if entries.is_empty() {
            return self.pool.del(&storage_key).await.map_err(Self::map_error);
        }

        let json = serde_json::to_string(&entries)?;
        let ttl_ms = u64::try_from(retention.as_millis()).unwrap_or(u64::MAX);

        self.pool
            .set_px(&storage_key, &json, ttl_ms)
            .await
            .map_err(Self::map_error)?;

        tracing::trace!(
            key = %storage_key,
            entries = entries.len(),
            ttl_ms = ttl_ms,
            "Stored rate limit history in Redis"
        );

        Ok(())
    }

    async fn cleanup_expired(&self) -> Result<usize, StoreError> {
        // Keys carry their own PX expiry
        Ok(0)
    }

    async fn tracked_keys(&self) -> Result<Option<usize>, StoreError> {
        // Counting would need a SCAN over the prefix
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RedisConfig;

    fn unreachable_store() -> RedisHistoryStore {
        let pool = RedisPool::new(RedisConfig {
            url: "redis://127.0.0.1:1".to_string(),
        })
        .unwrap();
        RedisHistoryStore::new(Arc::new(pool), "trpg:ratelimit".to_string())
    }

    #[test]
    fn test_storage_key_has_prefix() {
        let store = unreachable_store();
        assert_eq!(
            store.storage_key("user-1:create_scenario"),
            "trpg:ratelimit:user-1:create_scenario"
        );
    }

    #[test]
    fn test_map_error() {
        let err = RedisHistoryStore::map_error(PoolError::ConnectionUnavailable(
            "refused".to_string(),
        ));
        assert!(matches!(err, StoreError::Unavailable(msg) if msg == "refused"));
    }

    #[tokio::test]
    async fn test_unreachable_redis_surfaces_error() {
        let store = unreachable_store();
        assert_eq!(store.backend_type(), HistoryBackendType::Redis);

        let result = store.get("user-1:create_scenario").await;
        assert!(matches!(result, Err(StoreError::Unavailable(_))));
    }

    #[tokio::test]
    async fn test_sweep_and_count_are_server_side() {
        let store = unreachable_store();
        assert_eq!(store.cleanup_expired().await.unwrap(), 0);
        assert_eq!(store.tracked_keys().await.unwrap(), None);
    }
}
