//! History store factory

use std::sync::Arc;

use crate::redis::RedisPool;

use super::clock::Clock;
use super::config::RateLimitConfig;
use super::memory_store::MemoryHistoryStore;
use super::redis_store::RedisHistoryStore;
use super::store::HistoryStore;

/// Create a history store based on configuration.
///
/// - `"redis"`: a `RedisHistoryStore` if a Redis pool is provided
/// - anything else: a `MemoryHistoryStore` driven by `clock`
pub fn create_history_store(
    config: &RateLimitConfig,
    redis_pool: Option<Arc<RedisPool>>,
    clock: Arc<dyn Clock>,
) -> Arc<dyn HistoryStore> {
    match config.backend.as_str() {
        "redis" => {
            if let Some(pool) = redis_pool {
                tracing::info!(
                    backend = "redis",
                    prefix = %config.redis_prefix,
                    "Creating Redis rate limit history store"
                );
                Arc::new(RedisHistoryStore::new(pool, config.redis_prefix.clone()))
            } else {
                tracing::warn!(
                    "Redis history store requested but no pool provided, falling back to memory"
                );
                Arc::new(MemoryHistoryStore::with_clock(clock))
            }
        }
        _ => {
            tracing::info!(backend = "memory", "Creating memory rate limit history store");
            Arc::new(MemoryHistoryStore::with_clock(clock))
        }
    }
}
