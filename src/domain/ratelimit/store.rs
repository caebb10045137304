//! Storage port for rate limit history.
//!
//! The limiter reads a user's history for one action, prunes it, and writes
//! it back. Implementations only need keyed get/set; the algorithm stays in
//! [`RateLimiter`](super::RateLimiter).

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised by history store backends.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Redis operation failed
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// Stored history could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Backend is temporarily unavailable
    #[error("History store unavailable: {0}")]
    Unavailable(String),
}

/// One past, allowed action by one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitEntry {
    /// When the action happened (Unix milliseconds)
    pub timestamp: i64,
    /// Action identifier, e.g. `create_scenario`
    pub action: String,
}

impl RateLimitEntry {
    pub fn new(action: impl Into<String>, timestamp: i64) -> Self {
        Self {
            timestamp,
            action: action.into(),
        }
    }
}

/// Which backend holds the history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryBackendType {
    /// In-process map (single instance)
    Memory,
    /// Shared Redis keys (multi-instance)
    Redis,
}

impl HistoryBackendType {
    pub fn as_str(&self) -> &'static str {
        match self {
            HistoryBackendType::Memory => "memory",
            HistoryBackendType::Redis => "redis",
        }
    }
}

/// Build the history key for a user and action: `{user_id}:{action}`.
pub fn history_key(user_id: &str, action: &str) -> String {
    format!("{}:{}", user_id, action)
}

/// Keyed storage for per-user action history.
///
/// Implementations must be `Send + Sync`; one store is shared by every
/// request handler.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Get the backend type.
    fn backend_type(&self) -> HistoryBackendType;

    /// Read the history stored under `key`. A missing key is an empty history.
    async fn get(&self, key: &str) -> Result<Vec<RateLimitEntry>, StoreError>;

    /// Replace the history stored under `key`.
    ///
    /// `retention` is the policy window: once the newest entry is older than
    /// that, the whole key may be discarded. An empty list removes the key.
    async fn set(
        &self,
        key: &str,
        entries: Vec<RateLimitEntry>,
        retention: Duration,
    ) -> Result<(), StoreError>;

    /// Remove keys whose entries have all expired.
    ///
    /// Returns the number of keys removed.
    async fn cleanup_expired(&self) -> Result<usize, StoreError>;

    /// Number of keys currently tracked, if the backend can tell cheaply.
    async fn tracked_keys(&self) -> Result<Option<usize>, StoreError>;
}
