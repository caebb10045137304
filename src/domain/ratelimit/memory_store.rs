//! In-memory history store using DashMap.
//!
//! History is lost on restart, which matches a single-instance deployment.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;

use super::clock::{Clock, SystemClock};
use super::store::{HistoryBackendType, HistoryStore, RateLimitEntry, StoreError};

struct StoredHistory {
    entries: Vec<RateLimitEntry>,
    /// Instant (Unix ms) after which every entry is outside its window
    expires_at: i64,
}

/// In-memory history store.
///
/// Each key remembers when its newest entry leaves the window, so that
/// [`cleanup_expired`](HistoryStore::cleanup_expired) can drop histories of
/// users who stopped acting.
pub struct MemoryHistoryStore {
    histories: DashMap<String, StoredHistory>,
    clock: Arc<dyn Clock>,
}

impl MemoryHistoryStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock::new()))
    }

    /// Create a store whose expiry sweep uses the given clock.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            histories: DashMap::new(),
            clock,
        }
    }
}

impl Default for MemoryHistoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HistoryStore for MemoryHistoryStore {
    fn backend_type(&self) -> HistoryBackendType {
        HistoryBackendType::Memory
    }

    async fn get(&self, key: &str) -> Result<Vec<RateLimitEntry>, StoreError> {
        Ok(self
            .histories
            .get(key)
            .map(|history| history.entries.clone())
            .unwrap_or_default())
    }

    async fn set(
        &self,
        key: &str,
        entries: Vec<RateLimitEntry>,
        retention: Duration,
    ) -> Result<(), StoreError> {
        let Some(newest) = entries.iter().map(|e| e.timestamp).max() else {
            self.histories.remove(key);
            return Ok(());
        };

        let retention_ms = i64::try_from(retention.as_millis()).unwrap_or(i64::MAX);
        self.histories.insert(
            key.to_string(),
            StoredHistory {
                entries,
                expires_at: newest.saturating_add(retention_ms),
            },
        );

        Ok(())
    }

    async fn cleanup_expired(&self) -> Result<usize, StoreError> {
        let now = self.clock.now_millis();
        let before = self.histories.len();

        self.histories.retain(|_, history| history.expires_at > now);

        let removed = before.saturating_sub(self.histories.len());
        if removed > 0 {
            tracing::debug!(
                removed = removed,
                remaining = self.histories.len(),
                "Cleaned up expired rate limit histories"
            );
        }

        Ok(removed)
    }

    async fn tracked_keys(&self) -> Result<Option<usize>, StoreError> {
        Ok(Some(self.histories.len()))
    }
}
