//! Sliding window rate limiter

use std::sync::Arc;

use dashmap::DashMap;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::Mutex;

use crate::domain::messages::RATE_LIMIT_EXCEEDED_MESSAGE;
use crate::metrics::RateLimitMetrics;

use super::clock::Clock;
use super::config::RateLimitConfig;
use super::policy::{PolicyTable, RateLimitPolicy};
use super::store::{history_key, HistoryBackendType, HistoryStore, RateLimitEntry, StoreError};

/// Role that bypasses rate limiting entirely
pub const EXEMPT_ROLE: &str = "MODERATOR";

/// Errors returned by the rate limiter.
///
/// A rejected action is not an error; it is a [`RateLimitDecision`].
#[derive(Debug, Error)]
pub enum RateLimitError {
    /// The acting user has no identifier
    #[error("User ID must not be empty")]
    EmptyUserId,

    /// A policy with a zero ceiling or an empty window
    #[error("Invalid rate limit policy (max_actions: {max_actions}, window_ms: {window_ms})")]
    InvalidPolicy { max_actions: u32, window_ms: u64 },

    /// The history store failed
    #[error("Rate limit store error: {0}")]
    Store(#[from] StoreError),
}

/// Why a decision left the default path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RateLimitReason {
    ModeratorExempt,
    RateLimitExceeded,
}

/// Outcome of a rate limit check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RateLimitDecision {
    /// Whether the action may proceed
    pub allowed: bool,
    /// Set only when the role exemption applied
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub exempt: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<RateLimitReason>,
    /// User-facing message, present only on denial. Never carries counts or waits.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl RateLimitDecision {
    pub fn allowed() -> Self {
        Self {
            allowed: true,
            exempt: false,
            reason: None,
            message: None,
        }
    }

    pub fn exempt() -> Self {
        Self {
            allowed: true,
            exempt: true,
            reason: Some(RateLimitReason::ModeratorExempt),
            message: None,
        }
    }

    pub fn exceeded() -> Self {
        Self {
            allowed: false,
            exempt: false,
            reason: Some(RateLimitReason::RateLimitExceeded),
            message: Some(RATE_LIMIT_EXCEEDED_MESSAGE.to_string()),
        }
    }
}

/// One rate limited action attempt.
#[derive(Debug, Clone, Copy)]
pub struct RateLimitRequest<'a> {
    pub user_id: &'a str,
    /// Action identifier; unknown actions are unlimited
    pub action: &'a str,
    pub user_role: Option<&'a str>,
}

impl<'a> RateLimitRequest<'a> {
    pub fn new(user_id: &'a str, action: &'a str) -> Self {
        Self {
            user_id,
            action,
            user_role: None,
        }
    }

    pub fn with_role(mut self, role: Option<&'a str>) -> Self {
        self.user_role = role;
        self
    }

    fn is_exempt(&self) -> bool {
        self.user_role == Some(EXEMPT_ROLE)
    }
}

/// Per-user, per-action sliding window limiter.
///
/// History is read, pruned of entries older than the window, and written back
/// on every check. Only allowed actions are recorded.
///
/// Checks for the same `(user, action)` key are serialized within this
/// process by a per-key async mutex. Instances sharing a Redis store do not
/// coordinate, so concurrent requests on different instances can exceed the
/// ceiling by the number of instances racing.
pub struct RateLimiter {
    store: Arc<dyn HistoryStore>,
    clock: Arc<dyn Clock>,
    policies: PolicyTable,
    enabled: bool,
    key_locks: DashMap<String, Arc<Mutex<()>>>,
}

impl RateLimiter {
    /// Create an enabled limiter.
    pub fn new(policies: PolicyTable, store: Arc<dyn HistoryStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            policies,
            enabled: true,
            key_locks: DashMap::new(),
        }
    }

    /// Create a limiter from configuration, validating its policies.
    pub fn from_config(
        config: &RateLimitConfig,
        store: Arc<dyn HistoryStore>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, RateLimitError> {
        let mut limiter = Self::new(config.policy_table()?, store, clock);
        limiter.enabled = config.enabled;
        Ok(limiter)
    }

    /// Check if rate limiting is enabled
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn policy(&self, action: &str) -> Option<RateLimitPolicy> {
        self.policies.get(action)
    }

    pub fn backend_type(&self) -> HistoryBackendType {
        self.store.backend_type()
    }

    /// Decide whether `request.user_id` may perform `request.action` now.
    ///
    /// Moderators are allowed without reading or writing history. Actions
    /// without a policy are allowed. Otherwise the action is allowed while
    /// fewer than `max_actions` actions fall inside the window, and recorded.
    ///
    /// # Errors
    ///
    /// `RateLimitError::EmptyUserId` for a blank user, and
    /// `RateLimitError::Store` when the history store fails. Whether a store
    /// failure blocks the action is up to the caller.
    pub async fn check_rate_limit(
        &self,
        request: &RateLimitRequest<'_>,
    ) -> Result<RateLimitDecision, RateLimitError> {
        let label = self.policies.metric_label(request.action);

        if request.is_exempt() {
            RateLimitMetrics::record_exempt(label);
            tracing::debug!(
                user_id = %request.user_id,
                action = %request.action,
                "Rate limit skipped for exempt role"
            );
            return Ok(RateLimitDecision::exempt());
        }

        if request.user_id.is_empty() {
            return Err(RateLimitError::EmptyUserId);
        }

        if !self.enabled {
            return Ok(RateLimitDecision::allowed());
        }

        let Some(policy) = self.policies.get(request.action) else {
            RateLimitMetrics::record_allowed(label);
            return Ok(RateLimitDecision::allowed());
        };

        let key = history_key(request.user_id, request.action);
        let lock = self.key_lock(&key);
        let _guard = lock.lock().await;

        let now = self.clock.now_millis();
        let history = self.store.get(&key).await.map_err(|e| self.store_error(e))?;
        let stored = history.len();

        let mut active: Vec<RateLimitEntry> = history
            .into_iter()
            .filter(|entry| policy.is_active(entry.timestamp, now))
            .collect();

        if active.len() >= policy.max_actions() as usize {
            if active.len() < stored {
                self.store
                    .set(&key, active, policy.window())
                    .await
                    .map_err(|e| self.store_error(e))?;
            }

            RateLimitMetrics::record_denied(label);
            tracing::info!(
                user_id = %request.user_id,
                action = %request.action,
                max_actions = policy.max_actions(),
                window_ms = policy.window_ms(),
                "Rate limit exceeded"
            );
            return Ok(RateLimitDecision::exceeded());
        }

        active.push(RateLimitEntry::new(request.action, now));
        let recorded = active.len();
        self.store
            .set(&key, active, policy.window())
            .await
            .map_err(|e| self.store_error(e))?;

        RateLimitMetrics::record_allowed(label);
        tracing::debug!(
            user_id = %request.user_id,
            action = %request.action,
            recorded = recorded,
            max_actions = policy.max_actions(),
            "Rate limited action allowed"
        );

        Ok(RateLimitDecision::allowed())
    }

    /// Sweep expired histories and idle key locks.
    ///
    /// Returns the number of histories removed from the store.
    pub async fn cleanup_expired(&self) -> Result<usize, RateLimitError> {
        let removed = self
            .store
            .cleanup_expired()
            .await
            .map_err(|e| self.store_error(e))?;

        // A lock still referenced elsewhere belongs to an in-flight check
        self.key_locks.retain(|_, lock| Arc::strong_count(lock) > 1);

        Ok(removed)
    }

    /// Get statistics about the rate limiter
    pub async fn stats(&self) -> RateLimiterStats {
        let tracked_keys = match self.store.tracked_keys().await {
            Ok(count) => count,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to count rate limit histories");
                None
            }
        };

        let mut limited_actions: Vec<String> = self
            .policies
            .iter()
            .map(|(action, _)| action.to_string())
            .collect();
        limited_actions.sort();

        RateLimiterStats {
            enabled: self.enabled,
            backend: self.store.backend_type(),
            limited_actions,
            tracked_keys,
        }
    }

    fn key_lock(&self, key: &str) -> Arc<Mutex<()>> {
        self.key_locks
            .entry(key.to_string())
            .or_default()
            .value()
            .clone()
    }

    fn store_error(&self, err: StoreError) -> RateLimitError {
        let backend = self.store.backend_type();
        RateLimitMetrics::record_store_error(backend.as_str());
        tracing::error!(
            backend = backend.as_str(),
            error = %err,
            "Rate limit history store failed"
        );
        RateLimitError::Store(err)
    }
}

/// Statistics about the rate limiter
#[derive(Debug, Clone, Serialize)]
pub struct RateLimiterStats {
    pub enabled: bool,
    pub backend: HistoryBackendType,
    /// Actions that have a policy. Ceilings and windows stay internal.
    pub limited_actions: Vec<String>,
    /// Histories currently stored, when the backend can count them
    pub tracked_keys: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;

    use crate::ratelimit::{ManualClock, MemoryHistoryStore, ACTION_CREATE_SCENARIO, ACTION_CREATE_SESSION};

    const START_MS: i64 = 1_700_000_000_000;

    fn policies(max_actions: u32, window: Duration) -> PolicyTable {
        PolicyTable::new()
            .with_policy(
                ACTION_CREATE_SCENARIO,
                RateLimitPolicy::new(max_actions, window).unwrap(),
            )
            .with_policy(
                ACTION_CREATE_SESSION,
                RateLimitPolicy::new(max_actions, window).unwrap(),
            )
    }

    fn limiter(max_actions: u32, window: Duration) -> (Arc<ManualClock>, Arc<MemoryHistoryStore>, RateLimiter) {
        let clock = Arc::new(ManualClock::new(START_MS));
        let store = Arc::new(MemoryHistoryStore::with_clock(clock.clone()));
        let limiter = RateLimiter::new(policies(max_actions, window), store.clone(), clock.clone());
        (clock, store, limiter)
    }

    /// Store that counts calls, optionally failing every one of them.
    #[derive(Default)]
    struct RecordingStore {
        inner: MemoryHistoryStore,
        gets: AtomicUsize,
        sets: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl HistoryStore for RecordingStore {
        fn backend_type(&self) -> HistoryBackendType {
            HistoryBackendType::Memory
        }

        async fn get(&self, key: &str) -> Result<Vec<RateLimitEntry>, StoreError> {
            self.gets.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(StoreError::Unavailable("store offline".to_string()));
            }
            self.inner.get(key).await
        }

        async fn set(
            &self,
            key: &str,
            entries: Vec<RateLimitEntry>,
            retention: Duration,
        ) -> Result<(), StoreError> {
            self.sets.fetch_add(1, Ordering::SeqCst);
            self.inner.set(key, entries, retention).await
        }

        async fn cleanup_expired(&self) -> Result<usize, StoreError> {
            self.inner.cleanup_expired().await
        }

        async fn tracked_keys(&self) -> Result<Option<usize>, StoreError> {
            self.inner.tracked_keys().await
        }
    }

    #[tokio::test]
    async fn test_allows_exactly_max_actions() {
        let (_, _, limiter) = limiter(3, Duration::from_secs(60));
        let request = RateLimitRequest::new("user-1", ACTION_CREATE_SCENARIO);

        for _ in 0..3 {
            let decision = limiter.check_rate_limit(&request).await.unwrap();
            assert_eq!(decision, RateLimitDecision::allowed());
        }

        let decision = limiter.check_rate_limit(&request).await.unwrap();
        assert!(!decision.allowed);
        assert_eq!(decision.reason, Some(RateLimitReason::RateLimitExceeded));
        assert_eq!(decision.message.as_deref(), Some(RATE_LIMIT_EXCEEDED_MESSAGE));
        assert!(!decision.exempt);
    }

    #[tokio::test]
    async fn test_denied_attempts_are_not_recorded() {
        let (_, store, limiter) = limiter(2, Duration::from_secs(60));
        let request = RateLimitRequest::new("user-1", ACTION_CREATE_SCENARIO);

        for _ in 0..5 {
            limiter.check_rate_limit(&request).await.unwrap();
        }

        let history = store.get("user-1:create_scenario").await.unwrap();
        assert_eq!(history.len(), 2);
    }

    #[tokio::test]
    async fn test_window_slides() {
        let (clock, store, limiter) = limiter(2, Duration::from_secs(60));
        let request = RateLimitRequest::new("user-1", ACTION_CREATE_SESSION);

        assert!(limiter.check_rate_limit(&request).await.unwrap().allowed);
        clock.advance(Duration::from_secs(30));
        assert!(limiter.check_rate_limit(&request).await.unwrap().allowed);
        assert!(!limiter.check_rate_limit(&request).await.unwrap().allowed);

        // First entry leaves the window exactly 60s after it was recorded
        clock.advance(Duration::from_secs(30));
        assert!(limiter.check_rate_limit(&request).await.unwrap().allowed);

        let history = store.get("user-1:create_session").await.unwrap();
        assert_eq!(history.len(), 2);
        assert!(history.iter().all(|e| e.timestamp > START_MS));
    }

    #[tokio::test]
    async fn test_denial_prunes_expired_entries() {
        let (clock, store, limiter) = limiter(1, Duration::from_secs(10));
        let key = "user-1:create_scenario";
        store
            .set(
                key,
                vec![
                    RateLimitEntry::new(ACTION_CREATE_SCENARIO, START_MS - 60_000),
                    RateLimitEntry::new(ACTION_CREATE_SCENARIO, START_MS),
                ],
                Duration::from_secs(10),
            )
            .await
            .unwrap();

        clock.advance(Duration::from_secs(1));
        let request = RateLimitRequest::new("user-1", ACTION_CREATE_SCENARIO);
        assert!(!limiter.check_rate_limit(&request).await.unwrap().allowed);

        let history = store.get(key).await.unwrap();
        assert_eq!(history, vec![RateLimitEntry::new(ACTION_CREATE_SCENARIO, START_MS)]);
    }

    #[tokio::test]
    async fn test_moderator_is_exempt_without_touching_store() {
        let clock = Arc::new(ManualClock::new(START_MS));
        let store = Arc::new(RecordingStore::default());
        let limiter = RateLimiter::new(policies(1, Duration::from_secs(60)), store.clone(), clock);

        let request =
            RateLimitRequest::new("mod-1", ACTION_CREATE_SCENARIO).with_role(Some(EXEMPT_ROLE));
        for _ in 0..10 {
            let decision = limiter.check_rate_limit(&request).await.unwrap();
            assert_eq!(decision, RateLimitDecision::exempt());
        }

        assert_eq!(store.gets.load(Ordering::SeqCst), 0);
        assert_eq!(store.sets.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_moderator_exempt_after_exhausting_limit() {
        let (_, _, limiter) = limiter(1, Duration::from_secs(60));
        let user = RateLimitRequest::new("user-1", ACTION_CREATE_SCENARIO);

        assert!(limiter.check_rate_limit(&user).await.unwrap().allowed);
        assert!(!limiter.check_rate_limit(&user).await.unwrap().allowed);

        let promoted = user.with_role(Some(EXEMPT_ROLE));
        let decision = limiter.check_rate_limit(&promoted).await.unwrap();
        assert!(decision.allowed);
        assert!(decision.exempt);
    }

    #[tokio::test]
    async fn test_other_roles_are_limited() {
        let (_, _, limiter) = limiter(1, Duration::from_secs(60));
        let request = RateLimitRequest::new("user-1", ACTION_CREATE_SCENARIO).with_role(Some("moderator"));

        assert!(limiter.check_rate_limit(&request).await.unwrap().allowed);
        assert!(!limiter.check_rate_limit(&request).await.unwrap().allowed);
    }

    #[tokio::test]
    async fn test_unknown_action_is_unlimited() {
        let clock = Arc::new(ManualClock::new(START_MS));
        let store = Arc::new(RecordingStore::default());
        let limiter = RateLimiter::new(policies(1, Duration::from_secs(60)), store.clone(), clock);

        let request = RateLimitRequest::new("user-1", "update_profile");
        for _ in 0..20 {
            assert_eq!(
                limiter.check_rate_limit(&request).await.unwrap(),
                RateLimitDecision::allowed()
            );
        }
        assert_eq!(store.gets.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_actions_and_users_are_independent() {
        let (_, _, limiter) = limiter(1, Duration::from_secs(60));

        let scenario = RateLimitRequest::new("user-a", ACTION_CREATE_SCENARIO);
        assert!(limiter.check_rate_limit(&scenario).await.unwrap().allowed);
        assert!(!limiter.check_rate_limit(&scenario).await.unwrap().allowed);

        let session = RateLimitRequest::new("user-a", ACTION_CREATE_SESSION);
        assert!(limiter.check_rate_limit(&session).await.unwrap().allowed);

        let other_user = RateLimitRequest::new("user-b", ACTION_CREATE_SCENARIO);
        assert!(limiter.check_rate_limit(&other_user).await.unwrap().allowed);
    }

    #[tokio::test]
    async fn test_empty_user_id_is_rejected() {
        let (_, _, limiter) = limiter(1, Duration::from_secs(60));
        let request = RateLimitRequest::new("", ACTION_CREATE_SCENARIO);

        assert!(matches!(
            limiter.check_rate_limit(&request).await,
            Err(RateLimitError::EmptyUserId)
        ));
    }

    #[tokio::test]
    async fn test_store_failure_is_returned() {
        let clock = Arc::new(ManualClock::new(START_MS));
        let store = Arc::new(RecordingStore {
            fail: true,
            ..Default::default()
        });
        let limiter = RateLimiter::new(policies(1, Duration::from_secs(60)), store.clone(), clock);

        let request = RateLimitRequest::new("user-1", ACTION_CREATE_SCENARIO);
        let result = limiter.check_rate_limit(&request).await;

        assert!(matches!(result, Err(RateLimitError::Store(StoreError::Unavailable(_)))));
        assert_eq!(store.sets.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_disabled_limiter_allows_everything() {
        let clock = Arc::new(ManualClock::new(START_MS));
        let store = Arc::new(RecordingStore::default());
        let config = RateLimitConfig {
            enabled: false,
            ..Default::default()
        };
        let limiter = RateLimiter::from_config(&config, store.clone(), clock).unwrap();
        assert!(!limiter.is_enabled());

        let request = RateLimitRequest::new("user-1", ACTION_CREATE_SCENARIO);
        for _ in 0..20 {
            assert!(limiter.check_rate_limit(&request).await.unwrap().allowed);
        }
        assert_eq!(store.gets.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_concurrent_checks_respect_ceiling() {
        let (_, _, limiter) = limiter(5, Duration::from_secs(60));
        let limiter = Arc::new(limiter);

        let handles: Vec<_> = (0..20)
            .map(|_| {
                let limiter = limiter.clone();
                tokio::spawn(async move {
                    let request = RateLimitRequest::new("user-1", ACTION_CREATE_SCENARIO);
                    limiter.check_rate_limit(&request).await.unwrap().allowed
                })
            })
            .collect();

        let mut allowed = 0;
        for handle in handles {
            if handle.await.unwrap() {
                allowed += 1;
            }
        }
        assert_eq!(allowed, 5);
    }

    #[tokio::test]
    async fn test_cleanup_expired_drops_histories_and_locks() {
        let (clock, store, limiter) = limiter(3, Duration::from_secs(60));

        for user in ["u1", "u2"] {
            let request = RateLimitRequest::new(user, ACTION_CREATE_SCENARIO);
            limiter.check_rate_limit(&request).await.unwrap();
        }
        assert_eq!(limiter.key_locks.len(), 2);

        clock.advance(Duration::from_secs(61));
        assert_eq!(limiter.cleanup_expired().await.unwrap(), 2);
        assert_eq!(store.tracked_keys().await.unwrap(), Some(0));
        assert!(limiter.key_locks.is_empty());
    }

    #[tokio::test]
    async fn test_stats() {
        let (_, _, limiter) = limiter(3, Duration::from_secs(60));
        limiter
            .check_rate_limit(&RateLimitRequest::new("u1", ACTION_CREATE_SESSION))
            .await
            .unwrap();

        let stats = limiter.stats().await;
        assert!(stats.enabled);
        assert_eq!(stats.backend, HistoryBackendType::Memory);
        assert_eq!(
            stats.limited_actions,
            vec![ACTION_CREATE_SCENARIO.to_string(), ACTION_CREATE_SESSION.to_string()]
        );

        let json = serde_json::to_string(&stats).unwrap();
        assert!(!json.contains("max_actions"));
        assert!(!json.contains("window_ms"));
        assert_eq!(stats.tracked_keys, Some(1));
    }

    #[test]
    fn test_decision_json_shape() {
        let allowed = serde_json::to_value(RateLimitDecision::allowed()).unwrap();
        assert_eq!(allowed, serde_json::json!({"allowed": true}));

        let exempt = serde_json::to_value(RateLimitDecision::exempt()).unwrap();
        assert_eq!(
            exempt,
            serde_json::json!({"allowed": true, "exempt": true, "reason": "MODERATOR_EXEMPT"})
        );

        let exceeded = serde_json::to_value(RateLimitDecision::exceeded()).unwrap();
        assert_eq!(exceeded["allowed"], false);
        assert_eq!(exceeded["reason"], "RATE_LIMIT_EXCEEDED");
        assert!(exceeded.get("exempt").is_none());
    }
}
