//! Static per-action rate limit policies.

use std::collections::HashMap;
use std::time::Duration;

use serde::Serialize;

use super::limiter::RateLimitError;

/// Action identifier for scenario creation
pub const ACTION_CREATE_SCENARIO: &str = "create_scenario";

/// Action identifier for session creation
pub const ACTION_CREATE_SESSION: &str = "create_session";

/// Label used in metrics for actions without a policy
const UNLIMITED_ACTION_LABEL: &str = "other";

/// Ceiling of actions allowed within a sliding window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RateLimitPolicy {
    max_actions: u32,
    window_ms: u64,
}

impl RateLimitPolicy {
    /// Create a policy, rejecting a zero ceiling or an empty window.
    pub fn new(max_actions: u32, window: Duration) -> Result<Self, RateLimitError> {
        let window_ms = u64::try_from(window.as_millis()).unwrap_or(u64::MAX);

        if max_actions == 0 || window_ms == 0 {
            return Err(RateLimitError::InvalidPolicy {
                max_actions,
                window_ms,
            });
        }

        Ok(Self {
            max_actions,
            window_ms,
        })
    }

    pub fn max_actions(&self) -> u32 {
        self.max_actions
    }

    pub fn window_ms(&self) -> u64 {
        self.window_ms
    }

    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }

    /// Whether an action taken at `timestamp` still counts at `now`.
    ///
    /// Timestamps ahead of `now` (clock skew between instances) count.
    pub fn is_active(&self, timestamp: i64, now: i64) -> bool {
        let window = i64::try_from(self.window_ms).unwrap_or(i64::MAX);
        now.saturating_sub(timestamp) < window
    }
}

/// Immutable mapping from action identifier to its policy.
///
/// Actions missing from the table are unlimited.
#[derive(Debug, Clone, Default)]
pub struct PolicyTable {
    policies: HashMap<String, RateLimitPolicy>,
}

impl PolicyTable {
    /// Create an empty table (every action unlimited).
    pub fn new() -> Self {
        Self::default()
    }

    /// Table with the platform's standard policies:
    /// 5 scenarios and 10 sessions per user per hour.
    pub fn standard() -> Self {
        let hour = Duration::from_secs(3600);
        Self::new()
            .with_policy(
                ACTION_CREATE_SCENARIO,
                RateLimitPolicy {
                    max_actions: 5,
                    window_ms: hour.as_millis() as u64,
                },
            )
            .with_policy(
                ACTION_CREATE_SESSION,
                RateLimitPolicy {
                    max_actions: 10,
                    window_ms: hour.as_millis() as u64,
                },
            )
    }

    pub fn with_policy(mut self, action: impl Into<String>, policy: RateLimitPolicy) -> Self {
        self.policies.insert(action.into(), policy);
        self
    }

    pub fn get(&self, action: &str) -> Option<RateLimitPolicy> {
        self.policies.get(action).copied()
    }

    pub fn len(&self) -> usize {
        self.policies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &RateLimitPolicy)> {
        self.policies.iter().map(|(action, policy)| (action.as_str(), policy))
    }

    /// Metric label for an action, bounded to the configured actions.
    pub(crate) fn metric_label<'a>(&'a self, action: &str) -> &'a str {
        self.policies
            .get_key_value(action)
            .map(|(key, _)| key.as_str())
            .unwrap_or(UNLIMITED_ACTION_LABEL)
    }
}
