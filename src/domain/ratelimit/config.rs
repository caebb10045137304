//! Rate limiting configuration

use std::collections::HashMap;
use std::time::Duration;

use serde::Deserialize;

use super::limiter::RateLimitError;
use super::policy::{PolicyTable, RateLimitPolicy};

/// Configuration for rate limiting
#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    /// Whether rate limiting is enabled
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Backend type: "memory" or "redis" (default: "memory")
    #[serde(default = "default_backend")]
    pub backend: String,
    /// Redis key prefix for history keys
    #[serde(default = "default_redis_prefix")]
    pub redis_prefix: String,
    /// Interval of the expired-history sweep in seconds
    #[serde(default = "default_cleanup_interval")]
    pub cleanup_interval_seconds: u64,
    /// Policies keyed by action identifier
    #[serde(default = "default_policies")]
    pub policies: HashMap<String, PolicyConfig>,
}

/// One action's policy as written in configuration
#[derive(Debug, Clone, Deserialize)]
pub struct PolicyConfig {
    /// Allowed actions per window
    pub max_actions: u32,
    /// Window length in seconds
    pub window_seconds: u64,
}

fn default_enabled() -> bool {
    true
}

fn default_backend() -> String {
    "memory".to_string()
}

fn default_redis_prefix() -> String {
    "trpg:ratelimit".to_string()
}

fn default_cleanup_interval() -> u64 {
    300 // Sweep every 5 minutes
}

fn default_policies() -> HashMap<String, PolicyConfig> {
    PolicyTable::standard()
        .iter()
        .map(|(action, policy)| {
            (
                action.to_string(),
                PolicyConfig {
                    max_actions: policy.max_actions(),
                    window_seconds: policy.window().as_secs(),
                },
            )
        })
        .collect()
}

impl RateLimitConfig {
    /// Validate the configured policies into a lookup table.
    pub fn policy_table(&self) -> Result<PolicyTable, RateLimitError> {
        self.policies
            .iter()
            .try_fold(PolicyTable::new(), |table, (action, policy)| {
                let policy = RateLimitPolicy::new(
                    policy.max_actions,
                    Duration::from_secs(policy.window_seconds),
                )?;
                Ok(table.with_policy(action.clone(), policy))
            })
    }

    /// Period of the expired-history sweep. Zero falls back to the default.
    pub fn cleanup_interval(&self) -> Duration {
        if self.cleanup_interval_seconds == 0 {
            tracing::warn!(
                default_secs = default_cleanup_interval(),
                "ratelimit.cleanup_interval_seconds is 0, using default"
            );
            return Duration::from_secs(default_cleanup_interval());
        }
        Duration::from_secs(self.cleanup_interval_seconds)
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            backend: default_backend(),
            redis_prefix: default_redis_prefix(),
            cleanup_interval_seconds: default_cleanup_interval(),
            policies: default_policies(),
        }
    }
}
