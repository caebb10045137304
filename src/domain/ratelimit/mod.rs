//! Per-user, per-action rate limiting for scenario and session creation.
//!
//! The limiter counts a user's recent actions inside a sliding window and
//! rejects the action once the configured ceiling is reached. Moderators are
//! exempt. Action history lives behind the [`HistoryStore`] port so that a
//! single instance can keep it in memory while a multi-instance deployment
//! shares it through Redis.

mod clock;
mod config;
mod factory;
mod limiter;
mod memory_store;
mod policy;
mod redis_store;
mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{PolicyConfig, RateLimitConfig};
pub use factory::create_history_store;
pub use limiter::{
    RateLimitDecision, RateLimitError, RateLimitReason, RateLimitRequest, RateLimiter,
    RateLimiterStats, EXEMPT_ROLE,
};
pub use memory_store::MemoryHistoryStore;
pub use policy::{PolicyTable, RateLimitPolicy, ACTION_CREATE_SCENARIO, ACTION_CREATE_SESSION};
pub use redis_store::RedisHistoryStore;
pub use store::{history_key, HistoryBackendType, HistoryStore, RateLimitEntry, StoreError};
