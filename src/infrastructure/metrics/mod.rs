//! Prometheus metrics for the policy service.
//!
//! - Rate limit decisions by action and outcome
//! - History store failures
//! - Tracked history keys
//! - Roster slot warnings

mod helpers;

pub use helpers::{encode_metrics, RateLimitMetrics, RosterMetrics};

use lazy_static::lazy_static;
use prometheus::{
    register_int_counter_vec, register_int_gauge, IntCounterVec, IntGauge,
};

/// Prefix for all metrics
const METRIC_PREFIX: &str = "trpg";

lazy_static! {
    // ============================================================================
    // Rate Limit Metrics
    // ============================================================================

    /// Rate limit decisions by action and outcome (allowed, denied, exempt)
    pub static ref RATELIMIT_DECISIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_ratelimit_decisions_total", METRIC_PREFIX),
        "Total rate limit decisions",
        &["action", "outcome"]
    ).unwrap();

    /// History store failures by backend
    pub static ref RATELIMIT_STORE_ERRORS_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_ratelimit_store_errors_total", METRIC_PREFIX),
        "Total rate limit history store failures",
        &["backend"]
    ).unwrap();

    /// Histories currently held by the store (memory backend only)
    pub static ref RATELIMIT_TRACKED_KEYS: IntGauge = register_int_gauge!(
        format!("{}_ratelimit_tracked_keys", METRIC_PREFIX),
        "Number of rate limit histories currently stored"
    ).unwrap();

    // ============================================================================
    // Roster Metrics
    // ============================================================================

    /// Slot warning evaluations, labelled by whether a warning was produced
    pub static ref SLOT_WARNINGS_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_slot_warnings_total", METRIC_PREFIX),
        "Total roster slot warning evaluations",
        &["warned"]
    ).unwrap();
}
