//! Metrics helper structs for convenient metric recording

use prometheus::{Encoder, TextEncoder};

use super::{
    RATELIMIT_DECISIONS_TOTAL, RATELIMIT_STORE_ERRORS_TOTAL, RATELIMIT_TRACKED_KEYS,
    SLOT_WARNINGS_TOTAL,
};

/// Encode all metrics to Prometheus text format
pub fn encode_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer).unwrap_or_default())
}

/// Helper struct for recording rate limit metrics
pub struct RateLimitMetrics;

impl RateLimitMetrics {
    /// Record an allowed action
    pub fn record_allowed(action: &str) {
        RATELIMIT_DECISIONS_TOTAL
            .with_label_values(&[action, "allowed"])
            .inc();
    }

    /// Record an action rejected for exceeding its limit
    pub fn record_denied(action: &str) {
        RATELIMIT_DECISIONS_TOTAL
            .with_label_values(&[action, "denied"])
            .inc();
    }

    /// Record an action that skipped the limiter due to the exempt role
    pub fn record_exempt(action: &str) {
        RATELIMIT_DECISIONS_TOTAL
            .with_label_values(&[action, "exempt"])
            .inc();
    }

    pub fn record_store_error(backend: &str) {
        RATELIMIT_STORE_ERRORS_TOTAL
            .with_label_values(&[backend])
            .inc();
    }

    pub fn set_tracked_keys(count: usize) {
        RATELIMIT_TRACKED_KEYS.set(count as i64);
    }
}

/// Helper struct for recording roster metrics
pub struct RosterMetrics;

impl RosterMetrics {
    /// Record one slot warning evaluation
    pub fn record_evaluation(warned: bool) {
        let label = if warned { "true" } else { "false" };
        SLOT_WARNINGS_TOTAL.with_label_values(&[label]).inc();
    }
}
