//! API layer - HTTP endpoint handlers organized by domain.

mod health;
mod metrics;
mod ratelimit;
mod roster;
mod routes;

// Re-export all handlers for use in server/app.rs
pub use health::{health, stats, HealthResponse, StatsResponse};
pub use metrics::prometheus_metrics;
pub use ratelimit::{check_rate_limit, RateLimitCheckRequest};
pub use roster::{
    slot_warning, slot_warnings, SlotWarningResponse, SlotWarningsRequest, SlotWarningsResponse,
};
pub use routes::api_routes;
