use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::server::{require_auth, AppState};

use super::health::{health, stats};
use super::metrics::prometheus_metrics;
use super::ratelimit::check_rate_limit;
use super::roster::{slot_warning, slot_warnings};

pub fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        // Health, stats & metrics
        .route("/health", get(health))
        .route("/stats", get(stats))
        .route("/metrics", get(prometheus_metrics))
        .nest(
            "/api/v1",
            Router::new()
                // Authenticated: the caller's identity is the rate limit subject
                .route("/rate-limit/check", post(check_rate_limit))
                .route_layer(middleware::from_fn_with_state(state, require_auth))
                // Roster rendering
                .route("/roster/slot-warning", post(slot_warning))
                .route("/roster/slot-warnings", post(slot_warnings)),
        )
}
