use axum::{extract::State, Json};
use serde::Serialize;

use crate::ratelimit::RateLimiterStats;
use crate::server::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub backend: String,
    /// Redis reachability, when the Redis backend is in use
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redis: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub rate_limiter: RateLimiterStats,
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let redis = match &state.redis_pool {
        Some(pool) => match pool.ping().await {
            Ok(()) => Some("connected".to_string()),
            Err(e) => {
                tracing::warn!(error = %e, "Redis health check failed");
                Some("unreachable".to_string())
            }
        },
        None => None,
    };

    let status = match redis.as_deref() {
        Some("unreachable") => "degraded",
        _ => "healthy",
    };

    Json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        backend: state.rate_limiter.backend_type().as_str().to_string(),
        redis,
    })
}

pub async fn stats(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse {
        rate_limiter: state.rate_limiter.stats().await,
    })
}
