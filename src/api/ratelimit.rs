//! Rate limit check endpoint used by scenario and session form handlers.

use axum::{extract::State, Extension, Json};
use serde::Deserialize;

use crate::auth::Claims;
use crate::error::{AppError, Result};
use crate::ratelimit::{RateLimitDecision, RateLimitRequest};
use crate::server::AppState;
use crate::telemetry::attributes;

#[derive(Debug, Deserialize)]
pub struct RateLimitCheckRequest {
    /// Action about to be performed, e.g. `create_scenario`
    pub action: String,
}

/// POST /api/v1/rate-limit/check - Check and record an action for the caller
///
/// A rejected action is a normal `200` response with `allowed: false`.
#[tracing::instrument(
    name = "http.check_rate_limit",
    skip_all,
    fields(user_id = %claims.user_id(), action = %body.action)
)]
pub async fn check_rate_limit(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(body): Json<RateLimitCheckRequest>,
) -> Result<Json<RateLimitDecision>> {
    let action = body.action.trim();
    if action.is_empty() {
        return Err(AppError::Validation("action must not be empty".to_string()));
    }

    let request = RateLimitRequest::new(claims.user_id(), action).with_role(claims.role());
    let decision = state.rate_limiter.check_rate_limit(&request).await?;

    let span = tracing::Span::current();
    attributes::record(&span, attributes::allowed(decision.allowed));
    attributes::record(
        &span,
        attributes::backend(state.rate_limiter.backend_type().as_str()),
    );

    Ok(Json(decision))
}
