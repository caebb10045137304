use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::ratelimit::RateLimitError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Rate limiter unavailable: {0}")]
    RateLimitUnavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Redis error: {0}")]
    Redis(#[from] crate::redis::PoolError),
}

impl From<RateLimitError> for AppError {
    fn from(err: RateLimitError) -> Self {
        match err {
            RateLimitError::EmptyUserId => AppError::Validation(err.to_string()),
            RateLimitError::InvalidPolicy { .. } => AppError::Internal(err.to_string()),
            RateLimitError::Store(e) => AppError::RateLimitUnavailable(e.to_string()),
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Serialize)]
struct ErrorBody {
    code: String,
    message: String,
}

/// Check if running in production mode (based on RUN_MODE env var)
fn is_production() -> bool {
    std::env::var("RUN_MODE")
        .map(|m| m == "production" || m == "prod")
        .unwrap_or(false)
}

/// Hide internal details from clients in production.
fn redact(log_msg: &str, public_msg: &str) -> String {
    if is_production() {
        public_msg.to_string()
    } else {
        log_msg.to_string()
    }
}

impl AppError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "CONFIG_ERROR"),
            AppError::Auth(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            AppError::RateLimitUnavailable(_) => {
                (StatusCode::SERVICE_UNAVAILABLE, "RATE_LIMIT_UNAVAILABLE")
            }
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
            AppError::Redis(_) => (StatusCode::INTERNAL_SERVER_ERROR, "REDIS_ERROR"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        let (client_message, log_message) = match &self {
            AppError::Config(e) => (redact(&e.to_string(), "Configuration error"), e.to_string()),
            AppError::Auth(msg) | AppError::Validation(msg) => (msg.clone(), msg.clone()),
            AppError::RateLimitUnavailable(msg) => (
                redact(msg, "Rate limiter temporarily unavailable"),
                msg.clone(),
            ),
            AppError::Internal(msg) => (redact(msg, "Internal server error"), msg.clone()),
            AppError::Redis(e) => (
                redact(&e.to_string(), "Service temporarily unavailable"),
                e.to_string(),
            ),
        };

        // Always log the detailed error server-side
        tracing::error!(
            code = %code,
            status = %status.as_u16(),
            message = %log_message,
            "API error"
        );

        let body = ErrorResponse {
            error: ErrorBody {
                code: code.to_string(),
                message: client_message,
            },
        };

        (status, Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ratelimit::StoreError;

    #[test]
    fn test_rate_limit_error_mapping() {
        let err: AppError = RateLimitError::EmptyUserId.into();
        assert_eq!(err.status_and_code().0, StatusCode::BAD_REQUEST);

        let err: AppError =
            RateLimitError::Store(StoreError::Unavailable("down".to_string())).into();
        assert_eq!(
            err.status_and_code(),
            (StatusCode::SERVICE_UNAVAILABLE, "RATE_LIMIT_UNAVAILABLE")
        );

        let err: AppError = RateLimitError::InvalidPolicy {
            max_actions: 0,
            window_ms: 1,
        }
        .into();
        assert_eq!(err.status_and_code().1, "INTERNAL_ERROR");
    }

    #[test]
    fn test_auth_error_response_status() {
        let response = AppError::Auth("Missing bearer token".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
