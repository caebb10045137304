use std::sync::Arc;

use crate::auth::JwtValidator;
use crate::config::Settings;
use crate::error::AppError;
use crate::ratelimit::{create_history_store, Clock, RateLimiter, SystemClock};
use crate::redis::RedisPool;

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub jwt_validator: Arc<JwtValidator>,
    pub rate_limiter: Arc<RateLimiter>,
    /// Present only when the Redis history backend is configured
    pub redis_pool: Option<Arc<RedisPool>>,
}

impl AppState {
    pub fn new(settings: Settings) -> Result<Self, AppError> {
        Self::with_clock(settings, Arc::new(SystemClock::new()))
    }

    /// Build the state with an explicit time source for the rate limiter.
    pub fn with_clock(settings: Settings, clock: Arc<dyn Clock>) -> Result<Self, AppError> {
        let jwt_validator = Arc::new(JwtValidator::new(&settings.jwt));

        let redis_pool = if settings.ratelimit.backend == "redis" {
            Some(Arc::new(RedisPool::new(settings.redis.clone())?))
        } else {
            None
        };

        let store = create_history_store(&settings.ratelimit, redis_pool.clone(), clock.clone());
        let rate_limiter = Arc::new(RateLimiter::from_config(&settings.ratelimit, store, clock)?);

        Ok(Self {
            settings: Arc::new(settings),
            jwt_validator,
            rate_limiter,
            redis_pool,
        })
    }
}
