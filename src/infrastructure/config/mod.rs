mod settings;

pub use settings::{JwtConfig, OtelConfig, RateLimitConfig, RedisConfig, ServerConfig, Settings};
