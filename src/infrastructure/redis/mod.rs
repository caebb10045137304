//! Redis access for the shared rate limit history.
//!
//! - `pool`: lazily connected multiplexed connection with reconnect on drop

pub mod pool;

pub use pool::{PoolError, RedisPool};
