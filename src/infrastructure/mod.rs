//! Infrastructure layer modules
//!
//! This module contains shared infrastructure components:
//! - `auth`: JWT authentication and validation
//! - `config`: Application configuration and settings
//! - `error`: Unified error types
//! - `metrics`: Prometheus metrics helpers
//! - `redis`: Redis connection pool for the shared history store

pub mod auth;
pub mod config;
pub mod error;
pub mod metrics;
pub mod redis;
