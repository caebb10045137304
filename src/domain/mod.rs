//! Domain layer modules
//!
//! This module contains the platform's policy logic:
//! - `ratelimit`: Per-user sliding window limits on scenario and session creation
//! - `roster`: Remaining-slot warnings for session rosters
//! - `messages`: User-facing message catalog

pub mod messages;
pub mod ratelimit;
pub mod roster;
