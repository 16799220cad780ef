//! State module for tracking batch progress
//!
//! # Components
//!
//! - `TargetState`: lifecycle of one target (pending, navigating, extracting, completed, blocked, ...)
//! - `OriginState`: per-origin bookkeeping for rate limiting and block backoff

mod origin_state;
mod target_state;

pub use origin_state::OriginState;
pub use target_state::TargetState;
