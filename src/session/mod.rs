//! Session and batch orchestration
//!
//! This module contains:
//! - `gate`: authentication checks after navigation
//! - `scheduler`: per-origin rate limiting and block backoff
//! - `fetcher`: the public profile endpoint used in guest mode
//! - `report`: the per-target result
//! - `coordinator`: runs a batch of targets concurrently

mod coordinator;
mod fetcher;
mod gate;
mod report;
mod scheduler;

pub use coordinator::Coordinator;
pub use fetcher::{build_http_client, fetch_public_profile, PublicProfile};
pub use gate::{AuthError, CheckpointGate, GuestGate, SessionGate};
pub use report::{DataSource, ScrapeReport};
pub use scheduler::RateLimiter;
