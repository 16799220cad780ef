//! Per-origin rate limiting
//!
//! This module handles:
//! - Minimum interval between navigations to the same origin
//! - Per-origin navigation caps
//! - Exponential backoff after block signals
//!
//! Global page concurrency is bounded separately by the coordinator's
//! semaphore; the limiter is shared between page tasks through an `Arc`.

use crate::config::RateLimitConfig;
use crate::state::OriginState;
use crate::ScrapeError;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Shared rate limiter keyed by origin
pub struct RateLimiter {
    config: RateLimitConfig,
    origins: Mutex<HashMap<String, OriginState>>,
}

impl RateLimiter {
    /// Creates a new rate limiter
    ///
    /// # Arguments
    ///
    /// * `config` - Interval, cap and backoff settings
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            origins: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Waits until a navigation to `origin` is allowed and records it
    ///
    /// Each wait is bounded by the origin's interval or cooldown.
    ///
    /// # Returns
    ///
    /// * `Ok(())` - The navigation may proceed
    /// * `Err(ScrapeError::RateLimited)` - The origin's cap is exhausted
    pub async fn acquire(&self, origin: &str) -> Result<(), ScrapeError> {
        loop {
            let wait = {
                let mut origins = self.origins.lock().await;
                let state = origins.entry(origin.to_string()).or_default();

                if state.has_exceeded_limit(&self.config) {
                    tracing::warn!(origin, requests = state.request_count, "Origin request cap reached");
                    return Err(ScrapeError::RateLimited {
                        origin: origin.to_string(),
                    });
                }

                let now = Instant::now();
                match state.time_until_next_request(&self.config, now) {
                    None => {
                        state.record_request(now);
                        tracing::trace!(origin, requests = state.request_count, "Navigation slot granted");
                        return Ok(());
                    }
                    Some(wait) => wait,
                }
            };

            tracing::debug!(origin, wait_ms = wait.as_millis() as u64, "Waiting for origin");
            tokio::time::sleep(wait).await;
        }
    }

    /// Records a block signal and starts the origin's cooldown
    ///
    /// # Returns
    ///
    /// The cooldown applied
    pub async fn report_block(&self, origin: &str) -> Duration {
        let mut origins = self.origins.lock().await;
        let state = origins.entry(origin.to_string()).or_default();
        let backoff = state.mark_blocked(&self.config, Instant::now());
        tracing::warn!(
            origin,
            consecutive = state.consecutive_blocks,
            backoff_ms = backoff.as_millis() as u64,
            "Block signal, backing off"
        );
        backoff
    }

    /// Clears block bookkeeping after a successful extraction
    pub async fn report_success(&self, origin: &str) {
        let mut origins = self.origins.lock().await;
        if let Some(state) = origins.get_mut(origin) {
            state.clear_block();
        }
    }

    /// Returns a copy of an origin's state
    pub async fn origin_state(&self, origin: &str) -> Option<OriginState> {
        self.origins.lock().await.get(origin).cloned()
    }
}
