use crate::config::RateLimitConfig;
use std::time::{Duration, Instant};

/// Longest backoff applied after repeated blocks
const MAX_BACKOFF_SHIFT: u32 = 6;

/// Tracks the state of one origin (e.g. `instagram.com`) during a batch
///
/// Holds what the rate limiter needs: how many navigations were made, when the
/// last one happened, and whether the origin is cooling down after a block.
#[derive(Debug, Clone, Default)]
pub struct OriginState {
    /// Number of navigations made to this origin in the current batch
    pub request_count: u32,

    /// Timestamp of the last navigation to this origin
    pub last_request_time: Option<Instant>,

    /// No navigation is allowed before this instant
    pub blocked_until: Option<Instant>,

    /// Blocks reported since the last successful extraction
    pub consecutive_blocks: u32,
}

impl OriginState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Checks if a navigation can be made now
    ///
    /// # Arguments
    ///
    /// * `config` - Rate limit settings
    /// * `now` - The current time instant
    pub fn can_request(&self, config: &RateLimitConfig, now: Instant) -> bool {
        !self.has_exceeded_limit(config) && self.time_until_next_request(config, now).is_none()
    }

    /// Records that a navigation was made
    pub fn record_request(&mut self, now: Instant) {
        self.request_count += 1;
        self.last_request_time = Some(now);
    }

    /// Starts a cooldown after a block signal
    ///
    /// The backoff doubles with each consecutive block.
    ///
    /// # Returns
    ///
    /// The cooldown applied
    pub fn mark_blocked(&mut self, config: &RateLimitConfig, now: Instant) -> Duration {
        let shift = self.consecutive_blocks.min(MAX_BACKOFF_SHIFT);
        let backoff = Duration::from_millis(config.block_backoff.saturating_mul(1 << shift));
        self.consecutive_blocks += 1;
        self.blocked_until = Some(now + backoff);
        backoff
    }

    /// Resets block bookkeeping after a successful extraction
    pub fn clear_block(&mut self) {
        self.consecutive_blocks = 0;
        self.blocked_until = None;
    }

    pub fn is_cooling_down(&self, now: Instant) -> bool {
        self.blocked_until.is_some_and(|until| now < until)
    }

    pub fn has_exceeded_limit(&self, config: &RateLimitConfig) -> bool {
        self.request_count >= config.max_requests_per_origin
    }

    /// Calculates the time until the next navigation can be made
    ///
    /// Returns None if a navigation can be made now. Both the minimum interval
    /// and any block cooldown are honored.
    pub fn time_until_next_request(
        &self,
        config: &RateLimitConfig,
        now: Instant,
    ) -> Option<Duration> {
        let interval_wait = self.last_request_time.and_then(|last| {
            let min_delay = Duration::from_millis(config.minimum_interval);
            min_delay.checked_sub(now.duration_since(last))
        });
        let block_wait = self
            .blocked_until
            .and_then(|until| until.checked_duration_since(now));

        match (interval_wait, block_wait) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        }
        .filter(|wait| !wait.is_zero())
    }
}
