//! Scroll pagination
//!
//! [`ScrollPaginator`] pushes a lazy-loading container until a growth
//! signature stops changing. Each attempt is one scroll action followed by a
//! settle delay and a fresh reading:
//!
//! ```text
//! Scanning -> Stable(1) -> ... -> Stable(n-1) -> Converged
//!     \______________________________________/-> Exhausted
//! ```
//!
//! A changed reading drops back to `Scanning`. Running out of attempts, or a
//! failed reading, ends in `Exhausted` with `converged = false`.

mod signature;

pub use signature::{ScrollAction, Signature};

use crate::browser::{Browser, Scope};
use crate::config::EngineConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// Limits for one pagination run
#[derive(Debug, Clone)]
pub struct PaginationConfig {
    pub max_attempts: u32,
    /// Consecutive unchanged readings needed to converge
    pub stability_threshold: u32,
    pub inter_attempt_delay: Duration,
}

impl From<&EngineConfig> for PaginationConfig {
    fn from(engine: &EngineConfig) -> Self {
        Self {
            max_attempts: engine.max_scroll_attempts,
            stability_threshold: engine.stability_threshold,
            inter_attempt_delay: Duration::from_millis(engine.inter_attempt_delay),
        }
    }
}

/// Where a pagination run stands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PaginationPhase {
    Scanning,
    Stable(u32),
    Converged,
    Exhausted,
}

impl PaginationPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Converged | Self::Exhausted)
    }
}

/// Bookkeeping for a single run
#[derive(Debug, Clone, Default)]
pub struct PaginationState {
    pub last_signature: Option<u64>,
    pub stable_iterations: u32,
    pub attempts: u32,
    failed: bool,
}

impl PaginationState {
    /// Starts from an initial reading
    pub fn new(initial: u64) -> Self {
        Self {
            last_signature: Some(initial),
            ..Self::default()
        }
    }

    /// State of a run whose first reading failed
    fn failed() -> Self {
        Self {
            failed: true,
            ..Self::default()
        }
    }

    /// Records the reading taken after one scroll attempt
    pub fn observe(&mut self, reading: u64) {
        self.attempts += 1;
        if self.last_signature == Some(reading) {
            self.stable_iterations += 1;
        } else {
            self.stable_iterations = 0;
            self.last_signature = Some(reading);
        }
    }

    fn fail(&mut self) {
        self.failed = true;
    }

    pub fn phase(&self, config: &PaginationConfig) -> PaginationPhase {
        if !self.failed && self.stable_iterations >= config.stability_threshold {
            PaginationPhase::Converged
        } else if self.failed || self.attempts >= config.max_attempts {
            PaginationPhase::Exhausted
        } else if self.stable_iterations > 0 {
            PaginationPhase::Stable(self.stable_iterations)
        } else {
            PaginationPhase::Scanning
        }
    }
}

/// Result of a pagination run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationOutcome {
    pub converged: bool,
    pub attempts: u32,
    pub phase: PaginationPhase,
    pub last_signature: Option<u64>,
}

/// Drives a scrollable region until its signature stops changing
#[derive(Debug, Clone)]
pub struct ScrollPaginator {
    config: PaginationConfig,
    signature: Signature,
    action: ScrollAction,
    target: String,
}

impl ScrollPaginator {
    pub fn new(config: PaginationConfig, signature: Signature, action: ScrollAction) -> Self {
        Self {
            config,
            signature,
            action,
            target: String::new(),
        }
    }

    /// Label used in log events
    pub fn with_target(mut self, target: &str) -> Self {
        self.target = target.to_string();
        self
    }

    pub fn config(&self) -> &PaginationConfig {
        &self.config
    }

    /// Scrolls `scrollable` until it converges or attempts run out
    pub async fn run<B: Browser>(&self, page: &mut B, scrollable: &Scope<B::Node>) -> PaginationOutcome {
        let mut state = self.begin(page, scrollable).await;
        while !self.step(page, scrollable, &mut state).await.is_terminal() {}
        self.outcome(&state)
    }

    /// Takes the initial reading
    pub async fn begin<B: Browser>(&self, page: &B, scrollable: &Scope<B::Node>) -> PaginationState {
        match self.signature.read(page, scrollable).await {
            Ok(reading) => PaginationState::new(reading),
            Err(e) => {
                warn!(target = %self.target, error = %e, "Initial scroll signature could not be read");
                PaginationState::failed()
            }
        }
    }

    /// Performs one attempt unless the run is already over
    ///
    /// # Returns
    ///
    /// The phase after the attempt
    pub async fn step<B: Browser>(
        &self,
        page: &mut B,
        scrollable: &Scope<B::Node>,
        state: &mut PaginationState,
    ) -> PaginationPhase {
        let phase = state.phase(&self.config);
        if phase.is_terminal() {
            return phase;
        }

        if let Err(e) = self.action.perform(page, scrollable).await {
            warn!(target = %self.target, attempts = state.attempts, error = %e, "Scroll action failed");
            state.fail();
            return self.finish(state);
        }

        page.wait(self.config.inter_attempt_delay).await;

        match self.signature.read(&*page, scrollable).await {
            Ok(reading) => state.observe(reading),
            Err(e) => {
                warn!(target = %self.target, attempts = state.attempts, error = %e, "Scroll signature could not be read");
                state.fail();
            }
        }

        debug!(
            target = %self.target,
            attempts = state.attempts,
            stable = state.stable_iterations,
            signature = ?state.last_signature,
            "Pagination attempt"
        );
        self.finish(state)
    }

    fn finish(&self, state: &PaginationState) -> PaginationPhase {
        let phase = state.phase(&self.config);
        if phase == PaginationPhase::Exhausted {
            warn!(
                target = %self.target,
                attempts = state.attempts,
                "Pagination did not converge"
            );
        }
        phase
    }

    pub fn outcome(&self, state: &PaginationState) -> PaginationOutcome {
        let phase = state.phase(&self.config);
        PaginationOutcome {
            converged: phase == PaginationPhase::Converged,
            attempts: state.attempts,
            phase,
            last_signature: state.last_signature,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::SnapshotPage;
    use crate::extract::Selector;

    fn config(max_attempts: u32, stability_threshold: u32) -> PaginationConfig {
        PaginationConfig {
            max_attempts,
            stability_threshold,
            inter_attempt_delay: Duration::from_millis(1),
        }
    }

    #[test]
    fn test_state_transitions() {
        let config = config(10, 2);
        let mut state = PaginationState::new(10);
        assert_eq!(state.phase(&config), PaginationPhase::Scanning);

        state.observe(20);
        assert_eq!(state.phase(&config), PaginationPhase::Scanning);
        state.observe(20);
        assert_eq!(state.phase(&config), PaginationPhase::Stable(1));
        state.observe(30);
        assert_eq!(state.phase(&config), PaginationPhase::Scanning);
        state.observe(30);
        state.observe(30);
        assert_eq!(state.phase(&config), PaginationPhase::Converged);
        assert_eq!(state.attempts, 5);
    }

    #[test]
    fn test_exhausted_at_max_attempts() {
        let config = config(3, 2);
        let mut state = PaginationState::new(1);
        state.observe(2);
        state.observe(3);
        assert_eq!(state.phase(&config), PaginationPhase::Scanning);
        state.observe(4);
        assert_eq!(state.phase(&config), PaginationPhase::Exhausted);
    }

    #[test]
    fn test_failed_reading_is_exhausted() {
        let config = config(5, 1);
        let state = PaginationState::failed();
        assert_eq!(state.phase(&config), PaginationPhase::Exhausted);
    }

    fn frame(items: usize) -> String {
        let mut html = String::from("<html><body><ul>");
        for i in 0..items {
            html.push_str(&format!("<li>{}</li>", i));
        }
        html.push_str("</ul></body></html>");
        html
    }

    #[tokio::test]
    async fn test_run_converges_on_snapshot() {
        let url = "https://www.tiktok.com/@someone";
        let mut page = SnapshotPage::new()
            .with_route(url, vec![frame(3), frame(6), frame(8)])
            .with_time_scale(0.0);
        page.navigate(url).await.unwrap();

        let paginator = ScrollPaginator::new(
            config(20, 2),
            Signature::ItemCount(Selector::css("li")),
            ScrollAction::ToEnd,
        );
        let outcome = paginator.run(&mut page, &Scope::Document).await;

        assert!(outcome.converged);
        assert_eq!(outcome.phase, PaginationPhase::Converged);
        assert_eq!(outcome.last_signature, Some(8));
        assert_eq!(outcome.attempts, 4);
    }

    #[tokio::test]
    async fn test_run_without_page_is_exhausted() {
        let mut page = SnapshotPage::new();
        let paginator = ScrollPaginator::new(config(5, 2), Signature::ScrollHeight, ScrollAction::Viewport);
        let outcome = paginator.run(&mut page, &Scope::Document).await;
        assert!(!outcome.converged);
        assert_eq!(outcome.phase, PaginationPhase::Exhausted);
        assert_eq!(outcome.attempts, 0);
    }

    #[test]
    fn test_outcome_serialization() {
        let outcome = PaginationOutcome {
            converged: true,
            attempts: 3,
            phase: PaginationPhase::Converged,
            last_signature: Some(20),
        };
        let json = serde_json::to_string(&outcome).unwrap();
        assert_eq!(
            json,
            r#"{"converged":true,"attempts":3,"phase":"converged","lastSignature":20}"#
        );
    }
}
