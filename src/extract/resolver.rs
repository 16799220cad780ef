//! Ordered locator fallback

use super::{Locator, LocatorSpec, Selector};
use crate::browser::{Browser, BrowserError, Scope, ScrollDelta};
use std::time::Duration;
use tokio::time::{timeout, Instant};
use tracing::{debug, trace};

/// Smallest slice of time a single candidate is given
const MIN_ATTEMPT: Duration = Duration::from_millis(1);

/// Resolves a field by trying its candidate locators in priority order
#[derive(Debug, Clone)]
pub struct SelectorResolver {
    locator_timeout: Duration,
}

impl SelectorResolver {
    /// Creates a resolver bounding each candidate by `locator_timeout`
    pub fn new(locator_timeout: Duration) -> Self {
        Self { locator_timeout }
    }

    pub fn locator_timeout(&self) -> Duration {
        self.locator_timeout
    }

    /// Time granted to each candidate of a chain of `candidates` under `budget`
    pub fn attempt_timeout(&self, budget: Duration, candidates: usize) -> Duration {
        let share = budget / candidates.max(1) as u32;
        self.locator_timeout.min(share).max(MIN_ATTEMPT)
    }

    /// Resolves `spec` inside `scope`
    ///
    /// Candidates are tried in order and the first non-empty value wins. Query
    /// errors and timeouts count as misses. The whole chain never runs longer
    /// than `budget`.
    ///
    /// # Returns
    ///
    /// The trimmed value, or None if every candidate missed
    pub async fn resolve<B: Browser>(
        &self,
        page: &B,
        scope: &Scope<B::Node>,
        spec: &LocatorSpec,
        budget: Duration,
    ) -> Option<String> {
        let deadline = Instant::now() + budget;
        let slice = self.attempt_timeout(budget, spec.len());

        for (position, locator) in spec.iter().enumerate() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                debug!(locator = %locator, position, "Field budget spent before candidate");
                break;
            }

            match timeout(slice.min(remaining), read_locator(page, scope, locator)).await {
                Ok(Ok(Some(value))) => {
                    trace!(locator = %locator, position, "Candidate matched");
                    return Some(value);
                }
                Ok(Ok(None)) => trace!(locator = %locator, position, "Candidate missed"),
                Ok(Err(e)) => debug!(locator = %locator, position, error = %e, "Candidate failed"),
                Err(_) => debug!(locator = %locator, position, "Candidate timed out"),
            }
        }

        None
    }

    /// Waits until any of `selectors` matches in the document
    ///
    /// Between polls the page is scrolled by one viewport to trigger lazy
    /// loading.
    ///
    /// # Returns
    ///
    /// True if a selector matched within `budget`
    pub async fn wait_for<B: Browser>(
        &self,
        page: &mut B,
        selectors: &[Selector],
        budget: Duration,
        poll: Duration,
    ) -> bool {
        let deadline = Instant::now() + budget;
        let scope = Scope::Document;

        loop {
            for selector in selectors {
                match page.query_one(&scope, selector).await {
                    Ok(Some(_)) => return true,
                    Ok(None) => {}
                    Err(e) => debug!(selector = %selector, error = %e, "Wait query failed"),
                }
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return false;
            }

            if let Err(e) = page.scroll_by(&scope, ScrollDelta::Viewport).await {
                debug!(error = %e, "Scroll while waiting failed");
            }
            page.wait(poll.min(remaining)).await;
        }
    }
}

async fn read_locator<B: Browser>(
    page: &B,
    scope: &Scope<B::Node>,
    locator: &Locator,
) -> Result<Option<String>, BrowserError> {
    let node = match page.query_one(scope, &locator.selector).await? {
        Some(node) => node,
        None => return Ok(None),
    };

    let raw = match &locator.attribute {
        Some(name) => page.attribute(&node, name).await?,
        None => Some(page.text(&node).await?),
    };

    let value = raw.and_then(|raw| match &locator.capture {
        Some(capture) => capture.apply(&raw),
        None => Some(raw),
    });

    Ok(value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty()))
}
