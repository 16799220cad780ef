use crate::platform::{Platform, TargetKind};
use serde::Deserialize;
use std::collections::BTreeMap;

/// Main configuration structure for Tidemark
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default, rename = "rate-limit")]
    pub rate_limit: RateLimitConfig,
    pub output: OutputConfig,
    #[serde(default, rename = "target")]
    pub targets: Vec<TargetEntry>,
}

/// Extraction and pagination tuning
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct EngineConfig {
    /// Maximum number of repeated items to extract per target (0 = all present)
    pub max_items: usize,

    /// Hard cap on scroll actions per pagination run
    pub max_scroll_attempts: u32,

    /// Consecutive unchanged signatures required to declare convergence
    pub stability_threshold: u32,

    /// Pause after each scroll action before re-reading the signature (milliseconds)
    pub inter_attempt_delay: u64,

    /// Upper bound for a single locator candidate (milliseconds)
    pub locator_timeout: u64,

    /// Total budget for resolving one field across all of its candidates (milliseconds)
    pub field_budget: u64,

    /// How long to wait for the item grid to appear after navigation (milliseconds)
    pub wait_for_items: u64,

    /// Run the browser without a visible window
    pub headless: bool,

    /// Skip authentication and prefer public read-only endpoints
    pub guest_mode: bool,

    /// Scroll every item into view before reading its fields
    pub reveal_items: bool,

    /// Open each collected Instagram post to read its likes, comments and caption
    pub post_details: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_items: 12,
            max_scroll_attempts: 20,
            stability_threshold: 2,
            inter_attempt_delay: 1500,
            locator_timeout: 2000,
            field_budget: 6000,
            wait_for_items: 10_000,
            headless: true,
            guest_mode: false,
            reveal_items: false,
            post_details: true,
        }
    }
}

/// Per-origin pacing and backoff
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct RateLimitConfig {
    /// Minimum time between extraction cycles against the same origin (milliseconds)
    pub minimum_interval: u64,

    /// Maximum number of extraction cycles per origin in one run
    pub max_requests_per_origin: u32,

    /// Maximum number of pages open at the same time
    pub max_concurrent_pages: u32,

    /// Base backoff after a block signal, doubled per consecutive block (milliseconds)
    pub block_backoff: u64,

    /// How many times a blocked target is retried before giving up
    pub max_block_retries: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            minimum_interval: 2000,
            max_requests_per_origin: 200,
            max_concurrent_pages: 2,
            block_backoff: 30_000,
            max_block_retries: 2,
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct OutputConfig {
    /// Path to the SQLite database file
    pub database_path: String,

    /// Path to the markdown summary file
    pub summary_path: String,

    /// Directory for per-target JSON reports
    #[serde(default)]
    pub json_dir: Option<String>,
}

/// A profile or post to scrape
#[derive(Debug, Clone, Deserialize)]
pub struct TargetEntry {
    pub platform: Platform,

    #[serde(default)]
    pub kind: TargetKind,

    /// Account name for profile targets
    #[serde(default)]
    pub username: Option<String>,

    /// Post URL for post targets
    #[serde(default)]
    pub url: Option<String>,

    /// Captured HTML snapshots replayed in order, one per scroll action
    #[serde(default)]
    pub snapshots: Vec<String>,

    /// Captured post pages keyed by the post link found in the grid
    #[serde(default, rename = "post-snapshots")]
    pub post_snapshots: BTreeMap<String, Vec<String>>,
}

impl TargetEntry {
    /// Human-readable label used in logs and reports
    pub fn label(&self) -> String {
        match (&self.kind, &self.username, &self.url) {
            (TargetKind::Profile, Some(user), _) => format!("{}:@{}", self.platform, user),
            (_, _, Some(url)) => format!("{}:{}", self.platform, url),
            _ => format!("{}:<unnamed>", self.platform),
        }
    }

    /// Post target for a link collected from this profile's grid
    pub fn post_target(&self, link: &str) -> TargetEntry {
        let key = link.trim();
        let snapshots = self
            .post_snapshots
            .get(key)
            .or_else(|| self.post_snapshots.get(key.trim_end_matches('/')))
            .cloned()
            .unwrap_or_default();

        TargetEntry {
            platform: self.platform,
            kind: TargetKind::Post,
            username: None,
            url: Some(key.to_string()),
            snapshots,
            post_snapshots: BTreeMap::new(),
        }
    }
}
