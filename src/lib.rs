//! Tidemark: resilient engagement extraction for unstable social pages
//!
//! This crate drives a browser-control capability over profile and post pages,
//! resolves fields through ordered locator fallbacks, scrolls lazy-loaded
//! containers to a stable end state, and reduces the extracted items into
//! engagement statistics.

pub mod browser;
pub mod config;
pub mod extract;
pub mod metrics;
pub mod output;
pub mod paginate;
pub mod platform;
pub mod session;
pub mod state;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for Tidemark operations
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Browser error: {0}")]
    Browser(#[from] browser::BrowserError),

    #[error("Navigation to {target} failed: {reason}")]
    Navigation { target: String, reason: String },

    #[error("Target {target} is behind a block or login wall: {signal}")]
    Blocked { target: String, signal: String },

    #[error("Authentication failed: {0}")]
    Authentication(#[from] session::AuthError),

    #[error("Rate limit exhausted for origin {origin}")]
    RateLimited { origin: String },

    #[error("Schema error: {0}")]
    Schema(#[from] extract::SchemaError),

    #[error("HTTP error for {url}: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Unexpected response from {url}: {message}")]
    Endpoint { url: String, message: String },

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Storage error: {0}")]
    StorageError(#[from] storage::StorageError),

    #[error("Output error: {0}")]
    Output(#[from] output::OutputError),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Task failed: {0}")]
    Task(String),
}

impl ScrapeError {
    /// Returns true if this error must stop the whole batch, not just one target
    pub fn is_session_fatal(&self) -> bool {
        matches!(self, Self::Authentication(_))
    }
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid target: {0}")]
    InvalidTarget(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing host in URL")]
    MissingHost,

    #[error("Invalid username: {0}")]
    InvalidUsername(String),
}

/// Result type alias for Tidemark operations
pub type Result<T> = std::result::Result<T, ScrapeError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use browser::{Browser, PageFactory, Scope, SnapshotFactory, SnapshotPage};
pub use config::Config;
pub use extract::{
    parse_count, ExtractionRecord, FieldSchema, FieldSpec, ItemExtractor, Locator, LocatorSpec,
    SelectorResolver,
};
pub use metrics::{summarize, EngagementSummary, ProfileCounters};
pub use paginate::{PaginationOutcome, ScrollPaginator};
pub use state::{OriginState, TargetState};
