//! Browser-control capability
//!
//! The extraction engine never talks to a specific automation product. It
//! depends only on the [`Browser`] trait defined here, which exposes the small
//! read/scroll/wait surface the engine needs, and on [`PageFactory`], which
//! opens one page per target.
//!
//! [`SnapshotPage`] is the bundled backend: it replays captured HTML snapshots
//! of a page, one capture per scroll that reaches the bottom.

mod snapshot;

pub use snapshot::{SnapshotFactory, SnapshotNode, SnapshotPage};

use crate::config::TargetEntry;
use crate::extract::Selector;
use async_trait::async_trait;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Errors raised by a browser backend
#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("Navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("Invalid selector {selector}: {reason}")]
    InvalidSelector { selector: String, reason: String },

    #[error("Unsupported locator strategy: {0}")]
    Unsupported(String),

    #[error("Node is detached from the current document")]
    Detached,

    #[error("No page is loaded")]
    NoPage,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Browser error: {0}")]
    Other(String),
}

/// Where a query is evaluated: the whole document or below a resolved element
#[derive(Debug, Clone)]
pub enum Scope<N> {
    Document,
    Element(N),
}

impl<N> Scope<N> {
    pub fn is_document(&self) -> bool {
        matches!(self, Self::Document)
    }
}

/// Cheap scroll measurements a surface can report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollMetric {
    /// Total scrollable height of the region
    Height,
    /// Current scroll offset of the region
    Offset,
}

/// How far a scroll action moves the region
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollDelta {
    Pixels(u64),
    Viewport,
    End,
}

/// Options for opening a page
#[derive(Debug, Clone, Default)]
pub struct PageOptions {
    /// Run without a visible window
    pub headless: bool,
}

/// A single page (tab) the engine can read and scroll
///
/// Read operations take `&self`; anything that changes what the page shows
/// takes `&mut self`, so two actions can never interleave on one page.
#[async_trait]
pub trait Browser: Send + Sync {
    /// Handle to an element in the current document
    type Node: Clone + Send + Sync + fmt::Debug;

    /// Loads `url` into the page
    async fn navigate(&mut self, url: &str) -> Result<(), BrowserError>;

    /// Returns the first element matching `selector` inside `scope`
    async fn query_one(
        &self,
        scope: &Scope<Self::Node>,
        selector: &Selector,
    ) -> Result<Option<Self::Node>, BrowserError>;

    /// Returns every element matching `selector` inside `scope`, in document order
    async fn query_all(
        &self,
        scope: &Scope<Self::Node>,
        selector: &Selector,
    ) -> Result<Vec<Self::Node>, BrowserError>;

    /// Returns the rendered text of a node
    async fn text(&self, node: &Self::Node) -> Result<String, BrowserError>;

    /// Returns an attribute of a node, or None if it is not set
    async fn attribute(&self, node: &Self::Node, name: &str)
        -> Result<Option<String>, BrowserError>;

    /// Reads a scroll measurement of the region
    async fn scroll_metric(
        &self,
        scope: &Scope<Self::Node>,
        metric: ScrollMetric,
    ) -> Result<u64, BrowserError>;

    /// Scrolls the region
    async fn scroll_by(
        &mut self,
        scope: &Scope<Self::Node>,
        delta: ScrollDelta,
    ) -> Result<(), BrowserError>;

    /// Scrolls until `node` is visible
    async fn scroll_into_view(&mut self, node: &Self::Node) -> Result<(), BrowserError>;

    /// Suspends for `duration` while the page reacts
    async fn wait(&self, duration: Duration);

    /// URL of the loaded document, if any
    fn current_url(&self) -> Option<String>;
}

/// Opens pages for targets
#[async_trait]
pub trait PageFactory: Send + Sync {
    type Page: Browser + 'static;

    /// Opens a fresh page for `target`
    async fn open(
        &self,
        target: &TargetEntry,
        options: &PageOptions,
    ) -> Result<Self::Page, BrowserError>;
}
