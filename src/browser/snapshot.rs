//! Snapshot replay backend
//!
//! A [`SnapshotPage`] serves captured HTML documents in place of a live page.
//! Each route holds an ordered list of frames; a scroll that reaches the bottom
//! of the current frame swaps in the next one, which models an infinite-scroll
//! container loading its next batch.
//!
//! Node handles carry the frame they were resolved in. A handle stays usable
//! after a frame swap only if the element at the same document position still
//! has the same tag and attributes, otherwise it is reported as detached.

use super::{Browser, BrowserError, PageFactory, PageOptions, Scope, ScrollDelta, ScrollMetric};
use crate::config::TargetEntry;
use crate::extract::Selector;
use crate::platform;
use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector as CssSelector};
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, trace};

/// Pixel height attributed to each element when measuring a frame
const ROW_HEIGHT: u64 = 40;

/// Default viewport height in pixels
const DEFAULT_VIEWPORT: u64 = 800;

/// Handle to an element inside a snapshot frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapshotNode {
    frame: usize,
    ordinal: usize,
    fingerprint: u64,
}

struct LoadedPage {
    url: String,
    frames: Vec<String>,
    frame: usize,
    offset: u64,
}

/// Browser backend replaying captured HTML frames
pub struct SnapshotPage {
    routes: HashMap<String, Vec<String>>,
    loaded: Option<LoadedPage>,
    viewport: u64,
    time_scale: f64,
    scroll_actions: usize,
}

impl Default for SnapshotPage {
    fn default() -> Self {
        Self::new()
    }
}

impl SnapshotPage {
    /// Creates a page with no routes
    pub fn new() -> Self {
        Self {
            routes: HashMap::new(),
            loaded: None,
            viewport: DEFAULT_VIEWPORT,
            time_scale: 1.0,
            scroll_actions: 0,
        }
    }

    /// Adds a route served as the given frames
    pub fn with_route(mut self, url: &str, frames: Vec<String>) -> Self {
        self.add_route(url, frames);
        self
    }

    /// Scales every `wait` call, 0.0 makes waits return immediately
    pub fn with_time_scale(mut self, scale: f64) -> Self {
        self.time_scale = scale.max(0.0);
        self
    }

    pub fn with_viewport(mut self, viewport: u64) -> Self {
        self.viewport = viewport.max(1);
        self
    }

    pub fn add_route(&mut self, url: &str, frames: Vec<String>) {
        self.routes.insert(route_key(url), frames);
    }

    /// Builds a page serving `url` from snapshot files, in order
    pub async fn from_files<P: AsRef<Path>>(url: &str, paths: &[P]) -> Result<Self, BrowserError> {
        let mut frames = Vec::with_capacity(paths.len());
        for path in paths {
            frames.push(tokio::fs::read_to_string(path.as_ref()).await?);
        }
        Ok(Self::new().with_route(url, frames))
    }

    /// Index of the frame currently shown
    pub fn frame_index(&self) -> Option<usize> {
        self.loaded.as_ref().map(|page| page.frame)
    }

    /// Number of scroll actions performed so far
    pub fn scroll_actions(&self) -> usize {
        self.scroll_actions
    }

    fn loaded(&self) -> Result<&LoadedPage, BrowserError> {
        self.loaded.as_ref().ok_or(BrowserError::NoPage)
    }

    fn document(&self) -> Result<(Html, usize), BrowserError> {
        let page = self.loaded()?;
        let html = page
            .frames
            .get(page.frame)
            .map(|source| Html::parse_document(source))
            .ok_or(BrowserError::NoPage)?;
        Ok((html, page.frame))
    }

    /// Element count below the scope, in rows
    fn scope_rows(&self, scope: &Scope<SnapshotNode>) -> Result<u64, BrowserError> {
        let (html, frame) = self.document()?;
        let root = scope_root(&html, frame, scope)?;
        Ok(root.descendants().filter_map(ElementRef::wrap).count() as u64)
    }

    /// Moves the page offset and swaps in the next frame once the bottom is reached
    fn move_to(&mut self, target_offset: u64, height: u64) -> Result<(), BrowserError> {
        let viewport = self.viewport;
        let page = self.loaded.as_mut().ok_or(BrowserError::NoPage)?;
        page.offset = target_offset.min(height);
        self.scroll_actions += 1;

        let at_bottom = page.offset + viewport >= height;
        if at_bottom && page.frame + 1 < page.frames.len() {
            page.frame += 1;
            trace!(url = %page.url, frame = page.frame, "Loaded next snapshot frame");
        }
        Ok(())
    }
}

fn route_key(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}

fn elements(html: &Html) -> impl Iterator<Item = ElementRef<'_>> {
    html.root_element()
        .descendants()
        .filter_map(ElementRef::wrap)
}

fn fingerprint(element: &ElementRef<'_>) -> u64 {
    let mut hasher = DefaultHasher::new();
    element.value().name().hash(&mut hasher);
    let mut attrs: Vec<(&str, &str)> = element.value().attrs().collect();
    attrs.sort_unstable();
    attrs.hash(&mut hasher);
    hasher.finish()
}

fn node_for(html: &Html, frame: usize, element: &ElementRef<'_>) -> Option<SnapshotNode> {
    let ordinal = elements(html).position(|candidate| candidate.id() == element.id())?;
    Some(SnapshotNode {
        frame,
        ordinal,
        fingerprint: fingerprint(element),
    })
}

fn resolve_node<'a>(
    html: &'a Html,
    frame: usize,
    node: &SnapshotNode,
) -> Result<ElementRef<'a>, BrowserError> {
    let element = elements(html)
        .nth(node.ordinal)
        .ok_or(BrowserError::Detached)?;
    if node.frame != frame && fingerprint(&element) != node.fingerprint {
        return Err(BrowserError::Detached);
    }
    Ok(element)
}

fn scope_root<'a>(
    html: &'a Html,
    frame: usize,
    scope: &Scope<SnapshotNode>,
) -> Result<ElementRef<'a>, BrowserError> {
    match scope {
        Scope::Document => Ok(html.root_element()),
        Scope::Element(node) => resolve_node(html, frame, node),
    }
}

fn parse_css(query: &str) -> Result<CssSelector, BrowserError> {
    CssSelector::parse(query).map_err(|e| BrowserError::InvalidSelector {
        selector: query.to_string(),
        reason: e.to_string(),
    })
}

fn element_text(element: &ElementRef<'_>) -> String {
    let raw: String = element.text().collect();
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Evaluates a selector below `root`, in document order
fn matches<'a>(root: ElementRef<'a>, selector: &Selector) -> Result<Vec<ElementRef<'a>>, BrowserError> {
    match selector {
        Selector::Css(query) => {
            let css = parse_css(query)?;
            Ok(root.select(&css).collect())
        }
        Selector::Xpath(query) => Err(BrowserError::Unsupported(format!("xpath {}", query))),
        Selector::Scope => Ok(vec![root]),
        Selector::Text { contains, within } => {
            let css = parse_css(within.as_deref().unwrap_or("*"))?;
            let needle = contains.to_lowercase();
            let found: Vec<ElementRef<'a>> = root
                .select(&css)
                .filter(|element| element_text(element).to_lowercase().contains(&needle))
                .collect();

            // Keep the innermost matches only
            let ids: Vec<_> = found.iter().map(|element| element.id()).collect();
            Ok(found
                .into_iter()
                .filter(|element| {
                    !element
                        .descendants()
                        .skip(1)
                        .any(|descendant| ids.contains(&descendant.id()))
                })
                .collect())
        }
    }
}

#[async_trait]
impl Browser for SnapshotPage {
    type Node = SnapshotNode;

    async fn navigate(&mut self, url: &str) -> Result<(), BrowserError> {
        let frames = self
            .routes
            .get(&route_key(url))
            .cloned()
            .ok_or_else(|| BrowserError::Navigation {
                url: url.to_string(),
                reason: "no snapshot recorded for this URL".to_string(),
            })?;

        if frames.is_empty() {
            return Err(BrowserError::Navigation {
                url: url.to_string(),
                reason: "snapshot route has no frames".to_string(),
            });
        }

        debug!(url, frames = frames.len(), "Loaded snapshot route");
        self.loaded = Some(LoadedPage {
            url: url.to_string(),
            frames,
            frame: 0,
            offset: 0,
        });
        Ok(())
    }

    async fn query_one(
        &self,
        scope: &Scope<SnapshotNode>,
        selector: &Selector,
    ) -> Result<Option<SnapshotNode>, BrowserError> {
        let (html, frame) = self.document()?;
        let root = scope_root(&html, frame, scope)?;
        Ok(matches(root, selector)?
            .first()
            .and_then(|element| node_for(&html, frame, element)))
    }

    async fn query_all(
        &self,
        scope: &Scope<SnapshotNode>,
        selector: &Selector,
    ) -> Result<Vec<SnapshotNode>, BrowserError> {
        let (html, frame) = self.document()?;
        let root = scope_root(&html, frame, scope)?;
        Ok(matches(root, selector)?
            .iter()
            .filter_map(|element| node_for(&html, frame, element))
            .collect())
    }

    async fn text(&self, node: &SnapshotNode) -> Result<String, BrowserError> {
        let (html, frame) = self.document()?;
        let element = resolve_node(&html, frame, node)?;
        Ok(element_text(&element))
    }

    async fn attribute(
        &self,
        node: &SnapshotNode,
        name: &str,
    ) -> Result<Option<String>, BrowserError> {
        let (html, frame) = self.document()?;
        let element = resolve_node(&html, frame, node)?;
        Ok(element.value().attr(name).map(str::to_string))
    }

    async fn scroll_metric(
        &self,
        scope: &Scope<SnapshotNode>,
        metric: ScrollMetric,
    ) -> Result<u64, BrowserError> {
        match metric {
            ScrollMetric::Height => Ok(self.scope_rows(scope)? * ROW_HEIGHT),
            ScrollMetric::Offset => {
                // Fails for detached scopes like a live page would
                self.scope_rows(scope)?;
                Ok(self.loaded()?.offset)
            }
        }
    }

    async fn scroll_by(
        &mut self,
        scope: &Scope<SnapshotNode>,
        delta: ScrollDelta,
    ) -> Result<(), BrowserError> {
        let height = self.scope_rows(scope)? * ROW_HEIGHT;
        let offset = self.loaded()?.offset;
        let target = match delta {
            ScrollDelta::Pixels(pixels) => offset.saturating_add(pixels),
            ScrollDelta::Viewport => offset.saturating_add(self.viewport),
            ScrollDelta::End => height,
        };
        self.move_to(target, height)
    }

    async fn scroll_into_view(&mut self, node: &SnapshotNode) -> Result<(), BrowserError> {
        let (height, target) = {
            let (html, frame) = self.document()?;
            resolve_node(&html, frame, node)?;
            let rows = elements(&html).count() as u64;
            (rows * ROW_HEIGHT, node.ordinal as u64 * ROW_HEIGHT)
        };
        self.move_to(target, height)
    }

    async fn wait(&self, duration: Duration) {
        if self.time_scale > 0.0 {
            tokio::time::sleep(duration.mul_f64(self.time_scale)).await;
        }
    }

    fn current_url(&self) -> Option<String> {
        self.loaded.as_ref().map(|page| page.url.clone())
    }
}

/// Opens snapshot pages from the `snapshots` files listed on each target
#[derive(Debug, Clone, Default)]
pub struct SnapshotFactory {
    time_scale: Option<f64>,
}

impl SnapshotFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies a wait scale to every page this factory opens
    pub fn with_time_scale(scale: f64) -> Self {
        Self {
            time_scale: Some(scale),
        }
    }
}

#[async_trait]
impl PageFactory for SnapshotFactory {
    type Page = SnapshotPage;

    async fn open(
        &self,
        target: &TargetEntry,
        options: &PageOptions,
    ) -> Result<SnapshotPage, BrowserError> {
        let url = platform::target_url(target).map_err(|e| BrowserError::Navigation {
            url: target.label(),
            reason: e.to_string(),
        })?;
        debug!(
            target = %target.label(),
            headless = options.headless,
            snapshots = target.snapshots.len(),
            "Opening snapshot page"
        );

        let page = SnapshotPage::from_files(url.as_str(), &target.snapshots).await?;
        Ok(match self.time_scale {
            Some(scale) => page.with_time_scale(scale),
            None => page,
        })
    }
}
