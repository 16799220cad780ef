//! Shared helpers for the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tidemark::browser::{BrowserError, ScrollDelta, ScrollMetric};
use tidemark::extract::Selector;
use tidemark::{Browser, Scope};

/// Element handle of a [`ScriptedPage`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptedNode {
    Item(usize),
    Field {
        item: Option<usize>,
        selector: String,
    },
}

/// Fake browser with a fixed item list and a scripted height sequence
///
/// Every scroll action advances the height sequence by one reading; the last
/// reading repeats once the sequence runs out. Only CSS selectors are
/// understood, and matching is by exact selector string.
#[derive(Debug, Default)]
pub struct ScriptedPage {
    item_selector: String,
    items: Vec<HashMap<String, String>>,
    document: HashMap<String, String>,
    failing: HashSet<usize>,
    heights: Vec<u64>,
    position: usize,
    scrolls: usize,
}

impl ScriptedPage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Items matched by `selector`, each a map of field selector to text
    pub fn with_items(mut self, selector: &str, items: Vec<HashMap<String, String>>) -> Self {
        self.item_selector = selector.to_string();
        self.items = items;
        self
    }

    /// Element directly below the document
    pub fn with_document_field(mut self, selector: &str, text: &str) -> Self {
        self.document.insert(selector.to_string(), text.to_string());
        self
    }

    /// Makes the item at `position` (0-based) unreadable
    pub fn with_failing_item(mut self, position: usize) -> Self {
        self.failing.insert(position);
        self
    }

    pub fn with_heights(mut self, heights: Vec<u64>) -> Self {
        self.heights = heights;
        self
    }

    pub fn scrolls(&self) -> usize {
        self.scrolls
    }

    fn css(selector: &Selector) -> Result<&str, BrowserError> {
        match selector {
            Selector::Css(query) => Ok(query),
            other => Err(BrowserError::Unsupported(other.to_string())),
        }
    }

    fn lookup(&self, scope: &Scope<ScriptedNode>, query: &str) -> Vec<ScriptedNode> {
        match scope {
            Scope::Document if query == self.item_selector => {
                (0..self.items.len()).map(ScriptedNode::Item).collect()
            }
            Scope::Document => self
                .document
                .get(query)
                .map(|_| ScriptedNode::Field {
                    item: None,
                    selector: query.to_string(),
                })
                .into_iter()
                .collect(),
            Scope::Element(ScriptedNode::Item(position)) => self
                .items
                .get(*position)
                .and_then(|fields| fields.get(query))
                .map(|_| ScriptedNode::Field {
                    item: Some(*position),
                    selector: query.to_string(),
                })
                .into_iter()
                .collect(),
            Scope::Element(ScriptedNode::Field { .. }) => Vec::new(),
        }
    }
}

#[async_trait]
impl Browser for ScriptedPage {
    type Node = ScriptedNode;

    async fn navigate(&mut self, _url: &str) -> Result<(), BrowserError> {
        Ok(())
    }

    async fn query_one(
        &self,
        scope: &Scope<ScriptedNode>,
        selector: &Selector,
    ) -> Result<Option<ScriptedNode>, BrowserError> {
        let query = Self::css(selector)?;
        Ok(self.lookup(scope, query).into_iter().next())
    }

    async fn query_all(
        &self,
        scope: &Scope<ScriptedNode>,
        selector: &Selector,
    ) -> Result<Vec<ScriptedNode>, BrowserError> {
        let query = Self::css(selector)?;
        Ok(self.lookup(scope, query))
    }

    async fn text(&self, node: &ScriptedNode) -> Result<String, BrowserError> {
        match node {
            ScriptedNode::Item(position) if self.failing.contains(position) => Err(BrowserError::Detached),
            ScriptedNode::Item(position) => Ok(format!("item {}", position + 1)),
            ScriptedNode::Field {
                item: None,
                selector,
            } => self.document.get(selector).cloned().ok_or(BrowserError::Detached),
            ScriptedNode::Field {
                item: Some(position),
                selector,
            } => self
                .items
                .get(*position)
                .and_then(|fields| fields.get(selector))
                .cloned()
                .ok_or(BrowserError::Detached),
        }
    }

    async fn attribute(&self, _node: &ScriptedNode, _name: &str) -> Result<Option<String>, BrowserError> {
        Ok(None)
    }

    async fn scroll_metric(
        &self,
        _scope: &Scope<ScriptedNode>,
        metric: ScrollMetric,
    ) -> Result<u64, BrowserError> {
        match metric {
            ScrollMetric::Height => {
                let reading = self
                    .heights
                    .get(self.position)
                    .or_else(|| self.heights.last())
                    .copied();
                reading.ok_or_else(|| BrowserError::Other("no heights scripted".to_string()))
            }
            ScrollMetric::Offset => Ok(self.position as u64),
        }
    }

    async fn scroll_by(&mut self, _scope: &Scope<ScriptedNode>, _delta: ScrollDelta) -> Result<(), BrowserError> {
        self.position += 1;
        self.scrolls += 1;
        Ok(())
    }

    async fn scroll_into_view(&mut self, _node: &ScriptedNode) -> Result<(), BrowserError> {
        Ok(())
    }

    async fn wait(&self, _duration: Duration) {}

    fn current_url(&self) -> Option<String> {
        Some("https://scripted.test/".to_string())
    }
}

/// Item field map from `(selector, text)` pairs
pub fn fields(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(selector, text)| (selector.to_string(), text.to_string()))
        .collect()
}

/// TikTok profile markup with `videos` grid items
pub fn tiktok_profile_frame(videos: usize) -> String {
    let mut html = String::from(
        r#"<html><body><h1 data-e2e="user-title">someone</h1>
        <strong data-e2e="followers-count">2,000</strong>
        <strong data-e2e="following-count">12</strong>
        <strong data-e2e="likes-count">1.5K</strong>"#,
    );
    for i in 0..videos {
        html.push_str(&format!(
            r#"<div data-e2e="user-post-item"><a href="/@someone/video/{}"><strong data-e2e="video-views">{}</strong></a></div>"#,
            i + 1,
            (i + 1) * 100
        ));
    }
    html.push_str("</body></html>");
    html
}

/// Writes frames as numbered snapshot files and returns their paths
pub fn write_frames(dir: &Path, prefix: &str, frames: &[String]) -> Vec<PathBuf> {
    frames
        .iter()
        .enumerate()
        .map(|(i, frame)| {
            let path = dir.join(format!("{}-{}.html", prefix, i));
            std::fs::write(&path, frame).expect("Failed to write snapshot");
            path
        })
        .collect()
}

/// TOML array literal of snapshot paths
pub fn toml_paths(paths: &[PathBuf]) -> String {
    let quoted: Vec<String> = paths
        .iter()
        .map(|path| format!("{:?}", path.display().to_string()))
        .collect();
    format!("[{}]", quoted.join(", "))
}
