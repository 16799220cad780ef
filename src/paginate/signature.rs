//! Growth signatures and scroll actions

use crate::browser::{Browser, BrowserError, Scope, ScrollDelta, ScrollMetric};
use crate::extract::Selector;
use serde::{Deserialize, Serialize};

/// Cheap reading that changes while a container keeps growing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Signature {
    ScrollHeight,
    ScrollOffset,
    /// Number of elements matching a selector inside the container
    ItemCount(Selector),
}

impl Signature {
    pub async fn read<B: Browser>(
        &self,
        page: &B,
        scrollable: &Scope<B::Node>,
    ) -> Result<u64, BrowserError> {
        match self {
            Self::ScrollHeight => page.scroll_metric(scrollable, ScrollMetric::Height).await,
            Self::ScrollOffset => page.scroll_metric(scrollable, ScrollMetric::Offset).await,
            Self::ItemCount(selector) => Ok(page.query_all(scrollable, selector).await?.len() as u64),
        }
    }
}

/// How a container is pushed to load more content
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScrollAction {
    ByPixels(u64),
    Viewport,
    ToEnd,
    /// Scroll the last matching element into view
    LastItemIntoView(Selector),
}

impl ScrollAction {
    pub async fn perform<B: Browser>(
        &self,
        page: &mut B,
        scrollable: &Scope<B::Node>,
    ) -> Result<(), BrowserError> {
        match self {
            Self::ByPixels(pixels) => page.scroll_by(scrollable, ScrollDelta::Pixels(*pixels)).await,
            Self::Viewport => page.scroll_by(scrollable, ScrollDelta::Viewport).await,
            Self::ToEnd => page.scroll_by(scrollable, ScrollDelta::End).await,
            Self::LastItemIntoView(selector) => {
                let last = page.query_all(scrollable, selector).await?.pop();
                match last {
                    Some(node) => page.scroll_into_view(&node).await,
                    None => page.scroll_by(scrollable, ScrollDelta::End).await,
                }
            }
        }
    }
}
