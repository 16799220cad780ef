//! Platform presets
//!
//! A [`Preset`] bundles everything the pipeline needs to know about one kind
//! of page: the header schema, the repeated items and their schema, how the
//! item list is paginated, which texts signal a login wall, and how the
//! records are summarized.
//!
//! What "likes" means differs per preset:
//! - Instagram profile: per-post likes read from each post page, falling back
//!   to the grid overlay (or the public endpoint in guest mode).
//! - Instagram post: the post's own like counter in the header; per-comment
//!   likes on the items.
//! - TikTok profile: the account-wide heart total in the header. The video grid
//!   only exposes views, so no per-item engagement is summed.
//! - TikTok post: the video's like counter in the header.

mod instagram;
mod tiktok;

use crate::config::TargetEntry;
use crate::extract::{FieldSchema, SchemaError, Selector};
use crate::metrics::MetricsConfig;
use crate::paginate::{ScrollAction, Signature};
use crate::url::{profile_url, resolve_post_url};
use crate::{UrlError, UrlResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

/// Supported social platforms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Instagram,
    #[serde(rename = "tiktok")]
    TikTok,
}

impl Platform {
    pub fn base_url(&self) -> &'static str {
        match self {
            Self::Instagram => "https://www.instagram.com",
            Self::TikTok => "https://www.tiktok.com",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Instagram => "instagram",
            Self::TikTok => "tiktok",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "instagram" => Some(Self::Instagram),
            "tiktok" => Some(Self::TikTok),
            _ => None,
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Whether a target is an account page or a single post
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    #[default]
    Profile,
    Post,
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Profile => write!(f, "profile"),
            Self::Post => write!(f, "post"),
        }
    }
}

/// Extraction recipe for one platform and target kind
#[derive(Debug, Clone)]
pub struct Preset {
    /// Profile header or post header fields
    pub header_schema: FieldSchema,
    /// Fallback list of selectors for the repeated items
    pub item_selectors: Vec<Selector>,
    pub item_schema: FieldSchema,
    /// Fallback list for the scrollable container; empty means the document
    pub scroll_container: Vec<Selector>,
    pub signature: Signature,
    pub action: ScrollAction,
    /// Texts that mean the page is behind a login wall
    pub block_signals: Vec<Selector>,
    pub metrics: MetricsConfig,
}

/// Returns the preset for a platform and target kind
pub fn preset(platform: Platform, kind: TargetKind) -> Result<Preset, SchemaError> {
    match (platform, kind) {
        (Platform::Instagram, TargetKind::Profile) => instagram::profile_preset(),
        (Platform::Instagram, TargetKind::Post) => instagram::post_preset(),
        (Platform::TikTok, TargetKind::Profile) => tiktok::profile_preset(),
        (Platform::TikTok, TargetKind::Post) => tiktok::post_preset(),
    }
}

/// Resolves the URL a target is scraped from
pub fn target_url(target: &TargetEntry) -> UrlResult<Url> {
    match target.kind {
        TargetKind::Profile => {
            let username = target
                .username
                .as_deref()
                .ok_or_else(|| UrlError::InvalidUsername(String::new()))?;
            profile_url(target.platform, username)
        }
        TargetKind::Post => {
            let raw = target
                .url
                .as_deref()
                .ok_or_else(|| UrlError::Parse("post target has no url".to_string()))?;
            resolve_post_url(target.platform, raw)
        }
    }
}

/// Texts shared by both platforms' login walls and throttle pages
fn login_wall_signals() -> Vec<Selector> {
    [
        "Log in to see",
        "Log in to continue",
        "Log in to view",
        "Only people who follow",
        "Too many requests",
        "Please try again later",
    ]
    .iter()
    .map(|text| Selector::text(text))
    .collect()
}

/// Capture for the first abbreviated number in a text
const NUMBER_CAPTURE: &str = r"(\d[\d.,]*[KMB]?)";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_serde() {
        #[derive(Deserialize)]
        struct Wrapper {
            platform: Platform,
            kind: TargetKind,
        }
        let w: Wrapper = toml::from_str("platform = \"tiktok\"\nkind = \"post\"").unwrap();
        assert_eq!(w.platform, Platform::TikTok);
        assert_eq!(w.kind, TargetKind::Post);
        assert_eq!(Platform::TikTok.to_string(), "tiktok");
        assert_eq!(Platform::from_db_string("instagram"), Some(Platform::Instagram));
        assert_eq!(TargetKind::default(), TargetKind::Profile);
    }

    #[test]
    fn test_all_presets_build() {
        for platform in [Platform::Instagram, Platform::TikTok] {
            for kind in [TargetKind::Profile, TargetKind::Post] {
                let preset = preset(platform, kind).unwrap();
                assert!(!preset.item_selectors.is_empty());
                assert!(!preset.header_schema.is_empty());
                assert!(!preset.item_schema.is_empty());
                assert!(!preset.block_signals.is_empty());
            }
        }
    }

    #[test]
    fn test_target_url() {
        let profile = TargetEntry {
            platform: Platform::TikTok,
            kind: TargetKind::Profile,
            username: Some("someone".to_string()),
            url: None,
            snapshots: vec![],
            post_snapshots: Default::default(),
        };
        assert_eq!(
            target_url(&profile).unwrap().as_str(),
            "https://www.tiktok.com/@someone"
        );

        let post = TargetEntry {
            platform: Platform::Instagram,
            kind: TargetKind::Post,
            username: None,
            url: Some("/p/ABC123/".to_string()),
            snapshots: vec![],
            post_snapshots: Default::default(),
        };
        assert_eq!(
            target_url(&post).unwrap().as_str(),
            "https://www.instagram.com/p/ABC123/"
        );

        let missing = TargetEntry {
            url: None,
            ..post
        };
        assert!(target_url(&missing).is_err());
    }

    #[test]
    fn test_number_capture() {
        let capture = crate::extract::Capture::new(NUMBER_CAPTURE).unwrap();
        assert_eq!(capture.apply("1,234 likes"), Some("1,234".to_string()));
        assert_eq!(capture.apply("View all 12.5K comments"), Some("12.5K".to_string()));
        assert_eq!(capture.apply("no digits"), None);
    }
}
