//! Public profile endpoint
//!
//! Guest sessions often hit a login wall on profile pages. Public profiles
//! are still served as JSON from `/{username}/?__a=1&__d=dis`; this module
//! fetches that document and maps it into profile counters and per-post
//! records.

use crate::extract::{ExtractionRecord, FieldValue};
use crate::metrics::ProfileCounters;
use crate::ScrapeError;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;

const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Profile data read from the public endpoint
#[derive(Debug, Clone, PartialEq)]
pub struct PublicProfile {
    pub counters: ProfileCounters,
    /// One record per timeline post with `likes`, `comments` and `link`
    pub records: Vec<ExtractionRecord>,
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    graphql: Option<GraphQl>,
    #[serde(default)]
    profile: Option<UserNode>,
}

#[derive(Debug, Deserialize)]
struct GraphQl {
    #[serde(default)]
    user: Option<UserNode>,
}

#[derive(Debug, Default, Deserialize)]
struct Counter {
    #[serde(default)]
    count: u64,
}

#[derive(Debug, Default, Deserialize)]
struct Timeline {
    #[serde(default)]
    count: u64,
    #[serde(default)]
    edges: Vec<TimelineEdge>,
}

#[derive(Debug, Deserialize)]
struct TimelineEdge {
    #[serde(default)]
    node: MediaNode,
}

#[derive(Debug, Default, Deserialize)]
struct MediaNode {
    #[serde(default)]
    shortcode: Option<String>,
    #[serde(default)]
    edge_liked_by: Counter,
    #[serde(default)]
    edge_media_to_comment: Counter,
}

#[derive(Debug, Deserialize)]
struct UserNode {
    #[serde(default)]
    edge_followed_by: Counter,
    #[serde(default)]
    edge_follow: Counter,
    #[serde(default)]
    edge_owner_to_timeline_media: Timeline,
}

/// Builds the HTTP client used for the public endpoint
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client() -> Result<Client, reqwest::Error> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

    Client::builder()
        .user_agent(USER_AGENT)
        .default_headers(headers)
        .timeout(Duration::from_secs(15))
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches a public profile from `{base_url}/{username}/?__a=1&__d=dis`
///
/// # Arguments
///
/// * `client` - HTTP client from [`build_http_client`]
/// * `base_url` - Site root, normally `https://www.instagram.com`
/// * `username` - Account name, with or without a leading `@`
/// * `max_items` - Timeline posts to keep, 0 keeps all
pub async fn fetch_public_profile(
    client: &Client,
    base_url: &str,
    username: &str,
    max_items: usize,
) -> Result<PublicProfile, ScrapeError> {
    let name = username.trim_start_matches('@');
    let url = format!("{}/{}/?__a=1&__d=dis", base_url.trim_end_matches('/'), name);
    tracing::debug!("Fetching public profile {}", url);

    let response = client
        .get(&url)
        .send()
        .await
        .map_err(|source| ScrapeError::Http {
            url: url.clone(),
            source,
        })?;

    let status = response.status();
    if status != StatusCode::OK {
        return Err(ScrapeError::Endpoint {
            url,
            message: format!("HTTP {}", status.as_u16()),
        });
    }

    let envelope: Envelope = response.json().await.map_err(|source| ScrapeError::Http {
        url: url.clone(),
        source,
    })?;

    let user = envelope
        .graphql
        .and_then(|graphql| graphql.user)
        .or(envelope.profile)
        .ok_or_else(|| ScrapeError::Endpoint {
            url: url.clone(),
            message: "response has no user object".to_string(),
        })?;

    Ok(map_user(user, max_items))
}

fn map_user(user: UserNode, max_items: usize) -> PublicProfile {
    let counters = ProfileCounters {
        followers: user.edge_followed_by.count,
        following: user.edge_follow.count,
        posts: user.edge_owner_to_timeline_media.count,
        likes: 0,
    };

    let limit = if max_items == 0 { usize::MAX } else { max_items };
    let records = user
        .edge_owner_to_timeline_media
        .edges
        .into_iter()
        .take(limit)
        .enumerate()
        .map(|(position, edge)| {
            let mut fields = BTreeMap::new();
            fields.insert(
                "likes".to_string(),
                FieldValue::Count(edge.node.edge_liked_by.count),
            );
            fields.insert(
                "comments".to_string(),
                FieldValue::Count(edge.node.edge_media_to_comment.count),
            );
            let link = edge
                .node
                .shortcode
                .map(|code| format!("/p/{}/", code))
                .unwrap_or_default();
            fields.insert("link".to_string(), FieldValue::Text(link));
            ExtractionRecord {
                index: position + 1,
                partial: false,
                fields,
            }
        })
        .collect();

    PublicProfile { counters, records }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_graphql_user() {
        let envelope: Envelope = serde_json::from_str(
            r#"{"graphql":{"user":{
                "edge_followed_by":{"count":2000},
                "edge_follow":{"count":150},
                "edge_owner_to_timeline_media":{"count":40,"edges":[
                    {"node":{"shortcode":"A1","edge_liked_by":{"count":120},"edge_media_to_comment":{"count":8}}},
                    {"node":{"edge_liked_by":{"count":80}}}
                ]}
            }}}"#,
        )
        .unwrap();

        let profile = map_user(envelope.graphql.unwrap().user.unwrap(), 0);
        assert_eq!(profile.counters.followers, 2000);
        assert_eq!(profile.counters.following, 150);
        assert_eq!(profile.counters.posts, 40);
        assert_eq!(profile.records.len(), 2);
        assert_eq!(profile.records[0].count("likes"), 120);
        assert_eq!(profile.records[0].text("link"), "/p/A1/");
        assert_eq!(profile.records[1].index, 2);
        assert_eq!(profile.records[1].count("comments"), 0);
    }

    #[test]
    fn test_map_respects_max_items() {
        let envelope: Envelope = serde_json::from_str(
            r#"{"profile":{"edge_owner_to_timeline_media":{"edges":[
                {"node":{}},{"node":{}},{"node":{}}
            ]}}}"#,
        )
        .unwrap();
        let profile = map_user(envelope.profile.unwrap(), 2);
        assert_eq!(profile.records.len(), 2);
        assert_eq!(profile.counters.followers, 0);
    }
}
