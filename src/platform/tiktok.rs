use super::{login_wall_signals, Preset, NUMBER_CAPTURE};
use crate::extract::{FieldSchema, FieldSpec, Locator, SchemaError, Selector};
use crate::metrics::MetricsConfig;
use crate::paginate::{ScrollAction, Signature};

const VIDEO_ITEMS: &str = r#"[data-e2e="user-post-item"]"#;
const COMMENT_ITEMS: &str = r#"[data-e2e="comment-level-1"]"#;

fn e2e(id: &str) -> Locator {
    Locator::css(&format!(r#"[data-e2e="{}"]"#, id))
}

pub(super) fn profile_preset() -> Result<Preset, SchemaError> {
    let header_schema = FieldSchema::new(vec![
        FieldSpec::text("name", vec![e2e("user-title"), Locator::css("h1")]),
        FieldSpec::text("subtitle", vec![e2e("user-subtitle")]).optional(),
        FieldSpec::text("bio", vec![e2e("user-bio")]).optional(),
        FieldSpec::count(
            "followers",
            vec![
                e2e("followers-count"),
                Locator::css(r#"div[class*="tiktok-"] strong[title="Followers"]"#),
            ],
        ),
        FieldSpec::count(
            "following",
            vec![
                e2e("following-count"),
                Locator::css(r#"div[class*="tiktok-"] strong[title="Following"]"#),
            ],
        ),
        FieldSpec::count(
            "likes",
            vec![
                e2e("likes-count"),
                Locator::css(r#"div[class*="tiktok-"] strong[title="Likes"]"#),
            ],
        ),
        FieldSpec::flag(
            "verified",
            vec![e2e("user-verified-badge"), Locator::css(r#"[class*="VerifyBadge"]"#)],
        ),
    ])?;

    let item_schema = FieldSchema::new(vec![
        FieldSpec::count(
            "views",
            vec![e2e("video-views"), Locator::css("strong").capture(NUMBER_CAPTURE)?],
        ),
        FieldSpec::text(
            "link",
            vec![Locator::attr(Selector::css(r#"a[href*="/video/"]"#), "href")],
        )
        .optional(),
        FieldSpec::flag("pinned", vec![e2e("video-card-badge")]),
    ])?;

    Ok(Preset {
        header_schema,
        item_selectors: vec![
            Selector::css(VIDEO_ITEMS),
            Selector::css(r#"div[class*="DivItemContainer"]"#),
        ],
        item_schema,
        scroll_container: vec![],
        signature: Signature::ScrollHeight,
        action: ScrollAction::ToEnd,
        block_signals: login_wall_signals(),
        metrics: MetricsConfig {
            engagement_fields: vec![],
            dispersion_field: Some("views".to_string()),
            reach_field: Some("views".to_string()),
            ..MetricsConfig::default()
        },
    })
}

pub(super) fn post_preset() -> Result<Preset, SchemaError> {
    let header_schema = FieldSchema::new(vec![
        FieldSpec::count("likes", vec![e2e("like-count"), e2e("browse-like-count")]),
        FieldSpec::count("comments", vec![e2e("comment-count"), e2e("browse-comment-count")])
            .optional(),
        FieldSpec::count("shares", vec![e2e("share-count")]).optional(),
        FieldSpec::text("author", vec![e2e("browse-username"), e2e("video-author-uniqueid")])
            .optional(),
    ])?;

    let item_schema = FieldSchema::new(vec![
        FieldSpec::text("username", vec![e2e("comment-username-1")]),
        FieldSpec::text(
            "text",
            vec![e2e("comment-level-1"), Locator::text(Selector::Scope)],
        ),
        FieldSpec::count("likes", vec![e2e("comment-like-count")]).optional(),
    ])?;

    let comments = Selector::css(r#"div[class*="DivCommentItemContainer"]"#);
    Ok(Preset {
        header_schema,
        item_selectors: vec![
            comments.clone(),
            Selector::css(r#"div[class*="DivCommentContentContainer"]"#),
            Selector::css(COMMENT_ITEMS),
        ],
        item_schema,
        scroll_container: vec![Selector::css(r#"div[class*="DivCommentListContainer"]"#)],
        signature: Signature::ItemCount(comments.clone()),
        action: ScrollAction::LastItemIntoView(comments),
        block_signals: login_wall_signals(),
        metrics: MetricsConfig {
            engagement_fields: vec!["likes".to_string()],
            dispersion_field: Some("likes".to_string()),
            ..MetricsConfig::default()
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::{Browser, Scope, SnapshotPage};
    use crate::extract::{ItemExtractor, SelectorResolver};
    use std::time::Duration;

    const URL: &str = "https://www.tiktok.com/@someone";

    #[tokio::test]
    async fn test_profile_page() {
        let html = r#"<html><body>
            <h1 data-e2e="user-title">someone</h1>
            <h2 data-e2e="user-bio">dance and code</h2>
            <strong data-e2e="following-count">120</strong>
            <strong data-e2e="followers-count">45.6K</strong>
            <strong data-e2e="likes-count">1.2M</strong>
            <div data-e2e="user-post-item"><a href="https://www.tiktok.com/@someone/video/1">
              <strong data-e2e="video-views">10.1K</strong></a></div>
            <div data-e2e="user-post-item"><a href="https://www.tiktok.com/@someone/video/2">
              <strong data-e2e="video-views">987</strong></a>
              <div data-e2e="video-card-badge">Pinned</div></div>
            </body></html>"#;
        let mut page = SnapshotPage::new()
            .with_route(URL, vec![html.to_string()])
            .with_time_scale(0.0);
        page.navigate(URL).await.unwrap();

        let preset = profile_preset().unwrap();
        let extractor = ItemExtractor::new(
            SelectorResolver::new(Duration::from_millis(200)),
            Duration::from_millis(800),
        );

        let header = extractor
            .extract_one(&page, &Scope::Document, &preset.header_schema)
            .await;
        assert_eq!(header.text("name"), "someone");
        assert_eq!(header.count("followers"), 45_600);
        assert_eq!(header.count("likes"), 1_200_000);
        assert!(!header.flag("verified"));
        assert!(!header.partial);

        let videos = extractor
            .extract_all(&mut page, &Scope::Document, &preset.item_selectors, &preset.item_schema, 0)
            .await;
        assert_eq!(videos.len(), 2);
        assert_eq!(videos[0].count("views"), 10_100);
        assert!(videos[0].text("link").ends_with("/video/1"));
        assert!(!videos[0].flag("pinned"));
        assert!(videos[1].flag("pinned"));
    }

    #[tokio::test]
    async fn test_bare_comment_text_items() {
        let url = "https://www.tiktok.com/@someone/video/42";
        let html = r#"<html><body>
            <p data-e2e="comment-level-1">first!</p>
            <p data-e2e="comment-level-1">love this</p>
            </body></html>"#;
        let mut page = SnapshotPage::new()
            .with_route(url, vec![html.to_string()])
            .with_time_scale(0.0);
        page.navigate(url).await.unwrap();

        let preset = post_preset().unwrap();
        let extractor = ItemExtractor::new(
            SelectorResolver::new(Duration::from_millis(200)),
            Duration::from_millis(800),
        );
        let comments = extractor
            .extract_all(&mut page, &Scope::Document, &preset.item_selectors, &preset.item_schema, 0)
            .await;

        assert_eq!(comments.len(), 2);
        assert_eq!(comments[0].text("text"), "first!");
        assert_eq!(comments[1].text("text"), "love this");
        // The author sits outside the text element
        assert!(comments[0].partial);
    }
}
