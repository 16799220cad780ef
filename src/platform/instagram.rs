use super::{login_wall_signals, Preset, NUMBER_CAPTURE};
use crate::extract::{FieldSchema, FieldSpec, Locator, SchemaError, Selector};
use crate::metrics::MetricsConfig;
use crate::paginate::{ScrollAction, Signature};

const OG_DESCRIPTION: &str = r#"meta[property="og:description"]"#;
/// First 100 characters of a caption
const CAPTION_CAPTURE: &str = r"(?s)^\s*(.{1,100})";
const POST_LINKS: &str = r#"article a[href*="/p/"]"#;
/// Top-level comment blocks only; a reply's inner container is one level deeper
const COMMENTS: &str = r#"article div[role="presentation"] > div > div[class*="x1iyjqo2"]"#;

/// Counter from the `og:description` meta, e.g. "1,234 Followers, 56 Following, 17 Posts"
fn og_counter(label: &str) -> Result<Locator, SchemaError> {
    Locator::attr(Selector::css(OG_DESCRIPTION), "content")
        .capture(&format!(r"(\d[\d.,]*[KMB]?)\s*{}", label))
}

/// Counter from the n-th header stat list item
fn header_stat(position: usize) -> Result<Locator, SchemaError> {
    Locator::css(&format!("header section ul li:nth-child({})", position)).capture(NUMBER_CAPTURE)
}

pub(super) fn profile_preset() -> Result<Preset, SchemaError> {
    let header_schema = FieldSchema::new(vec![
        FieldSpec::text(
            "name",
            vec![
                Locator::attr(Selector::css(r#"meta[property="og:title"]"#), "content")
                    .capture(r"^(.*?)\s*[(•@]")?,
                Locator::css("header section h2"),
                Locator::css("header h1"),
            ],
        )
        .optional(),
        FieldSpec::count("followers", vec![og_counter("Followers")?, header_stat(2)?]),
        FieldSpec::count("following", vec![og_counter("Following")?, header_stat(3)?]),
        FieldSpec::count("posts", vec![og_counter("Posts")?, header_stat(1)?]),
    ])?;

    let item_schema = FieldSchema::new(vec![
        // Grid items are usually the post anchors themselves
        FieldSpec::text(
            "link",
            vec![
                Locator::attr(Selector::Scope, "href"),
                Locator::attr(Selector::css(r#"a[href*="/p/"]"#), "href"),
            ],
        ),
        // Grid overlays are only rendered for some layouts
        FieldSpec::count(
            "likes",
            vec![
                Locator::css("ul li:nth-child(1) span").capture(NUMBER_CAPTURE)?,
                Locator::attr(Selector::css(r#"[aria-label*="like"]"#), "aria-label")
                    .capture(NUMBER_CAPTURE)?,
            ],
        )
        .optional(),
        FieldSpec::count(
            "comments",
            vec![
                Locator::css("ul li:nth-child(2) span").capture(NUMBER_CAPTURE)?,
                Locator::attr(Selector::css(r#"[aria-label*="comment"]"#), "aria-label")
                    .capture(NUMBER_CAPTURE)?,
            ],
        )
        .optional(),
        FieldSpec::text(
            "caption",
            vec![Locator::attr(Selector::css("img[alt]"), "alt").capture(CAPTION_CAPTURE)?],
        )
        .optional(),
        // Only known after visiting the post page
        FieldSpec::text("posted_at", vec![Locator::attr(Selector::css("time"), "datetime")])
            .optional(),
    ])?;

    let items = Selector::css(POST_LINKS);
    Ok(Preset {
        header_schema,
        item_selectors: vec![
            items.clone(),
            Selector::css(r#"main a[href*="/p/"]"#),
            Selector::css(r#"a[href*="/reel/"]"#),
        ],
        item_schema,
        scroll_container: vec![],
        signature: Signature::ItemCount(items),
        action: ScrollAction::ToEnd,
        block_signals: login_wall_signals(),
        metrics: MetricsConfig {
            engagement_fields: vec!["likes".to_string(), "comments".to_string()],
            dispersion_field: Some("likes".to_string()),
            ..MetricsConfig::default()
        },
    })
}

pub(super) fn post_preset() -> Result<Preset, SchemaError> {
    let header_schema = FieldSchema::new(vec![
        FieldSpec::count(
            "likes",
            vec![
                Locator::css(r#"section span[class*="xdj266r"]"#).capture(NUMBER_CAPTURE)?,
                Locator::css("section button span").capture(NUMBER_CAPTURE)?,
                Locator::css(r#"a[href*="/liked_by/"] span"#).capture(NUMBER_CAPTURE)?,
            ],
        ),
        FieldSpec::count(
            "comments",
            vec![Locator::text(Selector::Text {
                contains: "comment".to_string(),
                within: Some("span".to_string()),
            })
            .capture(NUMBER_CAPTURE)?],
        )
        .optional(),
        FieldSpec::text(
            "author",
            vec![
                Locator::css("article header a[href]"),
                Locator::css("header a[role='link']"),
            ],
        )
        .optional(),
        FieldSpec::text(
            "posted_at",
            vec![Locator::attr(Selector::css("time"), "datetime")],
        )
        .optional(),
        FieldSpec::text(
            "caption",
            vec![
                Locator::css("article h1").capture(CAPTION_CAPTURE)?,
                Locator::css("h1").capture(CAPTION_CAPTURE)?,
            ],
        )
        .optional(),
    ])?;

    let item_schema = FieldSchema::new(vec![
        FieldSpec::text(
            "username",
            vec![
                Locator::attr(Selector::css("a[title]"), "title"),
                Locator::css(r#"h3 a[href^="/"]"#),
            ],
        ),
        FieldSpec::text(
            "text",
            vec![Locator::css("span[style]"), Locator::css(r#"span[dir="auto"]"#)],
        ),
        FieldSpec::count(
            "likes",
            vec![Locator::css(r#"span[aria-label*="like"]"#).capture(NUMBER_CAPTURE)?],
        )
        .optional(),
        FieldSpec::text(
            "timestamp",
            vec![Locator::attr(Selector::css("time"), "datetime")],
        )
        .optional(),
        FieldSpec::flag(
            "is_reply",
            vec![Locator::css(r#"div[class*="xh8yej3"]"#)],
        ),
    ])?;

    let comments = Selector::css(COMMENTS);
    Ok(Preset {
        header_schema,
        item_selectors: vec![
            comments.clone(),
            Selector::css(r#"ul ul li[role="menuitem"]"#),
            Selector::css(r#"ul li[role="menuitem"]"#),
        ],
        item_schema,
        scroll_container: vec![
            Selector::css(r#"article div[role="presentation"] > div"#),
            Selector::css("article ul"),
        ],
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

    const URL: &str = "https://www.instagram.com/someone/";

    fn extractor() -> ItemExtractor {
        ItemExtractor::new(
            SelectorResolver::new(Duration::from_millis(200)),
            Duration::from_millis(800),
        )
    }

    #[tokio::test]
    async fn test_profile_header_from_meta() {
        let html = r#"<html><head>
            <meta property="og:title" content="Some One (@someone) • Instagram photos and videos">
            <meta property="og:description" content="12.5K Followers, 301 Following, 48 Posts - See Instagram photos">
            </head><body></body></html>"#;
        let mut page = SnapshotPage::new()
            .with_route(URL, vec![html.to_string()])
            .with_time_scale(0.0);
        page.navigate(URL).await.unwrap();

        let preset = profile_preset().unwrap();
        let record = extractor()
            .extract_one(&page, &Scope::Document, &preset.header_schema)
            .await;
        assert_eq!(record.text("name"), "Some One");
        assert_eq!(record.count("followers"), 12_500);
        assert_eq!(record.count("following"), 301);
        assert_eq!(record.count("posts"), 48);
        assert!(!record.partial);
    }

    #[tokio::test]
    async fn test_profile_header_from_stat_list() {
        let html = r#"<html><body><header><section><ul>
            <li><span>48</span> posts</li>
            <li><span>1.2M</span> followers</li>
            <li><span>10</span> following</li>
            </ul></section></header></body></html>"#;
        let mut page = SnapshotPage::new()
            .with_route(URL, vec![html.to_string()])
            .with_time_scale(0.0);
        page.navigate(URL).await.unwrap();

        let preset = profile_preset().unwrap();
        let record = extractor()
            .extract_one(&page, &Scope::Document, &preset.header_schema)
            .await;
        assert_eq!(record.count("followers"), 1_200_000);
        assert_eq!(record.count("following"), 10);
        assert_eq!(record.count("posts"), 48);
    }

    #[tokio::test]
    async fn test_post_comments() {
        let url = "https://www.instagram.com/p/ABC123/";
        let html = r#"<html><body><article>
            <section><span class="x1 xdj266r">1,024 likes</span></section>
            <div role="presentation"><div>
              <div class="x1iyjqo2"><a title="alice" href="/alice/">alice</a>
                <span style="line-height: 18px">great shot</span>
                <span aria-label="3 likes">3 likes</span>
                <time datetime="2024-05-01T10:00:00.000Z">1w</time></div>
              <div class="x1iyjqo2"><div class="x1iyjqo2 xh8yej3"><a title="bob" href="/bob/">bob</a>
                <span style="line-height: 18px">agreed</span></div></div>
            </div></div>
            </article></body></html>"#;
        let mut page = SnapshotPage::new()
            .with_route(url, vec![html.to_string()])
            .with_time_scale(0.0);
        page.navigate(url).await.unwrap();

        let preset = post_preset().unwrap();
        let extractor = extractor();
        let header = extractor
            .extract_one(&page, &Scope::Document, &preset.header_schema)
            .await;
        assert_eq!(header.count("likes"), 1024);

        let records = extractor
            .extract_all(
                &mut page,
                &Scope::Document,
                &preset.item_selectors,
                &preset.item_schema,
                0,
            )
            .await;
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].text("username"), "alice");
        assert_eq!(records[0].text("text"), "great shot");
        assert_eq!(records[0].count("likes"), 3);
        assert_eq!(records[0].text("timestamp"), "2024-05-01T10:00:00.000Z");
        assert!(!records[0].flag("is_reply"));
        assert_eq!(records[1].text("username"), "bob");
        assert!(records[1].flag("is_reply"));
    }

    #[tokio::test]
    async fn test_profile_grid_items() {
        let html = r#"<html><body><main><article>
            <div class="row">
              <a href="/p/AAA/"><div><img alt="Sunset over the bay"></div>
                <ul><li><span>1,024</span></li><li><span>31</span></li></ul></a>
              <a href="/p/BBB/"><div><img alt="Second post"></div>
                <ul><li><span>2K</span></li><li><span>7</span></li></ul></a>
            </div>
            </article></main></body></html>"#;
        let mut page = SnapshotPage::new()
            .with_route(URL, vec![html.to_string()])
            .with_time_scale(0.0);
        page.navigate(URL).await.unwrap();

        let preset = profile_preset().unwrap();
        let records = extractor()
            .extract_all(
                &mut page,
                &Scope::Document,
                &preset.item_selectors,
                &preset.item_schema,
                0,
            )
            .await;

        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|record| !record.partial));
        assert_eq!(records[0].text("link"), "/p/AAA/");
        assert_eq!(records[0].count("likes"), 1024);
        assert_eq!(records[0].count("comments"), 31);
        assert_eq!(records[0].text("caption"), "Sunset over the bay");
        assert_eq!(records[1].text("link"), "/p/BBB/");
        assert_eq!(records[1].count("likes"), 2000);
    }

    #[tokio::test]
    async fn test_post_header_caption_is_truncated() {
        let url = "https://www.instagram.com/p/LONG/";
        let caption = "word ".repeat(40);
        let html = format!(
            r#"<html><body><article><section><span class="xdj266r">12 likes</span></section>
            <h1>{}</h1></article></body></html>"#,
            caption
        );
        let mut page = SnapshotPage::new()
            .with_route(url, vec![html])
            .with_time_scale(0.0);
        page.navigate(url).await.unwrap();

        let preset = post_preset().unwrap();
        let header = extractor()
            .extract_one(&page, &Scope::Document, &preset.header_schema)
            .await;
        assert_eq!(header.count("likes"), 12);
        assert_eq!(header.text("caption").chars().count(), 99);
        assert!(header.text("caption").starts_with("word word"));
    }
}
