use crate::UrlError;
use url::Url;

/// Query parameters that only carry share/tracking state
const TRACKING_PARAMS: &[&str] = &[
    "igsh",
    "igshid",
    "img_index",
    "is_from_webapp",
    "sender_device",
    "fbclid",
    "gclid",
    "ref",
];

/// Normalizes a target URL before navigation
///
/// # Normalization Steps
///
/// 1. Parse the URL; reject if malformed
/// 2. Accept only http and https
/// 3. Require a host
/// 4. Remove the fragment
/// 5. Remove share/tracking query parameters (`utm_*`, `igsh`, ...)
/// 6. Remove an empty query string
///
/// The path is left untouched: platforms distinguish `/p/ID/` from `/p/ID`.
///
/// # Examples
///
/// ```
/// use tidemark::url::normalize_target_url;
///
/// let url = normalize_target_url("https://www.instagram.com/p/ABC/?utm_source=ig_web#c").unwrap();
/// assert_eq!(url.as_str(), "https://www.instagram.com/p/ABC/");
/// ```
pub fn normalize_target_url(url_str: &str) -> Result<Url, UrlError> {
    let mut url = Url::parse(url_str.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    if url.host_str().is_none() {
        return Err(UrlError::MissingHost);
    }

    url.set_fragment(None);

    if url.query().is_some() {
        let kept: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(key, _)| !is_tracking_param(key))
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();

        if kept.is_empty() {
            url.set_query(None);
        } else {
            url.query_pairs_mut().clear().extend_pairs(kept);
        }
    }

    Ok(url)
}

/// Checks if a query parameter is a tracking parameter
fn is_tracking_param(key: &str) -> bool {
    TRACKING_PARAMS.contains(&key) || key.starts_with("utm_")
}
