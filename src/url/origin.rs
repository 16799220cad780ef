use url::Url;

/// Extracts the rate-limiting origin from a URL
///
/// The origin is the lowercase host with any `www.` prefix removed, so that
/// `https://www.instagram.com/p/1` and `https://instagram.com/x` share one
/// budget. Returns None if the URL has no host.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use tidemark::url::extract_origin;
///
/// let url = Url::parse("https://www.Instagram.com/p/abc/").unwrap();
/// assert_eq!(extract_origin(&url), Some("instagram.com".to_string()));
/// ```
pub fn extract_origin(url: &Url) -> Option<String> {
    url.host_str().map(|h| {
        let host = h.to_lowercase();
        match host.strip_prefix("www.") {
            Some(rest) => rest.to_string(),
            None => host,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_simple_origin() {
        let url = Url::parse("https://tiktok.com/@user").unwrap();
        assert_eq!(extract_origin(&url), Some("tiktok.com".to_string()));
    }

    #[test]
    fn test_www_prefix_removed() {
        let url = Url::parse("https://www.tiktok.com/@user").unwrap();
        assert_eq!(extract_origin(&url), Some("tiktok.com".to_string()));
    }

    #[test]
    fn test_subdomain_kept() {
        let url = Url::parse("https://m.tiktok.com/@user").unwrap();
        assert_eq!(extract_origin(&url), Some("m.tiktok.com".to_string()));
    }

    #[test]
    fn test_port_ignored() {
        let url = Url::parse("http://127.0.0.1:8080/x").unwrap();
        assert_eq!(extract_origin(&url), Some("127.0.0.1".to_string()));
    }

    #[test]
    fn test_no_host() {
        let url = Url::parse("data:text/plain,hello").unwrap();
        assert_eq!(extract_origin(&url), None);
    }
}
