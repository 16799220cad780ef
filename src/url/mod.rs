//! URL handling module for Tidemark
//!
//! This module builds navigation URLs for targets, normalizes post URLs, and
//! derives the origin key used by the rate limiter.

mod normalize;
mod origin;

use crate::platform::Platform;
use crate::{UrlError, UrlResult};
use url::Url;

// Re-export main functions
pub use normalize::normalize_target_url;
pub use origin::extract_origin;

/// Builds the profile page URL for a username on a platform
///
/// # Examples
///
/// ```
/// use tidemark::platform::Platform;
/// use tidemark::url::profile_url;
///
/// let url = profile_url(Platform::TikTok, "creator").unwrap();
/// assert_eq!(url.as_str(), "https://www.tiktok.com/@creator");
///
/// let url = profile_url(Platform::Instagram, "creator").unwrap();
/// assert_eq!(url.as_str(), "https://www.instagram.com/creator/");
/// ```
pub fn profile_url(platform: Platform, username: &str) -> UrlResult<Url> {
    validate_username(username)?;
    let name = username.strip_prefix('@').unwrap_or(username);
    let raw = match platform {
        Platform::Instagram => format!("{}/{}/", platform.base_url(), name),
        Platform::TikTok => format!("{}/@{}", platform.base_url(), name),
    };
    Url::parse(&raw).map_err(|e| UrlError::Parse(e.to_string()))
}

/// Resolves a possibly relative post link into an absolute, normalized URL
///
/// Post grids link to posts with site-relative hrefs such as `/p/ABC123/`;
/// those are joined onto the platform's base URL.
pub fn resolve_post_url(platform: Platform, raw: &str) -> UrlResult<Url> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(UrlError::Parse("empty post url".to_string()));
    }

    if raw.starts_with('/') {
        normalize_target_url(&format!("{}{}", platform.base_url(), raw))
    } else {
        normalize_target_url(raw)
    }
}

/// Validates an account name: non-empty, letters, digits, `.` and `_` only
pub fn validate_username(username: &str) -> UrlResult<()> {
    let name = username.strip_prefix('@').unwrap_or(username);
    if name.is_empty()
        || !name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '_')
    {
        return Err(UrlError::InvalidUsername(username.to_string()));
    }
    Ok(())
}
