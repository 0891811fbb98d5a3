use std::sync::LazyLock;

use regex::Regex;

pub const BASE_URL: &str = "https://www.xiaohongshu.com";

static NOTE_URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https?://(?:www\.)?xiaohongshu\.com/(?:explore|discovery/item)/[0-9a-fA-F]{10,}")
        .unwrap()
});

/// Resolve protocol-relative and site-relative hrefs to absolute URLs.
pub fn normalize_href(href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }
    if let Some(rest) = href.strip_prefix("//") {
        return Some(format!("https://{}", rest));
    }
    if href.starts_with('/') {
        return Some(format!("{}{}", BASE_URL, href));
    }
    Some(href.to_string())
}

/// Drop everything from the first `?`; tracking tokens make one note show up
/// under many URLs.
pub fn strip_tracking(url: &str) -> &str {
    url.split('?').next().unwrap_or(url)
}

/// Note detail links only. Channel tabs (`/explore?channel_id=…`) and other
/// navigation entries never carry the hex note id segment.
pub fn looks_like_note_url(url: &str) -> bool {
    NOTE_URL_RE.is_match(url)
}

pub fn looks_like_profile_url(url: &str) -> bool {
    url.contains("/user/profile/")
}
