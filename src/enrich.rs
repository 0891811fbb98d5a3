use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::capture::DetailPage;
use crate::parser::links::strip_tracking;
use crate::parser::{numeral, split_lines, truncate_chars};
use crate::records::{Extracted, PostRecord};

static BODY_DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d{4}[-/.]\d{1,2}[-/.]\d{1,2}").unwrap());
static BODY_LIKE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+(?:\.\d+)?万?)\s*(?:赞|点赞)").unwrap());

const CONTENT_MAX_CHARS: usize = 800;

fn non_blank(s: &Option<String>) -> Option<&str> {
    s.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Fill the card's empty fields from its detail page. Returns the names of
/// the fields that were filled; populated fields are never touched.
pub fn enrich_post(post: &mut PostRecord, page: &DetailPage) -> Vec<&'static str> {
    let mut filled = Vec::new();
    let body = page.body_text.as_deref().unwrap_or("");

    if post.content.is_none() {
        post.content = non_blank(&page.meta_description)
            .or_else(|| split_lines(body).into_iter().next())
            .map(|c| truncate_chars(c, CONTENT_MAX_CHARS));
        if post.content.is_some() {
            filled.push("content");
        }
    }

    if post.publish_time.is_none() {
        post.publish_time = non_blank(&page.updated_time)
            .map(str::to_string)
            .or_else(|| BODY_DATE_RE.find(body).map(|m| m.as_str().to_string()));
        if post.publish_time.is_some() {
            filled.push("publish_time");
        }
    }

    if post.like_count.is_none() {
        if let Some(caps) = BODY_LIKE_RE.captures(body) {
            let text = caps[1].to_string();
            if let Some(count) = numeral::normalize(&text) {
                post.like_count = Some(count);
                filled.push("like_count");
                if post.like_text.is_none() {
                    post.like_text = Some(text);
                    filled.push("like_text");
                }
            }
        }
    }

    filled
}

/// Enrich the first `limit` records that have a captured detail page.
/// Records are looked up by URL with the tracking suffix stripped.
pub fn enrich_posts(
    records: &mut [Extracted<PostRecord>],
    details: &BTreeMap<String, DetailPage>,
    limit: usize,
) -> usize {
    let mut enriched = 0;
    for record in records.iter_mut().take(limit) {
        let Some(url) = record.value.url.as_deref() else {
            continue;
        };
        let Some(page) = details.get(strip_tracking(url)) else {
            debug!("No detail page captured for {}", url);
            continue;
        };
        let filled = enrich_post(&mut record.value, page);
        if !filled.is_empty() {
            record.misses.retain(|m| !filled.contains(&m.field));
            enriched += 1;
        }
    }
    enriched
}
