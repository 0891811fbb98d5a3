use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use super::card::{find_link, read_cover};
use super::links::{looks_like_note_url, looks_like_profile_url};
use super::{numeral, split_lines, time, truncate_chars};
use crate::capture::{ContainerSource, RawContainer, SelectorTier};
use crate::config::PipelineConfig;
use crate::dedup::dedup_keep_order;
use crate::error::CaptureError;
use crate::records::{UserCandidate, UserPost};

static FANS_BEFORE_LABEL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([0-9]+(?:\.[0-9]+)?\s*[万千]?)[^\n]{0,6}粉丝").unwrap());
static FANS_AFTER_LABEL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"粉丝\s*([0-9]+(?:\.[0-9]+)?\s*[万千]?)").unwrap());
static LIKE_WITH_LABEL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([0-9]+(?:\.[0-9]+)?\s*[万千]?)\s*赞").unwrap());
static NUMBER_TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[0-9]+(?:\.[0-9]+)?\s*[万千]?").unwrap());

const USERNAME_MAX_CHARS: usize = 50;
const POST_TITLE_MAX_CHARS: usize = 120;
/// Anchor blocks shorter than this are re-read from a wider ancestor.
const MIN_CARD_TEXT_CHARS: usize = 10;

// Account-id lines carry long digit runs that would otherwise read as fan counts.
const ID_LINE_LABELS: &[&str] = &["小红书号", "小红书ID", "小红书id"];

/// Fan count text near a "粉丝" label. On account-id lines only a count
/// written after the label is accepted.
pub fn find_fans_text(text: &str) -> Option<String> {
    split_lines(text).into_iter().find_map(|line| {
        let caps = if ID_LINE_LABELS.iter().any(|l| line.contains(l)) {
            FANS_AFTER_LABEL_RE.captures(line)
        } else {
            FANS_BEFORE_LABEL_RE
                .captures(line)
                .or_else(|| FANS_AFTER_LABEL_RE.captures(line))
        };
        caps.map(|c| c[1].trim().to_string())
    })
}

pub fn extract_candidate<C: RawContainer>(
    container: &C,
    query: &str,
    config: &PipelineConfig,
) -> Option<UserCandidate> {
    let profile_url = match find_link(container, looks_like_profile_url) {
        Ok(Some(url)) => url,
        Ok(None) => return None,
        Err(e) => {
            debug!("Skipping user card without readable links: {}", e);
            return None;
        }
    };
    let text = match container.text() {
        Ok(t) => t.trim().to_string(),
        Err(e) => {
            debug!("Skipping unreadable user card: {}", e);
            return None;
        }
    };

    let username = split_lines(&text)
        .first()
        .map(|l| truncate_chars(l, USERNAME_MAX_CHARS));
    let fans_text = find_fans_text(&text);
    let fans_count = fans_text.as_deref().and_then(numeral::normalize);

    Some(UserCandidate {
        query: query.to_string(),
        username,
        profile_url: Some(profile_url),
        fans_text,
        fans_count,
        matched_by: None,
        raw_text: (!text.is_empty()).then(|| truncate_chars(&text, config.raw_text_limit)),
    })
}

/// User cards from one search-results step, deduplicated by profile URL.
pub fn extract_candidates<S: ContainerSource>(
    source: &S,
    query: &str,
    config: &PipelineConfig,
) -> Result<Vec<UserCandidate>, CaptureError> {
    let containers = source.list_candidate_containers(SelectorTier::Anchor)?;
    let hits = containers
        .iter()
        .take(config.max_anchors)
        .filter_map(|c| extract_candidate(c, query, config));
    Ok(dedup_keep_order(hits))
}

/// Likes on a profile-feed card: a number labelled "赞" if present,
/// otherwise the last number on the card.
pub fn like_from_card_text(text: &str) -> (Option<String>, Option<u64>) {
    let like_text = LIKE_WITH_LABEL_RE
        .captures(text)
        .map(|c| c[1].trim().to_string())
        .or_else(|| {
            NUMBER_TOKEN_RE
                .find_iter(text)
                .last()
                .map(|m| m.as_str().trim().to_string())
        });
    let like_count = like_text.as_deref().and_then(numeral::normalize);
    (like_text, like_count)
}

fn card_text<C: RawContainer>(container: &C) -> Option<String> {
    let text = container.text().ok().map(|t| t.trim().to_string()).unwrap_or_default();
    if text.chars().count() >= MIN_CARD_TEXT_CHARS {
        return Some(text);
    }
    container
        .expanded_text()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .or((!text.is_empty()).then_some(text))
}

/// One card from the resolved user's own feed.
pub fn extract_user_post<C: RawContainer>(
    container: &C,
    user: &UserCandidate,
    query: &str,
    config: &PipelineConfig,
) -> Option<UserPost> {
    let post_url = find_link(container, looks_like_note_url).ok().flatten()?;
    let text = card_text(container);
    let lines = text.as_deref().map(split_lines).unwrap_or_default();

    // The feed repeats the owner's name on every card; skip it as a title.
    let title = match lines.as_slice() {
        [first, second, ..] if Some(*first) == user.username.as_deref() => Some(*second),
        [first, ..] => Some(*first),
        [] => None,
    }
    .map(|t| truncate_chars(t, POST_TITLE_MAX_CHARS));

    let (like_text, like_count) = text.as_deref().map(like_from_card_text).unwrap_or((None, None));
    let publish_time = lines.iter().rev().find_map(|l| time::classify(l));

    Some(UserPost {
        query: query.to_string(),
        username: user.username.clone(),
        profile_url: user.profile_url.clone(),
        post_url: Some(post_url),
        title,
        cover_url: read_cover(container).ok(),
        like_text,
        like_count,
        publish_time,
        raw_text: text.map(|t| truncate_chars(&t, config.raw_text_limit)),
    })
}

/// Walk profile-feed steps until `posts_per_user` distinct posts are seen.
pub fn collect_user_posts<I, S>(
    steps: I,
    user: &UserCandidate,
    query: &str,
    config: &PipelineConfig,
) -> Result<Vec<UserPost>, CaptureError>
where
    I: IntoIterator<Item = S>,
    S: ContainerSource,
{
    let mut posts: Vec<UserPost> = Vec::new();

    for (round, step) in steps.into_iter().take(config.profile_max_rounds).enumerate() {
        let containers = match step.list_candidate_containers(SelectorTier::Anchor) {
            Ok(c) => c,
            Err(e) if !e.is_fatal() => {
                debug!("Profile step {} unreadable: {}", round + 1, e);
                continue;
            }
            Err(e) => return Err(e),
        };
        let batch = containers
            .iter()
            .filter_map(|c| extract_user_post(c, user, query, config));
        posts = dedup_keep_order(posts.into_iter().chain(batch));
        if posts.len() >= config.posts_per_user {
            break;
        }
    }

    posts.truncate(config.posts_per_user);
    Ok(posts)
}
