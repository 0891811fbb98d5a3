use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use super::links::{looks_like_note_url, normalize_href};
use super::{numeral, split_lines, time, truncate_chars};
use crate::capture::{CardField, RawContainer, SelectorTier};
use crate::config::PipelineConfig;
use crate::error::CaptureError;
use crate::records::{Confidence, Extracted, FieldMiss, MissReason, PostRecord};

static LIKE_LINE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:[0-9]+(?:\.[0-9]+)?[万千]?\+?|赞)$").unwrap());
static BACKGROUND_URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"background(?:-image)?\s*:[^;]*url\(\s*['"]?([^'")\s]+)['"]?\s*\)"#).unwrap()
});

/// Login walls, legal footers and navigation chrome that share the note
/// link selectors with real cards.
const DENYLIST: &[&str] = &[
    "手机号登录",
    "扫码",
    "登录后推荐",
    "用户协议",
    "隐私政策",
    "重新发送",
    "沪ICP备",
    "行吟信息科技",
    "增值电信业务",
    "创作中心",
    "业务合作",
    "个性化推荐算法",
];

pub fn is_denylisted(text: &str) -> bool {
    DENYLIST.iter().any(|phrase| text.contains(phrase))
}

/// Fields read off a card's line layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineLayout {
    pub title: Option<String>,
    pub author: Option<String>,
    pub like_text: Option<String>,
    pub publish_time: Option<String>,
    pub confidence: Confidence,
    pub misses: Vec<FieldMiss>,
}

impl LineLayout {
    fn has(&self, field: &str) -> bool {
        match field {
            "title" => self.title.is_some(),
            "author" => self.author.is_some(),
            "like_text" => self.like_text.is_some(),
            "publish_time" => self.publish_time.is_some(),
            _ => false,
        }
    }
}

/// Positional heuristic: cards render content, then author, then the
/// time/engagement row, so fields are located relative to the last time line.
///
/// When several lines look like times the last one wins; a title containing a
/// date can therefore be misread as the time row.
pub fn read_layout(lines: &[&str], like_max_chars: usize) -> LineLayout {
    let mut misses = Vec::new();

    let time_idx = lines.iter().rposition(|l| time::looks_like_time(l));
    let publish_time = time_idx.and_then(|t| time::classify(lines[t]));

    let like_idx = lines
        .iter()
        .enumerate()
        .rev()
        .find(|(i, l)| Some(*i) != time_idx && is_like_line(l, like_max_chars))
        .map(|(i, _)| i);
    let like_text = like_idx.map(|i| lines[i].to_string());

    let (title, author, confidence) = match time_idx {
        Some(0) => (None, None, Confidence::Medium),
        Some(t) => {
            let candidate = lines[t - 1];
            if time::looks_like_time(candidate) {
                misses.push(FieldMiss::new("author", MissReason::AuthorLooksLikeTime));
                (None, None, Confidence::Medium)
            } else {
                let title = (t > 1).then(|| lines[..t - 1].join(" "));
                (title, Some(candidate.to_string()), Confidence::Medium)
            }
        }
        None => {
            misses.push(FieldMiss::new("publish_time", MissReason::NoTimeLine));
            match lines.len() {
                0 => (None, None, Confidence::Low),
                1 if like_idx != Some(0) => (Some(lines[0].to_string()), None, Confidence::Low),
                1 => (None, None, Confidence::Low),
                n => {
                    let title = (n > 2).then(|| lines[..n - 2].join(" "));
                    (title, Some(lines[n - 2].to_string()), Confidence::Low)
                }
            }
        }
    };

    if author.is_none() && !misses.iter().any(|m| m.field == "author") {
        misses.push(FieldMiss::new("author", MissReason::NoAuthorLine));
    }
    if title.is_none() {
        misses.push(FieldMiss::new("title", MissReason::NoTitleLines));
    }
    if like_text.is_none() {
        misses.push(FieldMiss::new("like_text", MissReason::NoLikeLine));
    }

    LineLayout {
        title,
        author,
        like_text,
        publish_time,
        confidence,
        misses,
    }
}

fn is_like_line(line: &str, max_chars: usize) -> bool {
    line.chars().count() <= max_chars && LIKE_LINE_RE.is_match(line)
}

/// Class-name lookups take precedence; the positional layout fills the rest.
fn apply_structural_fields<C: RawContainer>(container: &C, layout: &mut LineLayout) {
    let field = |f: CardField| {
        container
            .field_text(f)
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
    };

    let mut found = false;
    if let Some(title) = field(CardField::Title) {
        layout.title = Some(title);
        found = true;
    }
    if let Some(author) = field(CardField::Author) {
        layout.author = Some(author);
        found = true;
    }
    // A like element without a count only fills a gap; it never replaces a
    // parsed positional like line.
    if let Some(like) = field(CardField::Like) {
        if layout.like_text.is_none() || numeral::normalize(&like).is_some() {
            layout.like_text = Some(like);
        }
        found = true;
    }
    if let Some(token) = field(CardField::Time).and_then(|t| time::classify(&t)) {
        layout.publish_time = Some(token);
        found = true;
    }

    if found {
        layout.confidence = Confidence::High;
        let mut misses = std::mem::take(&mut layout.misses);
        misses.retain(|m| !layout.has(m.field));
        layout.misses = misses;
    }
}

/// First href on the container that satisfies `accept`, normalized.
pub fn find_link<C: RawContainer>(
    container: &C,
    accept: fn(&str) -> bool,
) -> Result<Option<String>, CaptureError> {
    let mut hrefs: Vec<String> = container.primary_link().map(|l| l.href).into_iter().collect();
    hrefs.extend(container.links()?.into_iter().map(|l| l.href));
    hrefs.extend(container.attribute("href"));

    Ok(hrefs
        .iter()
        .filter_map(|h| normalize_href(h))
        .find(|url| accept(url)))
}

/// Cover image URL: `src`, then the lazy-load `data-src`, then a CSS
/// background on the cover element. Inline `data:` placeholders never count.
pub fn read_cover<C: RawContainer>(container: &C) -> Result<String, MissReason> {
    let mut saw_inline = false;

    for name in ["src", "data-src"] {
        let Some(value) = container.cover_attribute(name) else {
            continue;
        };
        let value = value.trim();
        if value.starts_with("data:") {
            saw_inline = true;
            continue;
        }
        if let Some(url) = normalize_href(value) {
            return Ok(url);
        }
    }

    if let Some(style) = container.cover_attribute("style") {
        let style = style.replace("&quot;", "\"").replace("&#39;", "'");
        if let Some(caps) = BACKGROUND_URL_RE.captures(&style) {
            let value = caps[1].trim();
            if value.starts_with("data:") {
                saw_inline = true;
            } else if let Some(url) = normalize_href(value) {
                return Ok(url);
            }
        }
    }

    Err(if saw_inline {
        MissReason::InlineDataCover
    } else {
        MissReason::NoCover
    })
}

/// Turn one container into a post card, or `None` when it is not a card.
///
/// Unreadable containers are skipped rather than failing the batch.
pub fn extract_card<C: RawContainer>(
    container: &C,
    keyword: Option<&str>,
    tier: SelectorTier,
    config: &PipelineConfig,
) -> Option<Extracted<PostRecord>> {
    let text = match container.text() {
        Ok(t) => t,
        Err(e) => {
            debug!("Skipping container: {}", e);
            return None;
        }
    };
    if is_denylisted(&text) {
        return None;
    }

    let url = match find_link(container, looks_like_note_url) {
        Ok(Some(url)) => url,
        Ok(None) => return None,
        Err(e) => {
            debug!("Skipping container without readable links: {}", e);
            return None;
        }
    };

    let lines = split_lines(&text);
    let mut layout = read_layout(&lines, config.like_line_max_chars);
    if tier == SelectorTier::Card {
        apply_structural_fields(container, &mut layout);
    }
    let mut misses = layout.misses;

    let like_count = layout.like_text.as_deref().and_then(numeral::normalize);
    if layout.like_text.is_some() && like_count.is_none() {
        misses.push(FieldMiss::new("like_count", MissReason::UnparsableNumeral));
    }

    let cover_url = match read_cover(container) {
        Ok(url) => Some(url),
        Err(reason) => {
            misses.push(FieldMiss::new("cover_url", reason));
            None
        }
    };

    Some(Extracted {
        value: PostRecord {
            keyword: keyword.map(str::to_string),
            url: Some(url),
            title: layout.title,
            content: None,
            author: layout.author,
            cover_url,
            like_text: layout.like_text,
            like_count,
            publish_time: layout.publish_time,
            raw_text: Some(truncate_chars(&text, config.raw_text_limit)),
        },
        confidence: layout.confidence,
        misses,
    })
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::capture::{CapturedContainer, Link};

    const NOTE: &str = "/explore/65a1b2c3d4e5f60718293a4b";

    fn card(text: &str, href: &str) -> CapturedContainer {
        CapturedContainer {
            text: Some(text.to_string()),
            links: vec![Link {
                href: href.to_string(),
                attributes: BTreeMap::new(),
            }],
            ..Default::default()
        }
    }

    fn extract(c: &CapturedContainer, tier: SelectorTier) -> Option<Extracted<PostRecord>> {
        extract_card(c, Some("kw"), tier, &PipelineConfig::default())
    }

    #[test]
    fn author_title_time_from_layout() {
        let c = card("易烊千玺的日常\n易烊千玺\n3天前", NOTE);
        let rec = extract(&c, SelectorTier::Anchor).unwrap();
        assert_eq!(rec.value.author.as_deref(), Some("易烊千玺"));
        assert_eq!(rec.value.title.as_deref(), Some("易烊千玺的日常"));
        assert_eq!(rec.value.publish_time.as_deref(), Some("3天前"));
        assert_eq!(rec.value.keyword.as_deref(), Some("kw"));
        assert_eq!(
            rec.value.url.as_deref(),
            Some("https://www.xiaohongshu.com/explore/65a1b2c3d4e5f60718293a4b")
        );
        assert_eq!(rec.confidence, Confidence::Medium);
    }

    #[test]
    fn like_line_found_past_time_line() {
        let lines = ["武功山两日游", "徒步 攻略", "山野小王", "昨天 10:20", "1.2万"];
        let layout = read_layout(&lines, 12);
        assert_eq!(layout.like_text.as_deref(), Some("1.2万"));
        assert_eq!(layout.author.as_deref(), Some("山野小王"));
        assert_eq!(layout.title.as_deref(), Some("武功山两日游 徒步 攻略"));
        assert_eq!(layout.publish_time.as_deref(), Some("昨天 10:20"));
    }

    #[test]
    fn like_count_parsed() {
        let c = card("标题\n作者\n03-15\n356", NOTE);
        let rec = extract(&c, SelectorTier::Anchor).unwrap();
        assert_eq!(rec.value.like_text.as_deref(), Some("356"));
        assert_eq!(rec.value.like_count, Some(356));
    }

    #[test]
    fn bare_zan_has_no_count() {
        let c = card("标题\n作者\n赞", NOTE);
        let rec = extract(&c, SelectorTier::Anchor).unwrap();
        assert_eq!(rec.value.like_text.as_deref(), Some("赞"));
        assert_eq!(rec.value.like_count, None);
        assert!(rec
            .misses
            .contains(&FieldMiss::new("like_count", MissReason::UnparsableNumeral)));
    }

    #[test]
    fn author_rejected_when_time_like() {
        let layout = read_layout(&["2024-01-02", "3天前"], 12);
        assert_eq!(layout.author, None);
        assert_eq!(layout.title, None);
        assert_eq!(layout.publish_time.as_deref(), Some("3天前"));
        assert!(layout
            .misses
            .contains(&FieldMiss::new("author", MissReason::AuthorLooksLikeTime)));
    }

    #[test]
    fn time_on_first_line_leaves_author_empty() {
        let layout = read_layout(&["5分钟前", "正文"], 12);
        assert_eq!(layout.author, None);
        assert_eq!(layout.publish_time.as_deref(), Some("5分钟前"));
    }

    #[test]
    fn fallback_without_time_line() {
        let layout = read_layout(&["第一行", "第二行", "小红薯", "88"], 12);
        assert_eq!(layout.author.as_deref(), Some("小红薯"));
        assert_eq!(layout.title.as_deref(), Some("第一行 第二行"));
        assert_eq!(layout.publish_time, None);
        assert_eq!(layout.confidence, Confidence::Low);
        assert!(layout
            .misses
            .contains(&FieldMiss::new("publish_time", MissReason::NoTimeLine)));
    }

    #[test]
    fn single_line_becomes_title() {
        let layout = read_layout(&["只有标题"], 12);
        assert_eq!(layout.title.as_deref(), Some("只有标题"));
        assert_eq!(layout.author, None);
    }

    #[test]
    fn long_numeric_line_not_a_like() {
        let layout = read_layout(&["标题", "作者", "1234567890123"], 12);
        assert_eq!(layout.like_text, None);
    }

    #[test]
    fn denylisted_text_skipped() {
        let c = card("手机号登录\n获取验证码\n用户协议", NOTE);
        assert!(extract(&c, SelectorTier::Anchor).is_none());
    }

    #[test]
    fn navigation_link_skipped() {
        let c = card("推荐\n穿搭\n美食", "/explore?channel_id=homefeed_recommend");
        assert!(extract(&c, SelectorTier::Anchor).is_none());
    }

    #[test]
    fn unreadable_container_skipped() {
        let mut c = card("x", NOTE);
        c.text = None;
        assert!(extract(&c, SelectorTier::Anchor).is_none());
    }

    #[test]
    fn href_attribute_used_for_bare_anchor() {
        let mut c = card("标题", NOTE);
        c.links.clear();
        c.attributes.insert("href".into(), NOTE.into());
        assert!(extract(&c, SelectorTier::Anchor).is_some());
    }

    #[test]
    fn second_link_can_qualify() {
        let mut c = card("标题\n作者\n1天前", "/user/profile/5f1e2d3c4b5a69788796a5b4");
        c.links.push(Link {
            href: NOTE.into(),
            attributes: BTreeMap::new(),
        });
        let rec = extract(&c, SelectorTier::Anchor).unwrap();
        assert!(rec.value.url.unwrap().contains("/explore/"));
    }

    #[test]
    fn cover_prefers_src_and_skips_inline_data() {
        let mut c = card("t", NOTE);
        c.cover.insert("src".into(), "data:image/png;base64,AAAA".into());
        c.cover.insert("data-src".into(), "//sns-webpic-qc.xhscdn.com/cover.jpg".into());
        assert_eq!(
            read_cover(&c).as_deref(),
            Ok("https://sns-webpic-qc.xhscdn.com/cover.jpg")
        );
    }

    #[test]
    fn cover_from_background_style() {
        let mut c = card("t", NOTE);
        c.cover.insert(
            "style".into(),
            "width: 100%; background-image: url(&quot;https://ci.xiaohongshu.com/bg.webp&quot;);".into(),
        );
        assert_eq!(read_cover(&c).as_deref(), Ok("https://ci.xiaohongshu.com/bg.webp"));
    }

    #[test]
    fn inline_only_cover_reported() {
        let mut c = card("t", NOTE);
        c.cover.insert("src".into(), "data:image/gif;base64,R0lG".into());
        assert_eq!(read_cover(&c), Err(MissReason::InlineDataCover));
        assert_eq!(read_cover(&card("t", NOTE)), Err(MissReason::NoCover));
    }

    #[test]
    fn structural_fields_override_layout() {
        let mut c = card("乱序文本\n1天前\n某人", NOTE);
        c.fields.insert("title".into(), "真正的标题".into());
        c.fields.insert("author".into(), "真正的作者".into());
        c.fields.insert("like".into(), "2.3万".into());
        let rec = extract(&c, SelectorTier::Card).unwrap();
        assert_eq!(rec.value.title.as_deref(), Some("真正的标题"));
        assert_eq!(rec.value.author.as_deref(), Some("真正的作者"));
        assert_eq!(rec.value.like_count, Some(23_000));
        assert_eq!(rec.value.publish_time.as_deref(), Some("1天前"));
        assert_eq!(rec.confidence, Confidence::High);
        assert!(!rec.misses.iter().any(|m| m.field == "title" || m.field == "author"));
    }

    #[test]
    fn structural_time_without_token_keeps_layout_time() {
        let mut c = card("标题\n作者\n3天前\n1.2万", NOTE);
        c.fields.insert("time".into(), "上海".into());
        let rec = extract(&c, SelectorTier::Card).unwrap();
        assert_eq!(rec.value.publish_time.as_deref(), Some("3天前"));

        let mut c = card("标题\n作者", NOTE);
        c.fields.insert("time".into(), "上海".into());
        let rec = extract(&c, SelectorTier::Card).unwrap();
        assert_eq!(rec.value.publish_time, None);
        assert!(rec
            .misses
            .contains(&FieldMiss::new("publish_time", MissReason::NoTimeLine)));

        let mut c = card("标题\n作者", NOTE);
        c.fields.insert("time".into(), "编辑于 昨天 10:20 上海".into());
        let rec = extract(&c, SelectorTier::Card).unwrap();
        assert_eq!(rec.value.publish_time.as_deref(), Some("昨天 10:20"));
    }

    #[test]
    fn structural_like_without_count_keeps_layout_like() {
        let mut c = card("标题\n作者\n3天前\n1.2万", NOTE);
        c.fields.insert("like".into(), "赞".into());
        let rec = extract(&c, SelectorTier::Card).unwrap();
        assert_eq!(rec.value.like_text.as_deref(), Some("1.2万"));
        assert_eq!(rec.value.like_count, Some(12_000));

        // with no positional like line the bare label still fills the gap
        let mut c = card("标题\n作者\n3天前", NOTE);
        c.fields.insert("like".into(), "赞".into());
        let rec = extract(&c, SelectorTier::Card).unwrap();
        assert_eq!(rec.value.like_text.as_deref(), Some("赞"));
        assert_eq!(rec.value.like_count, None);
    }

    #[test]
    fn structural_fields_ignored_on_anchor_tier() {
        let mut c = card("标题\n作者\n1天前", NOTE);
        c.fields.insert("title".into(), "别的".into());
        let rec = extract(&c, SelectorTier::Anchor).unwrap();
        assert_eq!(rec.value.title.as_deref(), Some("标题"));
    }

    #[test]
    fn raw_text_truncated() {
        let long = "长".repeat(2000);
        let c = card(&long, NOTE);
        let rec = extract(&c, SelectorTier::Anchor).unwrap();
        assert_eq!(rec.value.raw_text.unwrap().chars().count(), 1200);
    }

    #[test]
    fn extraction_is_deterministic() {
        let c = card("易烊千玺的日常\n易烊千玺\n3天前\n1.2万", NOTE);
        let a = extract(&c, SelectorTier::Anchor);
        let b = extract(&c, SelectorTier::Anchor);
        assert_eq!(a, b);
    }
}
