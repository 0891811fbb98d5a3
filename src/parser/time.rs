use std::sync::LazyLock;

use regex::Regex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeKind {
    MinutesAgo,
    HoursAgo,
    DaysAgo,
    Yesterday,
    DayBeforeYesterday,
    MonthDay,
    FullDate,
}

/// A time token found in free text. `text` is the literal substring; relative
/// forms are kept as-is since no capture timestamp is available to anchor them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeToken<'a> {
    pub kind: TimeKind,
    pub text: &'a str,
}

// Order matters: earlier patterns win over the more permissive date shapes.
// Group 1 is the token; the outer groups only enforce digit boundaries.
static TIME_PATTERNS: LazyLock<Vec<(TimeKind, Regex)>> = LazyLock::new(|| {
    [
        (TimeKind::MinutesAgo, r"([0-9]+\s*分钟前)"),
        (TimeKind::HoursAgo, r"([0-9]+\s*小时前)"),
        (TimeKind::DaysAgo, r"([0-9]+\s*天前)"),
        (TimeKind::Yesterday, r"(昨天\s*[0-9]{1,2}:[0-9]{2})"),
        (TimeKind::DayBeforeYesterday, r"(前天\s*[0-9]{1,2}:[0-9]{2})"),
        (TimeKind::MonthDay, r"(?:^|[^0-9-])([0-9]{1,2}-[0-9]{1,2})(?:$|[^0-9-])"),
        (TimeKind::FullDate, r"(?:^|[^0-9])([0-9]{4}-[0-9]{1,2}-[0-9]{1,2})(?:$|[^0-9])"),
    ]
    .into_iter()
    .map(|(kind, pattern)| (kind, Regex::new(pattern).unwrap()))
    .collect()
});

/// First time token in `text` under the ordered pattern list.
pub fn find(text: &str) -> Option<TimeToken<'_>> {
    TIME_PATTERNS.iter().find_map(|(kind, re)| {
        re.captures(text).and_then(|caps| caps.get(1)).map(|m| TimeToken {
            kind: *kind,
            text: m.as_str(),
        })
    })
}

/// The matched time literal, if any.
pub fn classify(text: &str) -> Option<String> {
    find(text).map(|t| t.text.to_string())
}

pub fn looks_like_time(text: &str) -> bool {
    find(text).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_tokens() {
        assert_eq!(classify("3分钟前"), Some("3分钟前".into()));
        assert_eq!(classify("12 小时前"), Some("12 小时前".into()));
        assert_eq!(classify("3天前"), Some("3天前".into()));
    }

    #[test]
    fn yesterday_and_day_before() {
        assert_eq!(classify("昨天 10:20"), Some("昨天 10:20".into()));
        assert_eq!(classify("编辑于 前天 08:05"), Some("前天 08:05".into()));
        assert_eq!(find("昨天 10:20").map(|t| t.kind), Some(TimeKind::Yesterday));
    }

    #[test]
    fn month_day() {
        assert_eq!(classify("03-15"), Some("03-15".into()));
        assert_eq!(classify("发布于 3-5 上海"), Some("3-5".into()));
    }

    #[test]
    fn full_date_not_shadowed_by_month_day() {
        assert_eq!(classify("2024-03-01"), Some("2024-03-01".into()));
        assert_eq!(find("2024-01-02").map(|t| t.kind), Some(TimeKind::FullDate));
    }

    #[test]
    fn earlier_pattern_wins() {
        // Both a relative and a dated token: relative comes first in the list
        assert_eq!(classify("2024-01-02 转发 5天前"), Some("5天前".into()));
    }

    #[test]
    fn no_token() {
        assert_eq!(classify("no date here"), None);
        assert_eq!(classify("1.2万"), None);
        assert_eq!(classify(""), None);
        assert!(!looks_like_time("易烊千玺"));
    }
}
