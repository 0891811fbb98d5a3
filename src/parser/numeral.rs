use std::sync::LazyLock;

use regex::Regex;

static LABEL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"粉丝|关注|获赞|赞|人|\+").unwrap());
static NUMERAL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([0-9]+)(?:\.([0-9]+))?\s*([万千])?").unwrap());

// Multipliers top out at 10^4, so digits past the ninth never reach the integer part.
const MAX_FRACTION_DIGITS: usize = 9;

/// Parse an abbreviated count such as "1.2万", "3千", "10+" or "粉丝 356".
///
/// The result is `number × unit` truncated toward zero, computed on the
/// decimal digits directly so "1.15万" is 11500 and not 11499.
pub fn normalize(text: &str) -> Option<u64> {
    let stripped = LABEL_RE.replace_all(text.trim(), "");
    let caps = NUMERAL_RE.captures(stripped.trim())?;

    let multiplier = unit_multiplier(caps.get(3).map(|m| m.as_str()));
    let whole: u64 = caps[1].parse().ok()?;
    let mut value = whole.checked_mul(multiplier)?;

    if let Some(fraction) = caps.get(2) {
        let digits = &fraction.as_str()[..fraction.as_str().len().min(MAX_FRACTION_DIGITS)];
        let scale = 10u64.pow(digits.len() as u32);
        let numerator: u64 = digits.parse().ok()?;
        value = value.checked_add(numerator * multiplier / scale)?;
    }

    Some(value)
}

fn unit_multiplier(unit: Option<&str>) -> u64 {
    match unit {
        Some("万") => 10_000,
        Some("千") => 1_000,
        _ => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wan_unit() {
        assert_eq!(normalize("1.2万"), Some(12_000));
        assert_eq!(normalize("3万"), Some(30_000));
    }

    #[test]
    fn qian_unit() {
        assert_eq!(normalize("3千"), Some(3_000));
        assert_eq!(normalize("2.5千"), Some(2_500));
    }

    #[test]
    fn trailing_plus_ignored() {
        assert_eq!(normalize("10+"), Some(10));
        assert_eq!(normalize("1万+"), Some(10_000));
    }

    #[test]
    fn no_unit() {
        assert_eq!(normalize("356"), Some(356));
        assert_eq!(normalize("7.9"), Some(7));
    }

    #[test]
    fn empty_and_non_numeric() {
        assert_eq!(normalize(""), None);
        assert_eq!(normalize("   "), None);
        assert_eq!(normalize("赞"), None);
        assert_eq!(normalize("no digits"), None);
    }

    #[test]
    fn labels_stripped() {
        assert_eq!(normalize("粉丝 2.5万"), Some(25_000));
        assert_eq!(normalize("1.2万粉丝"), Some(12_000));
        assert_eq!(normalize("获赞与收藏 88"), Some(88));
        assert_eq!(normalize("356赞"), Some(356));
        assert_eq!(normalize("1千人"), Some(1_000));
    }

    #[test]
    fn truncates_without_float_drift() {
        assert_eq!(normalize("1.15万"), Some(11_500));
        assert_eq!(normalize("1.23456万"), Some(12_345));
        assert_eq!(normalize("0.0001千"), Some(0));
    }

    #[test]
    fn space_before_unit() {
        assert_eq!(normalize("1.2 万"), Some(12_000));
    }

    #[test]
    fn overflow_is_none() {
        assert_eq!(normalize("99999999999999999999万"), None);
        assert_eq!(normalize("9999999999999999万"), None);
    }
}
