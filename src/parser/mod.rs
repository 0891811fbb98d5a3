pub mod card;
pub mod links;
pub mod numeral;
pub mod strategy;
pub mod time;
pub mod user;

/// Split container text into non-empty trimmed lines, in order.
pub fn split_lines(text: &str) -> Vec<&str> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect()
}

/// Cut `text` to at most `max` characters (not bytes).
pub fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lines_trimmed_and_blank_dropped() {
        assert_eq!(split_lines("  a \n\n\t\n b\r\n"), vec!["a", "b"]);
        assert!(split_lines("").is_empty());
    }

    #[test]
    fn truncation_counts_chars() {
        assert_eq!(truncate_chars("易烊千玺的日常", 4), "易烊千玺");
        assert_eq!(truncate_chars("abc", 10), "abc");
        assert_eq!(truncate_chars("abc", 0), "");
    }
}
