use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Knobs for one pipeline run. Passed explicitly to every entry point; a JSON
/// file may override the defaults and CLI flags override the file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Keyword runs to replay; empty means every run in the capture
    pub keywords: Vec<String>,
    /// Stop pulling a keyword's scroll steps once it has this many cards
    pub target_count: Option<usize>,
    /// Scroll steps per keyword
    pub max_steps: usize,
    /// Minimum yield for a strategy to be accepted without falling back
    pub min_cards: usize,
    pub max_containers: usize,
    pub max_anchors: usize,
    /// Like-count lines longer than this are not considered
    pub like_line_max_chars: usize,
    pub raw_text_limit: usize,
    /// How many leading cards get detail-page enrichment (0 = off)
    pub detail_limit: usize,
    pub max_users: usize,
    pub top_k: usize,
    pub posts_per_user: usize,
    pub profile_max_rounds: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            keywords: Vec::new(),
            target_count: None,
            max_steps: 10,
            min_cards: 8,
            max_containers: 300,
            max_anchors: 500,
            like_line_max_chars: 12,
            raw_text_limit: 1200,
            detail_limit: 0,
            max_users: 30,
            top_k: 10,
            posts_per_user: 10,
            profile_max_rounds: 18,
        }
    }
}

pub fn load_config(path: &Path) -> Result<PipelineConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    let config: PipelineConfig = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let config: PipelineConfig =
            serde_json::from_str(r#"{"keywords": ["武功山旅游攻略"], "min_cards": 3}"#).unwrap();
        assert_eq!(config.keywords, vec!["武功山旅游攻略".to_string()]);
        assert_eq!(config.min_cards, 3);
        assert_eq!(config.max_steps, PipelineConfig::default().max_steps);
    }

    #[test]
    fn unknown_keys_rejected() {
        assert!(serde_json::from_str::<PipelineConfig>(r#"{"scrolls": 3}"#).is_err());
    }
}
