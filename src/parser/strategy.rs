use tracing::debug;

use super::card::extract_card;
use crate::capture::{ContainerSource, SelectorTier};
use crate::config::PipelineConfig;
use crate::dedup::dedup_keep_order;
use crate::error::CaptureError;
use crate::records::{Confidence, Extracted, PostRecord};

/// Ways of finding cards on a page, tried in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Card containers matched by class name, sub-fields read by selector
    Structural,
    /// Bare note anchors, fields read from line positions only
    Positional,
}

pub const DEFAULT_CHAIN: [Strategy; 2] = [Strategy::Structural, Strategy::Positional];

impl Strategy {
    pub fn name(self) -> &'static str {
        match self {
            Strategy::Structural => "structural",
            Strategy::Positional => "positional",
        }
    }

    pub fn tier(self) -> SelectorTier {
        match self {
            Strategy::Structural => SelectorTier::Card,
            Strategy::Positional => SelectorTier::Anchor,
        }
    }

    /// Best confidence a record from this strategy can carry.
    pub fn confidence(self) -> Confidence {
        match self {
            Strategy::Structural => Confidence::High,
            Strategy::Positional => Confidence::Medium,
        }
    }

    fn container_cap(self, config: &PipelineConfig) -> usize {
        match self {
            Strategy::Structural => config.max_containers,
            Strategy::Positional => config.max_anchors,
        }
    }

    pub fn extract<S: ContainerSource>(
        self,
        source: &S,
        keyword: Option<&str>,
        config: &PipelineConfig,
    ) -> Result<Vec<Extracted<PostRecord>>, CaptureError> {
        let containers = source.list_candidate_containers(self.tier())?;
        let cards = containers
            .iter()
            .take(self.container_cap(config))
            .filter_map(|c| extract_card(c, keyword, self.tier(), config));
        Ok(dedup_keep_order(cards))
    }
}

/// Which strategy produced a batch. `Merged` means none reached the minimum
/// yield and every strategy's output was pooled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainChoice {
    Single(Strategy),
    Merged,
}

#[derive(Debug, Clone)]
pub struct ChainOutcome {
    pub choice: ChainChoice,
    pub confidence: Confidence,
    pub records: Vec<Extracted<PostRecord>>,
}

/// Run strategies in order; the first with at least `min_cards` records wins.
/// Later strategies are not queried once one succeeds.
pub fn run_chain<S: ContainerSource>(
    chain: &[Strategy],
    source: &S,
    keyword: Option<&str>,
    config: &PipelineConfig,
) -> Result<ChainOutcome, CaptureError> {
    let mut pooled = Vec::new();

    for &strategy in chain {
        let records = strategy.extract(source, keyword, config)?;
        debug!(
            "Strategy {} yielded {} cards (min {})",
            strategy.name(),
            records.len(),
            config.min_cards
        );
        if records.len() >= config.min_cards {
            return Ok(ChainOutcome {
                choice: ChainChoice::Single(strategy),
                confidence: strategy.confidence(),
                records,
            });
        }
        pooled.extend(records);
    }

    Ok(ChainOutcome {
        choice: ChainChoice::Merged,
        confidence: Confidence::Low,
        records: dedup_keep_order(pooled),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::{CapturedContainer, Link, Snapshot};

    fn note(id: usize, text: &str) -> CapturedContainer {
        CapturedContainer {
            text: Some(text.to_string()),
            links: vec![Link {
                href: format!("/explore/{:024x}?xsec_token=t{}", id + 0xabc0000000, id),
                attributes: Default::default(),
            }],
            ..Default::default()
        }
    }

    fn config(min_cards: usize) -> PipelineConfig {
        PipelineConfig {
            min_cards,
            ..Default::default()
        }
    }

    #[test]
    fn structural_wins_when_enough() {
        let snap = Snapshot {
            card: (0..3).map(|i| note(i, "标题\n作者\n1天前")).collect(),
            anchor: (10..20).map(|i| note(i, "锚点")).collect(),
            failure: None,
        };
        let out = run_chain(&DEFAULT_CHAIN, &&snap, None, &config(3)).unwrap();
        assert_eq!(out.choice, ChainChoice::Single(Strategy::Structural));
        assert_eq!(out.records.len(), 3);
    }

    #[test]
    fn falls_back_to_positional() {
        let snap = Snapshot {
            card: vec![note(0, "标题\n作者\n1天前")],
            anchor: (0..4).map(|i| note(i, "锚点标题")).collect(),
            failure: None,
        };
        let out = run_chain(&DEFAULT_CHAIN, &&snap, None, &config(3)).unwrap();
        assert_eq!(out.choice, ChainChoice::Single(Strategy::Positional));
        assert_eq!(out.records.len(), 4);
        assert_eq!(out.confidence, Confidence::Medium);
    }

    #[test]
    fn underflow_everywhere_pools_results() {
        let snap = Snapshot {
            card: vec![note(0, "标题\n作者\n1天前")],
            anchor: vec![note(0, "重复"), note(1, "新的")],
            failure: None,
        };
        let out = run_chain(&DEFAULT_CHAIN, &&snap, None, &config(8)).unwrap();
        assert_eq!(out.choice, ChainChoice::Merged);
        // note 0 appears in both tiers; the structural copy comes first
        assert_eq!(out.records.len(), 2);
        assert_eq!(out.records[0].value.title.as_deref(), Some("标题"));
        assert_eq!(out.records[1].value.title.as_deref(), Some("新的"));
    }

    #[test]
    fn container_cap_applies() {
        let snap = Snapshot {
            card: (0..10).map(|i| note(i, "标题\n作者\n1天前")).collect(),
            anchor: vec![],
            failure: None,
        };
        let cfg = PipelineConfig {
            max_containers: 4,
            min_cards: 1,
            ..Default::default()
        };
        let out = run_chain(&DEFAULT_CHAIN, &&snap, None, &cfg).unwrap();
        assert_eq!(out.records.len(), 4);
    }
}
