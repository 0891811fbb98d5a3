//! Replays captured scroll steps through the extractors.
//!
//! Every run owns its accumulator. Steps are pulled one at a time so a run
//! that reaches its target never looks at the remaining snapshots.

use tracing::{debug, info, warn};

use crate::capture::{ContainerSource, KeywordRun, PostCapture, UserCapture};
use crate::config::PipelineConfig;
use crate::dedup::dedup_keep_order;
use crate::enrich::enrich_posts;
use crate::error::CaptureError;
use crate::parser::links::strip_tracking;
use crate::parser::strategy::{run_chain, DEFAULT_CHAIN};
use crate::parser::user::{collect_user_posts, extract_candidates};
use crate::records::{Extracted, PostRecord, ResolutionReport, UserCandidate};
use crate::resolve::{resolve, top_k};

/// Collect cards for one keyword (or the explore feed when `keyword` is None).
pub fn run_posts<I, S>(
    keyword: Option<&str>,
    steps: I,
    config: &PipelineConfig,
) -> Result<Vec<Extracted<PostRecord>>, CaptureError>
where
    I: IntoIterator<Item = S>,
    S: ContainerSource,
{
    let label = keyword.unwrap_or("explore");
    let mut records: Vec<Extracted<PostRecord>> = Vec::new();

    for (i, step) in steps.into_iter().take(config.max_steps).enumerate() {
        let outcome = match run_chain(&DEFAULT_CHAIN, &step, keyword, config) {
            Ok(o) => o,
            Err(e) if !e.is_fatal() => {
                debug!("[{}] step {} unreadable: {}", label, i + 1, e);
                continue;
            }
            Err(e) => return Err(e),
        };
        debug!(
            "[{}] step {}: {:?} gave {} cards ({:?})",
            label,
            i + 1,
            outcome.choice,
            outcome.records.len(),
            outcome.confidence
        );
        records = dedup_keep_order(records.into_iter().chain(outcome.records));

        if let Some(target) = config.target_count {
            if records.len() >= target {
                debug!("[{}] target {} reached after {} steps", label, target, i + 1);
                break;
            }
        }
    }

    if let Some(target) = config.target_count {
        records.truncate(target);
    }
    info!("[{}] collected {} cards", label, records.len());
    Ok(records)
}

/// Runs selected by `config.keywords`; all of them when no keywords are set.
fn selected_runs<'a>(capture: &'a PostCapture, config: &PipelineConfig) -> Vec<&'a KeywordRun> {
    if config.keywords.is_empty() {
        return capture.runs.iter().collect();
    }
    for kw in &config.keywords {
        if !capture.runs.iter().any(|r| r.keyword.as_deref() == Some(kw.as_str())) {
            warn!("No captured run for keyword {}", kw);
        }
    }
    capture
        .runs
        .iter()
        .filter(|r| {
            r.keyword
                .as_deref()
                .is_some_and(|k| config.keywords.iter().any(|kw| kw == k))
        })
        .collect()
}

/// Every selected keyword run, merged and deduplicated across keywords,
/// then enriched from detail pages. `target_count` applies to each run on
/// its own; the merged list is not cut again.
pub fn run_post_capture(
    capture: &PostCapture,
    config: &PipelineConfig,
) -> Result<Vec<Extracted<PostRecord>>, CaptureError> {
    let mut all = Vec::new();
    for run in selected_runs(capture, config) {
        let records = run_posts(run.keyword.as_deref(), run.steps.iter(), config)?;
        all.extend(records);
    }

    let mut records = dedup_keep_order(all);
    if config.detail_limit > 0 {
        let enriched = enrich_posts(&mut records, &capture.details, config.detail_limit);
        info!("Enriched {} of {} cards from detail pages", enriched, records.len());
    }
    Ok(records)
}

/// User cards from the search steps, at most `max_users` distinct profiles.
pub fn collect_candidates<I, S>(
    steps: I,
    query: &str,
    config: &PipelineConfig,
) -> Result<Vec<UserCandidate>, CaptureError>
where
    I: IntoIterator<Item = S>,
    S: ContainerSource,
{
    let mut candidates: Vec<UserCandidate> = Vec::new();

    for (i, step) in steps.into_iter().take(config.max_steps).enumerate() {
        let batch = match extract_candidates(&step, query, config) {
            Ok(b) => b,
            Err(e) if !e.is_fatal() => {
                debug!("Search step {} unreadable: {}", i + 1, e);
                continue;
            }
            Err(e) => return Err(e),
        };
        candidates = dedup_keep_order(candidates.into_iter().chain(batch));
        if candidates.len() >= config.max_users {
            break;
        }
    }

    candidates.truncate(config.max_users);
    Ok(candidates)
}

/// Search, resolve, then read the chosen user's own feed.
pub fn run_user_capture(
    capture: &UserCapture,
    config: &PipelineConfig,
) -> Result<ResolutionReport, CaptureError> {
    let candidates = collect_candidates(capture.search_steps.iter(), &capture.name, config)?;
    info!("{} user candidates for {}", candidates.len(), capture.name);

    let resolution = resolve(&candidates, &capture.identifier);

    let posts = match &resolution.selected {
        Some(user) => {
            let url = user.profile_url.as_deref().map(strip_tracking).unwrap_or("");
            match capture.profiles.get(url) {
                Some(steps) => collect_user_posts(steps.iter(), user, &capture.name, config)?,
                None => {
                    warn!("No profile feed captured for {}", url);
                    Vec::new()
                }
            }
        }
        None => {
            warn!("No user matched {} / {}", capture.name, capture.identifier);
            Vec::new()
        }
    };

    Ok(ResolutionReport {
        name: capture.name.clone(),
        identifier: capture.identifier.clone(),
        matched_by: resolution.tier,
        selected_user: resolution.selected,
        candidates_top_k: top_k(&candidates, config.top_k),
        posts,
    })
}
