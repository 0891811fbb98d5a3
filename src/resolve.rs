//! Picking the intended account out of a list of user search results.
//!
//! Tiers are tried strongest first and each one looks at the whole candidate
//! list before the next is consulted. `id_exact` and `name_exact` take the
//! first hit in list order; `name_contains` and `top_fans` rank their hits so
//! the answer does not depend on scan order.

use std::cmp::Ordering;

use tracing::info;

use crate::records::{MatchTier, UserCandidate};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Selection {
    FirstHit,
    BestRanked,
}

struct TierMatcher {
    tier: MatchTier,
    selection: Selection,
    matches: fn(&UserCandidate, &str) -> bool,
}

const TIER_CHAIN: &[TierMatcher] = &[
    TierMatcher {
        tier: MatchTier::IdExact,
        selection: Selection::FirstHit,
        matches: id_in_raw_text,
    },
    TierMatcher {
        tier: MatchTier::NameExact,
        selection: Selection::FirstHit,
        matches: name_equals,
    },
    TierMatcher {
        tier: MatchTier::NameContains,
        selection: Selection::BestRanked,
        matches: name_contains,
    },
    TierMatcher {
        tier: MatchTier::TopFans,
        selection: Selection::BestRanked,
        matches: any_candidate,
    },
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub selected: Option<UserCandidate>,
    pub tier: MatchTier,
}

fn folded_username(c: &UserCandidate) -> String {
    c.username.as_deref().unwrap_or("").trim().to_lowercase()
}

/// The identifier must stand alone: no ASCII letter or digit touching it on
/// either side, so "918365379" does not match inside "9183653790".
pub fn id_in_raw_text(candidate: &UserCandidate, target: &str) -> bool {
    let Some(raw) = candidate.raw_text.as_deref() else {
        return false;
    };
    let hay = raw.to_lowercase();
    hay.match_indices(target).any(|(pos, m)| {
        let before = hay[..pos].chars().next_back();
        let after = hay[pos + m.len()..].chars().next();
        !before.is_some_and(|c| c.is_ascii_alphanumeric())
            && !after.is_some_and(|c| c.is_ascii_alphanumeric())
    })
}

pub fn name_equals(candidate: &UserCandidate, target: &str) -> bool {
    candidate.username.is_some() && folded_username(candidate) == target
}

pub fn name_contains(candidate: &UserCandidate, target: &str) -> bool {
    candidate.username.is_some() && folded_username(candidate).contains(target)
}

fn any_candidate(_: &UserCandidate, _: &str) -> bool {
    true
}

/// Most fans first (unknown counts last), then the smaller username, then
/// the smaller profile URL.
pub fn ranking(a: &UserCandidate, b: &UserCandidate) -> Ordering {
    b.fans_count
        .cmp(&a.fans_count)
        .then_with(|| {
            let an = a.username.as_deref().unwrap_or("");
            let bn = b.username.as_deref().unwrap_or("");
            an.cmp(bn)
        })
        .then_with(|| {
            let au = a.profile_url.as_deref().unwrap_or("");
            let bu = b.profile_url.as_deref().unwrap_or("");
            au.cmp(bu)
        })
}

fn select<'a>(
    matcher: &TierMatcher,
    candidates: &'a [UserCandidate],
    target: &str,
) -> Option<&'a UserCandidate> {
    let mut hits = candidates.iter().filter(|c| (matcher.matches)(c, target));
    match matcher.selection {
        Selection::FirstHit => hits.next(),
        Selection::BestRanked => hits.min_by(|a, b| ranking(a, b)),
    }
}

/// Resolve `identifier` against the candidates; the first tier with a hit wins.
pub fn resolve(candidates: &[UserCandidate], identifier: &str) -> Resolution {
    let target = identifier.trim().to_lowercase();
    if target.is_empty() {
        return Resolution {
            selected: None,
            tier: MatchTier::None,
        };
    }

    let hit = TIER_CHAIN
        .iter()
        .find_map(|m| select(m, candidates, &target).map(|c| (m.tier, c)));

    match hit {
        Some((tier, candidate)) => {
            info!(
                "Selected user {} (fans={:?}) by {}",
                candidate.username.as_deref().unwrap_or("-"),
                candidate.fans_count,
                tier.as_str()
            );
            let mut selected = candidate.clone();
            selected.matched_by = Some(tier);
            Resolution {
                selected: Some(selected),
                tier,
            }
        }
        None => Resolution {
            selected: None,
            tier: MatchTier::None,
        },
    }
}

/// The `k` strongest candidates under [`ranking`].
pub fn top_k(candidates: &[UserCandidate], k: usize) -> Vec<UserCandidate> {
    let mut ranked = candidates.to_vec();
    ranked.sort_by(ranking);
    ranked.truncate(k);
    ranked
}
