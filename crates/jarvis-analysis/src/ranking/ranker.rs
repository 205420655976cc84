//! Ordering and deduplication of a user's patterns.

use std::cmp::Ordering;
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use jarvis_core::config::RankingConfig;
use jarvis_core::types::{Pattern, Signal};

use crate::detection::CandidatePattern;

use super::similarity::jaccard;

/// Confidence desc, discovered desc, latest evidence desc, id asc.
pub fn compare_rank(a: &Pattern, b: &Pattern) -> Ordering {
    b.confidence
        .cmp(&a.confidence)
        .then_with(|| b.discovered.cmp(&a.discovered))
        .then_with(|| b.latest_evidence_date().cmp(&a.latest_evidence_date()))
        .then_with(|| a.id.cmp(&b.id))
}

pub struct PatternRanker {
    config: RankingConfig,
}

impl PatternRanker {
    pub fn new(config: RankingConfig) -> Self {
        Self { config }
    }

    pub fn with_defaults() -> Self {
        Self::new(RankingConfig::default())
    }

    pub fn rank_candidates(&self, candidates: Vec<CandidatePattern>) -> Vec<Pattern> {
        self.rank(candidates.into_iter().map(Pattern::from).collect())
    }

    /// Collapse same-pair duplicates, sort, then fold patterns whose
    /// evidence overlaps a higher-ranked one into it. Idempotent.
    pub fn rank(&self, patterns: Vec<Pattern>) -> Vec<Pattern> {
        let mut by_pair: BTreeMap<(Signal, Signal), Pattern> = BTreeMap::new();
        for pattern in patterns {
            match by_pair.entry(pattern.basis.pair_key()) {
                Entry::Vacant(slot) => {
                    slot.insert(pattern);
                }
                Entry::Occupied(mut slot) => {
                    if compare_rank(&pattern, slot.get()).is_lt() {
                        tracing::trace!(kept = %pattern.id, dropped = %slot.get().id, "same-pair collapse");
                        slot.insert(pattern);
                    }
                }
            }
        }

        let mut ordered: Vec<Pattern> = by_pair.into_values().collect();
        ordered.sort_by(compare_rank);

        let mut kept: Vec<Pattern> = Vec::with_capacity(ordered.len());
        for pattern in ordered {
            let keys = pattern.evidence_keys();
            let target = kept
                .iter()
                .position(|k| jaccard(&k.evidence_keys(), &keys) >= self.config.jaccard_threshold);
            match target {
                Some(i) => {
                    let host = &mut kept[i];
                    tracing::debug!(into = %host.id, merged = %pattern.id, "merging overlapping pattern");
                    host.merged_from.push(pattern.id);
                    host.merged_from.extend(pattern.merged_from);
                    host.merged_from.sort();
                    host.merged_from.dedup();
                }
                None => kept.push(pattern),
            }
        }
        kept
    }
}
