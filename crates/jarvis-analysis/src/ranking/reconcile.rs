//! Lifecycle reconciliation of a fresh ranking against the stored set.
//!
//! Known ids keep their discovery time and feedback, `ActedOn` is sticky,
//! anything no longer supported becomes `Stale`, and `Stale` is terminal: an
//! association that re-emerges after retirement gets a new generation id.

use std::collections::BTreeSet;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use jarvis_core::config::RankingConfig;
use jarvis_core::types::collections::{FxHashMap, FxHashSet};
use jarvis_core::types::{Pattern, PatternStatus};

use crate::ids::pattern_id;

use super::ranker::compare_rank;

/// The complete pattern set to persist for one user.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reconciliation {
    /// Visible patterns in rank order, then retired ones.
    pub patterns: Vec<Pattern>,
    /// Patterns published for the first time.
    pub published: usize,
    /// Patterns retired by this run.
    pub retired: usize,
}

impl Reconciliation {
    pub fn visible(&self) -> impl Iterator<Item = &Pattern> {
        self.patterns.iter().filter(|p| p.is_visible())
    }
}

pub struct Reconciler {
    config: RankingConfig,
}

impl Reconciler {
    pub fn new(config: RankingConfig) -> Self {
        Self { config }
    }

    pub fn with_defaults() -> Self {
        Self::new(RankingConfig::default())
    }

    /// A reconciler whose evidence window is at most `days`. `None` keeps
    /// the configured window.
    pub fn capped(&self, days: Option<u32>) -> Self {
        let mut config = self.config.clone();
        if let Some(days) = days {
            config.retention_days = config.retention_days.min(days.max(1));
        }
        Self::new(config)
    }

    /// Point each candidate at its live generation, skipping retired ids.
    pub fn assign_ids(&self, user_id: &str, candidates: &mut [Pattern], previous: &[Pattern]) {
        let retired: FxHashSet<&str> = previous
            .iter()
            .filter(|p| p.status == PatternStatus::Stale)
            .map(|p| p.id.as_str())
            .collect();
        for candidate in candidates {
            let mut generation = 0;
            let mut id = pattern_id(user_id, &candidate.basis, generation);
            while retired.contains(id.as_str()) {
                generation += 1;
                id = pattern_id(user_id, &candidate.basis, generation);
            }
            candidate.id = id;
        }
    }

    /// Apply a fresh ranking to the previously stored set.
    pub fn reconcile(
        &self,
        previous: &[Pattern],
        ranked: Vec<Pattern>,
        now: DateTime<Utc>,
        available_dates: &BTreeSet<NaiveDate>,
    ) -> Reconciliation {
        let known: FxHashMap<&str, &Pattern> = previous
            .iter()
            .filter(|p| p.status != PatternStatus::Stale)
            .map(|p| (p.id.as_str(), p))
            .collect();
        let mut matched: FxHashSet<&str> = FxHashSet::default();
        let mut visible = Vec::new();
        let mut stale = Vec::new();
        let mut published = 0;
        let mut retired = 0;

        for mut pattern in ranked {
            let publishable = self.is_publishable(&pattern, now, available_dates);
            match known.get(pattern.id.as_str()) {
                Some(old) => {
                    matched.insert(old.id.as_str());
                    pattern.discovered = old.discovered;
                    pattern.was_acted_on = old.was_acted_on;
                    pattern.outcome = old.outcome.clone();
                    pattern.status = old.status;
                    if publishable {
                        promote(&mut pattern);
                        visible.push(pattern);
                    } else {
                        retire(&mut pattern);
                        retired += 1;
                        stale.push(pattern);
                    }
                }
                None if publishable => {
                    promote(&mut pattern);
                    published += 1;
                    visible.push(pattern);
                }
                None => {
                    tracing::trace!(id = %pattern.id, confidence = pattern.confidence, "candidate not published");
                }
            }
        }

        for old in previous {
            if matched.contains(old.id.as_str()) {
                continue;
            }
            let mut kept = old.clone();
            if kept.status != PatternStatus::Stale {
                retire(&mut kept);
                retired += 1;
            }
            stale.push(kept);
        }

        finish(visible, stale, published, retired)
    }

    /// Re-check stored patterns without a fresh detection, e.g. after the
    /// history became too thin to correlate. Only evidence that vanished or
    /// aged out retires a pattern.
    pub fn revalidate(
        &self,
        previous: &[Pattern],
        now: DateTime<Utc>,
        available_dates: &BTreeSet<NaiveDate>,
    ) -> Reconciliation {
        let mut visible = Vec::new();
        let mut stale = Vec::new();
        let mut retired = 0;
        for old in previous {
            let mut kept = old.clone();
            if kept.status == PatternStatus::Stale {
                stale.push(kept);
            } else if self.evidence_valid(&kept, now, available_dates) {
                visible.push(kept);
            } else {
                retire(&mut kept);
                retired += 1;
                stale.push(kept);
            }
        }
        finish(visible, stale, 0, retired)
    }

    fn is_publishable(&self, pattern: &Pattern, now: DateTime<Utc>, available: &BTreeSet<NaiveDate>) -> bool {
        pattern.confidence >= self.config.revalidation_threshold
            && self.evidence_valid(pattern, now, available)
    }

    /// Every evidence date still has logs and lies within retention.
    fn evidence_valid(&self, pattern: &Pattern, now: DateTime<Utc>, available: &BTreeSet<NaiveDate>) -> bool {
        let cutoff = now.date_naive() - Duration::days(i64::from(self.config.retention_days));
        !pattern.evidence_points.is_empty()
            && pattern
                .evidence_points
                .iter()
                .flat_map(|p| p.dates())
                .all(|d| d >= cutoff && available.contains(&d))
    }
}

fn promote(pattern: &mut Pattern) {
    if pattern.status == PatternStatus::Candidate {
        if let Err(e) = pattern.transition(PatternStatus::Active) {
            tracing::warn!(id = %pattern.id, error = %e, "cannot publish pattern");
        }
    }
}

fn retire(pattern: &mut Pattern) {
    match pattern.transition(PatternStatus::Stale) {
        Ok(()) => tracing::debug!(id = %pattern.id, "pattern retired"),
        Err(e) => tracing::warn!(id = %pattern.id, error = %e, "cannot retire pattern"),
    }
}

fn finish(mut visible: Vec<Pattern>, mut stale: Vec<Pattern>, published: usize, retired: usize) -> Reconciliation {
    visible.sort_by(compare_rank);
    stale.sort_by(|a, b| b.discovered.cmp(&a.discovered).then_with(|| a.id.cmp(&b.id)));
    visible.append(&mut stale);
    Reconciliation { patterns: visible, published, retired }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{discovered, oct, pattern};
    use jarvis_core::types::Signal;

    fn now() -> DateTime<Utc> {
        discovered() + Duration::days(1)
    }

    fn all_october() -> BTreeSet<NaiveDate> {
        (1..=31).map(oct).collect()
    }

    fn stress_sleep(confidence: u8) -> Pattern {
        let mut p = pattern("tmp", Signal::Stress, Signal::SleepHours, confidence, &[1, 3, 5, 7]);
        Reconciler::with_defaults().assign_ids("u1", std::slice::from_mut(&mut p), &[]);
        p
    }

    #[test]
    fn new_patterns_publish_above_threshold() {
        let r = Reconciler::with_defaults();
        let out = r.reconcile(&[], vec![stress_sleep(75)], now(), &all_october());
        assert_eq!(out.published, 1);
        assert_eq!(out.patterns[0].status, PatternStatus::Active);

        let out = r.reconcile(&[], vec![stress_sleep(30)], now(), &all_october());
        assert!(out.patterns.is_empty());
    }

    #[test]
    fn acted_on_is_sticky_and_feedback_survives() {
        let r = Reconciler::with_defaults();
        let mut stored = stress_sleep(75);
        stored.status = PatternStatus::Active;
        stored.discovered = discovered() - Duration::days(10);
        stored.mark_acted_on(Some("slept better".into())).unwrap();

        let out = r.reconcile(&[stored.clone()], vec![stress_sleep(82)], now(), &all_october());
        let p = &out.patterns[0];
        assert_eq!(p.status, PatternStatus::ActedOn);
        assert!(p.was_acted_on);
        assert_eq!(p.outcome.as_deref(), Some("slept better"));
        assert_eq!(p.discovered, stored.discovered);
        assert_eq!(p.confidence, 82);
        assert_eq!(out.published, 0);
    }

    #[test]
    fn undetected_or_weakened_patterns_go_stale() {
        let r = Reconciler::with_defaults();
        let mut stored = stress_sleep(75);
        stored.status = PatternStatus::Active;

        let gone = r.reconcile(&[stored.clone()], vec![], now(), &all_october());
        assert_eq!(gone.retired, 1);
        assert_eq!(gone.patterns[0].status, PatternStatus::Stale);
        assert_eq!(gone.visible().count(), 0);

        let weak = r.reconcile(&[stored], vec![stress_sleep(35)], now(), &all_october());
        assert_eq!(weak.patterns[0].status, PatternStatus::Stale);
    }

    #[test]
    fn cleared_evidence_retires() {
        let r = Reconciler::with_defaults();
        let mut stored = stress_sleep(75);
        stored.status = PatternStatus::Active;
        let out = r.revalidate(&[stored.clone()], now(), &BTreeSet::new());
        assert_eq!(out.patterns[0].status, PatternStatus::Stale);

        let kept = r.revalidate(&[stored], now(), &all_october());
        assert_eq!(kept.patterns[0].status, PatternStatus::Active);
        assert_eq!(kept.retired, 0);
    }

    #[test]
    fn shorter_user_retention_retires_older_evidence() {
        let r = Reconciler::with_defaults();
        let mut stored = stress_sleep(75);
        stored.status = PatternStatus::Active;

        // Evidence spans Oct 1-8; now is Oct 21.
        let week = r.capped(Some(7)).revalidate(&[stored.clone()], now(), &all_october());
        assert_eq!(week.retired, 1);
        assert_eq!(week.patterns[0].status, PatternStatus::Stale);

        let month = r.capped(Some(30)).revalidate(&[stored.clone()], now(), &all_october());
        assert_eq!(month.patterns[0].status, PatternStatus::Active);

        // A user window longer than the configured one does not extend it.
        let mut short = RankingConfig::default();
        short.retention_days = 7;
        let out = Reconciler::new(short).capped(None).revalidate(&[stored], now(), &all_october());
        assert_eq!(out.patterns[0].status, PatternStatus::Stale);
    }

    #[test]
    fn re_emerging_association_gets_new_generation() {
        let r = Reconciler::with_defaults();
        let mut retired = stress_sleep(75);
        retired.status = PatternStatus::Stale;

        let mut fresh = vec![stress_sleep(80)];
        r.assign_ids("u1", &mut fresh, std::slice::from_ref(&retired));
        assert_ne!(fresh[0].id, retired.id);

        let out = r.reconcile(&[retired.clone()], fresh, now(), &all_october());
        assert_eq!(out.published, 1);
        assert_eq!(out.patterns.len(), 2);
        assert_eq!(out.patterns[0].status, PatternStatus::Active);
        assert_eq!(out.patterns[1].id, retired.id);
        assert_eq!(out.patterns[1].status, PatternStatus::Stale);
    }
}
