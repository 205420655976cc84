//! The pattern detector.
//!
//! For every ordered signal pair (A, B) and lag, observed values of A on day
//! d are paired with observed values of B on day d + lag inside the trailing
//! window. Carried-forward values never enter a correlation.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use jarvis_core::config::DetectionConfig;
use jarvis_core::errors::DetectionError;
use jarvis_core::traits::{FeedbackWeighting, NeutralWeighting};
use jarvis_core::types::collections::FxHashMap;
use jarvis_core::types::{
    ConditionSide, EvidencePoint, EvidencePoints, FeatureVector, Pattern, PatternBasis,
    PatternStatus, Signal,
};
use statrs::statistics::Statistics;

use crate::ids::pattern_id;
use crate::ranking::compare_rank;

use super::budget::JobBudget;
use super::classify::{classify, is_favourable};
use super::confidence::{ConfidenceInput, ConfidenceScorer};
use super::narrative::{evidence_line, narrate, NarrativeInput};
use super::stats;
use super::types::{CandidatePattern, DetectionOutcome, DetectionResult};

type Series = BTreeMap<NaiveDate, f64>;

/// One trigger/outcome pairing.
#[derive(Debug, Clone, Copy)]
struct Sample {
    trigger_date: NaiveDate,
    outcome_date: NaiveDate,
    x: f64,
    y: f64,
}

pub struct PatternDetector {
    config: DetectionConfig,
    scorer: ConfidenceScorer,
    weighting: Arc<dyn FeedbackWeighting>,
}

impl PatternDetector {
    pub fn new(config: DetectionConfig) -> Self {
        let scorer = ConfidenceScorer::new(&config);
        Self { config, scorer, weighting: Arc::new(NeutralWeighting) }
    }

    pub fn with_defaults() -> Self {
        Self::new(DetectionConfig::default())
    }

    /// Replace the neutral feedback weighting.
    pub fn with_weighting(mut self, weighting: Arc<dyn FeedbackWeighting>) -> Self {
        self.weighting = weighting;
        self
    }

    pub fn config(&self) -> &DetectionConfig {
        &self.config
    }

    /// Detect associations in `history`. The window ends at the latest day
    /// with an observation. Candidates come back collapsed to one per
    /// unordered signal pair, best first.
    pub fn detect(
        &self,
        user_id: &str,
        history: &[FeatureVector],
        now: DateTime<Utc>,
        budget: &JobBudget,
    ) -> Result<DetectionResult, DetectionError> {
        let Some(window_end) = history
            .iter()
            .filter(|v| v.has_observations())
            .map(|v| v.date)
            .max()
        else {
            return Ok(DetectionResult::insufficient());
        };
        let window_start = window_end - Duration::days(i64::from(self.config.window_days) - 1);

        let mut series: FxHashMap<Signal, Series> = FxHashMap::default();
        let mut observed_days = 0u32;
        for vector in history.iter().filter(|v| v.date >= window_start && v.date <= window_end) {
            if vector.has_observations() {
                observed_days += 1;
            }
            for (signal, value) in vector.raw_signals.iter().filter(|(_, v)| v.is_observed()) {
                series.entry(*signal).or_default().insert(vector.date, value.value);
            }
        }
        if observed_days < self.config.min_samples {
            tracing::debug!(user_id, observed_days, "not enough history to detect patterns");
            return Ok(DetectionResult::insufficient());
        }

        let signals: Vec<Signal> = Signal::ALL.into_iter().filter(|s| series.contains_key(s)).collect();
        let mut best: BTreeMap<(Signal, Signal), CandidatePattern> = BTreeMap::new();
        let mut pairs_examined = 0usize;

        for &trigger in &signals {
            for &outcome in &signals {
                if trigger == outcome {
                    continue;
                }
                for &lag in &self.config.lags {
                    budget.check()?;
                    pairs_examined += 1;
                    let Some(candidate) = self.evaluate(
                        user_id,
                        (trigger, &series[&trigger]),
                        (outcome, &series[&outcome]),
                        lag,
                        window_end,
                        now,
                    ) else {
                        continue;
                    };
                    match best.entry(candidate.pattern.basis.pair_key()) {
                        Entry::Vacant(slot) => {
                            slot.insert(candidate);
                        }
                        Entry::Occupied(mut slot) => {
                            if compare_rank(&candidate.pattern, &slot.get().pattern).is_lt() {
                                slot.insert(candidate);
                            }
                        }
                    }
                }
            }
        }

        let mut candidates: Vec<CandidatePattern> = best.into_values().collect();
        candidates.sort_by(|a, b| compare_rank(&a.pattern, &b.pattern));

        tracing::debug!(
            user_id,
            pairs_examined,
            candidates = candidates.len(),
            %window_end,
            "pattern detection finished"
        );

        Ok(DetectionResult {
            outcome: DetectionOutcome::Completed,
            candidates,
            pairs_examined,
        })
    }

    fn evaluate(
        &self,
        user_id: &str,
        (trigger, trigger_series): (Signal, &Series),
        (outcome, outcome_series): (Signal, &Series),
        lag: u8,
        window_end: NaiveDate,
        now: DateTime<Utc>,
    ) -> Option<CandidatePattern> {
        let config = &self.config;
        let samples: Vec<Sample> = trigger_series
            .iter()
            .filter_map(|(&trigger_date, &x)| {
                let outcome_date = trigger_date + Duration::days(i64::from(lag));
                if outcome_date > window_end {
                    return None;
                }
                outcome_series
                    .get(&outcome_date)
                    .map(|&y| Sample { trigger_date, outcome_date, x, y })
            })
            .collect();

        let n = samples.len();
        if (n as u32) < config.min_samples {
            return None;
        }
        let xs: Vec<f64> = samples.iter().map(|s| s.x).collect();
        let ys: Vec<f64> = samples.iter().map(|s| s.y).collect();

        let r = stats::pearson(&xs, &ys)?;
        if r.abs() < config.min_strength {
            return None;
        }

        // The condition is the minority side of the trigger's mean.
        let mean_x = xs.iter().mean();
        let high = xs.iter().filter(|&&x| x > mean_x).count();
        let low = xs.iter().filter(|&&x| x < mean_x).count();
        let (condition, occurrences) = if high <= low {
            (ConditionSide::High, high)
        } else {
            (ConditionSide::Low, low)
        };
        if (occurrences as u32) < config.min_occurrences {
            return None;
        }

        let p_value = stats::p_value(r, n);
        if p_value > config.max_p_value {
            return None;
        }

        let on_condition: Vec<bool> =
            xs.iter().map(|&x| (x - mean_x) * condition.sign() > 0.0).collect();
        let direction = r.signum() * condition.sign();
        let mean_y = ys.iter().mean();
        let zx = stats::z_scores(&xs);
        let zy = stats::z_scores(&ys);

        let mut supporting: Vec<EvidencePoint> = Vec::new();
        let mut ledger: Vec<(i64, bool)> = Vec::with_capacity(occurrences);
        for (i, sample) in samples.iter().enumerate() {
            if !on_condition[i] {
                continue;
            }
            let supported = (sample.y - mean_y) * direction > 0.0;
            ledger.push(((window_end - sample.outcome_date).num_days(), supported));
            if supported {
                supporting.push(EvidencePoint {
                    trigger_date: sample.trigger_date,
                    trigger_value: sample.x,
                    outcome_date: sample.outcome_date,
                    outcome_value: sample.y,
                    support: (zx[i] * zy[i]).abs(),
                });
            }
        }
        let consistency = self.scorer.consistency(ledger);

        let effect_size = stats::effect_size(&ys, &on_condition);
        let basis = PatternBasis {
            trigger,
            condition,
            outcome,
            lag_days: lag,
            strength: r,
            p_value,
            sample_size: n as u32,
            occurrences: occurrences as u32,
            effect_size,
            window_days: config.window_days,
        };

        let input = ConfidenceInput {
            strength: r,
            sample_size: basis.sample_size,
            consistency,
            multiplier: self.weighting.confidence_multiplier(user_id, &basis),
        };
        let raw_confidence = self.scorer.raw(&input);
        let confidence = self.scorer.score(&input);

        // Strongest support first for the cut, then most recent first.
        supporting.sort_by(|a, b| {
            b.support
                .total_cmp(&a.support)
                .then_with(|| b.outcome_date.cmp(&a.outcome_date))
        });
        supporting.truncate(config.evidence_cap);
        supporting.sort_by(|a, b| b.outcome_date.cmp(&a.outcome_date));
        let evidence_points: EvidencePoints = supporting.into_iter().collect();

        let (on_mean, off_mean) = split_means(&ys, &on_condition);
        let favourable = is_favourable(outcome, direction);
        let narrative = narrate(&NarrativeInput {
            trigger,
            condition,
            outcome,
            lag_days: lag,
            direction,
            favourable,
            outcome_on_condition: on_mean,
            outcome_otherwise: off_mean,
        });

        let pattern = Pattern {
            id: pattern_id(user_id, &basis, 0),
            user_id: user_id.to_string(),
            title: narrative.title,
            dimension: outcome.dimension(),
            pattern_type: classify(outcome, direction, effect_size, basis.occurrences, config),
            confidence,
            discovered: now,
            pattern_text: narrative.pattern_text,
            evidence: evidence_points
                .iter()
                .map(|p| evidence_line(trigger, outcome, lag, p))
                .collect(),
            why_it_matters: narrative.why_it_matters,
            suggestion: narrative.suggestion,
            was_acted_on: false,
            outcome: None,
            status: PatternStatus::Candidate,
            basis,
            evidence_points,
            merged_from: Vec::new(),
        };

        Some(CandidatePattern { pattern, raw_confidence, consistency })
    }
}

fn split_means(values: &[f64], mask: &[bool]) -> (f64, f64) {
    let pick = |want: bool| -> f64 {
        let picked: Vec<f64> = values
            .iter()
            .zip(mask)
            .filter(|(_, &m)| m == want)
            .map(|(v, _)| *v)
            .collect();
        if picked.is_empty() {
            0.0
        } else {
            picked.iter().mean()
        }
    };
    (pick(true), pick(false))
}

#[cfg(test)]
mod tests {
    use super::*;
    use jarvis_core::types::{PatternType, SignalValue};
    use jarvis_core::CancellationToken;

    fn day(n: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 10, 1).unwrap() + Duration::days(i64::from(n) - 1)
    }

    /// Stress high on days 1,3,5,7,9 and sleep short the following night.
    fn stress_sleep_history(days: u32) -> Vec<FeatureVector> {
        let high_stress = [1, 3, 5, 7, 9];
        (1..=days)
            .map(|d| {
                let mut v = FeatureVector::empty("u1", day(d));
                let stress = if high_stress.contains(&d) { 4.0 } else { 2.0 };
                let sleep = if high_stress.contains(&(d - 1)) { 5.5 } else { 7.5 };
                v.raw_signals.insert(Signal::Stress, SignalValue::observed(stress));
                v.raw_signals.insert(Signal::SleepHours, SignalValue::observed(sleep));
                v
            })
            .collect()
    }

    fn now() -> DateTime<Utc> {
        day(15).and_hms_opt(3, 0, 0).unwrap().and_utc()
    }

    #[test]
    fn finds_stress_before_short_sleep() {
        let result = PatternDetector::with_defaults()
            .detect("u1", &stress_sleep_history(14), now(), &JobBudget::unbounded())
            .unwrap();
        assert_eq!(result.outcome, DetectionOutcome::Completed);
        assert_eq!(result.candidates.len(), 1);

        let p = &result.candidates[0].pattern;
        assert_eq!(p.basis.trigger, Signal::Stress);
        assert_eq!(p.basis.outcome, Signal::SleepHours);
        assert_eq!(p.basis.lag_days, 1);
        assert_eq!(p.basis.condition, ConditionSide::High);
        assert!(p.confidence >= 70, "confidence {}", p.confidence);
        assert_eq!(p.pattern_type, PatternType::Alert);
        assert_eq!(p.dimension, jarvis_core::types::Dimension::Physical);
        assert!(p.evidence.len() >= 4);
        assert_eq!(p.evidence[0], "Oct 9: High stress → 5.5h sleep next day");
        assert_eq!(p.evidence.len(), p.evidence_points.len());

        // Capped evidence stays inline.
        let points: &EvidencePoints = &p.evidence_points;
        assert!(!points.spilled());
        assert_eq!(points[0].trigger_date, day(9));
    }

    #[test]
    fn too_few_occurrences_emit_nothing() {
        // Only two high-stress days.
        let history: Vec<FeatureVector> = (1..=14)
            .map(|d| {
                let mut v = FeatureVector::empty("u1", day(d));
                let stress = if d == 3 || d == 8 { 5.0 } else { 2.0 };
                let sleep = if d == 4 || d == 9 { 5.0 } else { 7.5 };
                v.raw_signals.insert(Signal::Stress, SignalValue::observed(stress));
                v.raw_signals.insert(Signal::SleepHours, SignalValue::observed(sleep));
                v
            })
            .collect();
        let result = PatternDetector::with_defaults()
            .detect("u1", &history, now(), &JobBudget::unbounded())
            .unwrap();
        assert!(result.candidates.is_empty());
        assert_eq!(result.outcome, DetectionOutcome::Completed);
    }

    #[test]
    fn short_history_is_insufficient() {
        let result = PatternDetector::with_defaults()
            .detect("u1", &stress_sleep_history(4), now(), &JobBudget::unbounded())
            .unwrap();
        assert_eq!(result.outcome, DetectionOutcome::InsufficientData);
        assert!(result.candidates.is_empty());

        let empty = PatternDetector::with_defaults()
            .detect("u1", &[], now(), &JobBudget::unbounded())
            .unwrap();
        assert_eq!(empty.outcome, DetectionOutcome::InsufficientData);
    }

    #[test]
    fn carried_values_are_ignored() {
        let mut history = stress_sleep_history(14);
        for v in &mut history {
            if let Some(stress) = v.raw_signals.get_mut(&Signal::Stress) {
                *stress = SignalValue::carried(stress.value, 1);
            }
        }
        let result = PatternDetector::with_defaults()
            .detect("u1", &history, now(), &JobBudget::unbounded())
            .unwrap();
        assert!(result.candidates.is_empty());
    }

    #[test]
    fn cancelled_job_stops() {
        let token = CancellationToken::new();
        token.cancel();
        let budget = JobBudget::new(token, std::time::Duration::from_secs(5));
        let err = PatternDetector::with_defaults()
            .detect("u1", &stress_sleep_history(14), now(), &budget)
            .unwrap_err();
        assert!(matches!(err, DetectionError::Cancelled));
    }

    struct Halving;

    impl FeedbackWeighting for Halving {
        fn confidence_multiplier(&self, _user_id: &str, _basis: &PatternBasis) -> f64 {
            0.5
        }
    }

    #[test]
    fn weighting_scales_confidence() {
        let neutral = PatternDetector::with_defaults()
            .detect("u1", &stress_sleep_history(14), now(), &JobBudget::unbounded())
            .unwrap();
        let halved = PatternDetector::with_defaults()
            .with_weighting(Arc::new(Halving))
            .detect("u1", &stress_sleep_history(14), now(), &JobBudget::unbounded())
            .unwrap();
        let full = neutral.candidates[0].pattern.confidence;
        let half = halved.candidates[0].pattern.confidence;
        assert_eq!(half, (f64::from(full) / 2.0).round() as u8);
    }
}
