//! Confidence scoring for detected associations.
//!
//! `100 · |r| · min(1, n / saturation) · (floor + (1 − floor) · consistency)`,
//! times the feedback multiplier, clamped to 0-100.

use jarvis_core::config::DetectionConfig;
use jarvis_core::constants::{CONFIDENCE_MAX, CONFIDENCE_MIN};

/// Everything the score depends on.
#[derive(Debug, Clone, Copy)]
pub struct ConfidenceInput {
    /// Correlation coefficient, any sign.
    pub strength: f64,
    pub sample_size: u32,
    /// Recency-weighted share of occurrences that went the predicted way.
    pub consistency: f64,
    /// From the feedback weighting hook, 1.0 when neutral.
    pub multiplier: f64,
}

#[derive(Debug, Clone)]
pub struct ConfidenceScorer {
    sample_saturation: f64,
    consistency_floor: f64,
    half_life_days: f64,
}

impl ConfidenceScorer {
    pub fn new(config: &DetectionConfig) -> Self {
        Self {
            sample_saturation: config.sample_saturation,
            consistency_floor: config.consistency_floor,
            half_life_days: config.recency_half_life_days,
        }
    }

    /// Unrounded score before clamping.
    pub fn raw(&self, input: &ConfidenceInput) -> f64 {
        let sample_factor = (f64::from(input.sample_size) / self.sample_saturation).min(1.0);
        let consistency = input.consistency.clamp(0.0, 1.0);
        let consistency_factor = self.consistency_floor + (1.0 - self.consistency_floor) * consistency;
        100.0 * input.strength.abs() * sample_factor * consistency_factor * input.multiplier.clamp(0.0, 2.0)
    }

    pub fn score(&self, input: &ConfidenceInput) -> u8 {
        let raw = self.raw(input);
        if !raw.is_finite() {
            return CONFIDENCE_MIN;
        }
        raw.round().clamp(f64::from(CONFIDENCE_MIN), f64::from(CONFIDENCE_MAX)) as u8
    }

    /// Weight of an observation `age_days` before the window end.
    pub fn recency_weight(&self, age_days: i64) -> f64 {
        0.5_f64.powf(age_days.max(0) as f64 / self.half_life_days)
    }

    /// Recency-weighted share of `(age_days, supported)` occurrences that
    /// supported the association. Zero when there are none.
    pub fn consistency(&self, occurrences: impl IntoIterator<Item = (i64, bool)>) -> f64 {
        let (hit, total) = occurrences.into_iter().fold((0.0, 0.0), |(hit, total), (age, supported)| {
            let w = self.recency_weight(age);
            (if supported { hit + w } else { hit }, total + w)
        });
        if total > 0.0 {
            hit / total
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scorer() -> ConfidenceScorer {
        ConfidenceScorer::new(&DetectionConfig::default())
    }

    fn input(strength: f64, sample_size: u32, consistency: f64) -> ConfidenceInput {
        ConfidenceInput { strength, sample_size, consistency, multiplier: 1.0 }
    }

    #[test]
    fn strong_consistent_association_scores_high() {
        assert_eq!(scorer().score(&input(-1.0, 13, 1.0)), 100);
        assert_eq!(scorer().score(&input(0.8, 10, 1.0)), 80);
    }

    #[test]
    fn small_samples_and_inconsistency_discount() {
        let s = scorer();
        assert_eq!(s.score(&input(0.8, 5, 1.0)), 40);
        assert_eq!(s.score(&input(0.8, 10, 0.0)), 20);
    }

    #[test]
    fn multiplier_is_clamped() {
        let s = scorer();
        let boosted = ConfidenceInput { multiplier: 10.0, ..input(0.6, 10, 1.0) };
        assert_eq!(s.score(&boosted), 100);
        let muted = ConfidenceInput { multiplier: -3.0, ..input(0.6, 10, 1.0) };
        assert_eq!(s.score(&muted), 0);
    }

    #[test]
    fn recent_occurrences_weigh_more() {
        let s = scorer();
        assert!((s.recency_weight(14) - 0.5).abs() < 1e-12);
        let recent_hit = s.consistency([(0, true), (14, false)]);
        let old_hit = s.consistency([(0, false), (14, true)]);
        assert!(recent_hit > 0.5 && old_hit < 0.5);
        assert_eq!(s.consistency(std::iter::empty()), 0.0);
    }
}
