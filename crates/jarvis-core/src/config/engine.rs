//! Feature extraction, detection, and ranking settings.

use serde::{Deserialize, Serialize};

use crate::constants::MAX_EVIDENCE;
use crate::errors::ConfigError;

use super::invalid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    /// Days a missing signal carries its last value before becoming absent.
    pub staleness_days: u32,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self { staleness_days: 3 }
    }
}

impl FeatureConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.staleness_days > 14 {
            return Err(invalid("features.staleness_days", "must be at most 14"));
        }
        Ok(())
    }
}

/// Association thresholds and confidence coefficients.
///
/// `confidence = clamp(100 * |r| * min(1, n / sample_saturation)
///               * (consistency_floor + (1 - consistency_floor) * consistency), 0, 100)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Trailing days of history examined.
    pub window_days: u32,
    /// Day offsets between trigger and outcome.
    pub lags: Vec<u8>,
    /// Minimum |r|.
    pub min_strength: f64,
    /// Minimum paired observations.
    pub min_samples: u32,
    /// Minimum days on which the trigger condition held.
    pub min_occurrences: u32,
    /// Two-sided Student-t significance cut-off.
    pub max_p_value: f64,
    pub evidence_cap: usize,
    /// Sample size at which the sample factor saturates at 1.
    pub sample_saturation: f64,
    pub recency_half_life_days: f64,
    pub consistency_floor: f64,
    /// Standardised effect size from which a bad outcome is an alert.
    pub alert_effect_size: f64,
    /// Occurrences from which a bad outcome counts as recurring.
    pub alert_min_occurrences: u32,
    /// Per-user detection budget.
    pub timeout_ms: u64,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            window_days: 21,
            lags: vec![0, 1],
            min_strength: 0.5,
            min_samples: 6,
            min_occurrences: 3,
            max_p_value: 0.10,
            evidence_cap: MAX_EVIDENCE,
            sample_saturation: 10.0,
            recency_half_life_days: 14.0,
            consistency_floor: 0.25,
            alert_effect_size: 1.5,
            alert_min_occurrences: 4,
            timeout_ms: 5_000,
        }
    }
}

impl DetectionConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window_days < 2 || self.window_days > 365 {
            return Err(invalid("detection.window_days", "must be within 2..=365"));
        }
        if self.lags.is_empty() || self.lags.iter().any(|&l| l > 3) {
            return Err(invalid("detection.lags", "must be non-empty, each at most 3"));
        }
        if !(self.min_strength > 0.0 && self.min_strength <= 1.0) {
            return Err(invalid("detection.min_strength", "must be within (0, 1]"));
        }
        if self.min_samples < 3 {
            return Err(invalid("detection.min_samples", "must be at least 3"));
        }
        if self.min_occurrences < 1 {
            return Err(invalid("detection.min_occurrences", "must be at least 1"));
        }
        if !(self.max_p_value > 0.0 && self.max_p_value <= 1.0) {
            return Err(invalid("detection.max_p_value", "must be within (0, 1]"));
        }
        if self.evidence_cap == 0 || self.evidence_cap > MAX_EVIDENCE {
            return Err(invalid("detection.evidence_cap", format!("must be within 1..={MAX_EVIDENCE}")));
        }
        if self.sample_saturation < 1.0 {
            return Err(invalid("detection.sample_saturation", "must be at least 1"));
        }
        if self.recency_half_life_days <= 0.0 {
            return Err(invalid("detection.recency_half_life_days", "must be positive"));
        }
        if !(0.0..=1.0).contains(&self.consistency_floor) {
            return Err(invalid("detection.consistency_floor", "must be within [0, 1]"));
        }
        if self.timeout_ms == 0 {
            return Err(invalid("detection.timeout_ms", "must be positive"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RankingConfig {
    /// Evidence-set Jaccard similarity from which two patterns merge.
    pub jaccard_threshold: f64,
    /// Confidence below which a pattern is not published, or retired.
    pub revalidation_threshold: u8,
    /// Evidence older than this many days no longer backs a pattern.
    pub retention_days: u32,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            jaccard_threshold: 0.5,
            revalidation_threshold: 40,
            retention_days: 90,
        }
    }
}

impl RankingConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.jaccard_threshold > 0.0 && self.jaccard_threshold <= 1.0) {
            return Err(invalid("ranking.jaccard_threshold", "must be within (0, 1]"));
        }
        if self.revalidation_threshold > 100 {
            return Err(invalid("ranking.revalidation_threshold", "must be at most 100"));
        }
        if self.retention_days == 0 {
            return Err(invalid("ranking.retention_days", "must be positive"));
        }
        Ok(())
    }
}
