//! Per-day feature vectors derived from log history.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::dimension::Dimension;
use super::signal::Signal;

/// Whether a signal value was logged that day or carried from an earlier one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Freshness {
    Observed,
    Carried { age_days: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignalValue {
    pub value: f64,
    pub freshness: Freshness,
}

impl SignalValue {
    pub fn observed(value: f64) -> Self {
        Self { value, freshness: Freshness::Observed }
    }

    pub fn carried(value: f64, age_days: u32) -> Self {
        Self { value, freshness: Freshness::Carried { age_days } }
    }

    pub fn is_observed(&self) -> bool {
        matches!(self.freshness, Freshness::Observed)
    }
}

/// One user's signals for one calendar day. Dimension scores are 0-10 and
/// absent when no signal of that dimension is available.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureVector {
    pub user_id: String,
    pub date: NaiveDate,
    pub physical_score: Option<f64>,
    pub mental_score: Option<f64>,
    pub spiritual_score: Option<f64>,
    pub raw_signals: BTreeMap<Signal, SignalValue>,
}

impl FeatureVector {
    pub fn empty(user_id: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            user_id: user_id.into(),
            date,
            physical_score: None,
            mental_score: None,
            spiritual_score: None,
            raw_signals: BTreeMap::new(),
        }
    }

    /// Value of `signal` only if it was logged on this day.
    pub fn observed(&self, signal: Signal) -> Option<f64> {
        self.raw_signals
            .get(&signal)
            .filter(|v| v.is_observed())
            .map(|v| v.value)
    }

    pub fn score(&self, dimension: Dimension) -> Option<f64> {
        match dimension {
            Dimension::Physical => self.physical_score,
            Dimension::Mental => self.mental_score,
            Dimension::Spiritual => self.spiritual_score,
        }
    }

    pub fn has_observations(&self) -> bool {
        self.raw_signals.values().any(SignalValue::is_observed)
    }
}
