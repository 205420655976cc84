//! Patterns: the insight contract served to the front end.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::constants::MAX_EVIDENCE;
use crate::errors::InsightError;

use super::dimension::Dimension;
use super::signal::Signal;

/// Severity of a pattern. Derived from signal polarity and effect size,
/// never from confidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatternType {
    Positive,
    Warning,
    Alert,
}

impl PatternType {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Positive => "positive",
            Self::Warning => "warning",
            Self::Alert => "alert",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "positive" => Some(Self::Positive),
            "warning" => Some(Self::Warning),
            "alert" => Some(Self::Alert),
            _ => None,
        }
    }
}

impl fmt::Display for PatternType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Pattern lifecycle: `Candidate -> Active -> (ActedOn | Stale)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternStatus {
    /// Emitted by the detector, not yet published.
    #[default]
    Candidate,
    /// Published and visible.
    Active,
    /// The user acted on it. Sticky.
    ActedOn,
    /// Retired. Hidden from queries, kept for audit.
    Stale,
}

impl PatternStatus {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Candidate => "candidate",
            Self::Active => "active",
            Self::ActedOn => "acted_on",
            Self::Stale => "stale",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "candidate" => Some(Self::Candidate),
            "active" => Some(Self::Active),
            "acted_on" => Some(Self::ActedOn),
            "stale" => Some(Self::Stale),
            _ => None,
        }
    }

    pub fn is_visible(&self) -> bool {
        matches!(self, Self::Active | Self::ActedOn)
    }

    pub fn can_transition_to(&self, target: Self) -> bool {
        use PatternStatus::*;
        match (self, target) {
            (a, b) if *a == b => true,
            (Candidate, Active) => true,
            (Active, ActedOn) => true,
            (Candidate | Active | ActedOn, Stale) => true,
            _ => false,
        }
    }
}

impl fmt::Display for PatternStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Which side of the trigger signal's mean counts as "the condition".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConditionSide {
    High,
    Low,
}

impl ConditionSide {
    pub fn sign(&self) -> f64 {
        match self {
            Self::High => 1.0,
            Self::Low => -1.0,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Low => "low",
        }
    }
}

/// The statistical association a pattern describes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatternBasis {
    pub trigger: Signal,
    pub condition: ConditionSide,
    pub outcome: Signal,
    /// 0 = same day, 1 = outcome measured the next day.
    pub lag_days: u8,
    /// Correlation coefficient, signed.
    pub strength: f64,
    pub p_value: f64,
    pub sample_size: u32,
    pub occurrences: u32,
    /// Standardised difference of the outcome between condition and other days.
    pub effect_size: f64,
    pub window_days: u32,
}

impl PatternBasis {
    /// Unordered signal pair; two patterns with the same key describe the
    /// same association.
    pub fn pair_key(&self) -> (Signal, Signal) {
        if self.trigger <= self.outcome {
            (self.trigger, self.outcome)
        } else {
            (self.outcome, self.trigger)
        }
    }
}

/// One dated trigger/outcome observation backing a pattern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvidencePoint {
    pub trigger_date: NaiveDate,
    pub trigger_value: f64,
    pub outcome_date: NaiveDate,
    pub outcome_value: f64,
    /// |z_trigger * z_outcome|
    pub support: f64,
}

impl EvidencePoint {
    pub fn key(&self) -> String {
        format!("{}>{}", self.trigger_date, self.outcome_date)
    }

    /// Feature-vector dates this point depends on.
    pub fn dates(&self) -> [NaiveDate; 2] {
        [self.trigger_date, self.outcome_date]
    }
}

pub type EvidencePoints = SmallVec<[EvidencePoint; MAX_EVIDENCE]>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pattern {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub dimension: Dimension,
    #[serde(rename = "type")]
    pub pattern_type: PatternType,
    /// 0-100.
    pub confidence: u8,
    pub discovered: DateTime<Utc>,
    #[serde(rename = "pattern", alias = "patternText")]
    pub pattern_text: String,
    pub evidence: Vec<String>,
    pub why_it_matters: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    #[serde(default)]
    pub was_acted_on: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<String>,
    #[serde(default)]
    pub status: PatternStatus,
    pub basis: PatternBasis,
    #[serde(default)]
    pub evidence_points: EvidencePoints,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub merged_from: Vec<String>,
}

impl Pattern {
    pub fn transition(&mut self, target: PatternStatus) -> Result<(), InsightError> {
        if !self.status.can_transition_to(target) {
            return Err(InsightError::InvalidTransition {
                from: self.status.to_string(),
                to: target.to_string(),
            });
        }
        self.status = target;
        Ok(())
    }

    /// Record that the user acted on this pattern. Confidence is untouched.
    pub fn mark_acted_on(&mut self, outcome: Option<String>) -> Result<(), InsightError> {
        self.transition(PatternStatus::ActedOn)?;
        self.was_acted_on = true;
        if outcome.is_some() {
            self.outcome = outcome;
        }
        Ok(())
    }

    pub fn is_visible(&self) -> bool {
        self.status.is_visible()
    }

    pub fn evidence_keys(&self) -> FxHashSet<String> {
        self.evidence_points.iter().map(EvidencePoint::key).collect()
    }

    /// Latest date any evidence point refers to.
    pub fn latest_evidence_date(&self) -> Option<NaiveDate> {
        self.evidence_points.iter().map(|p| p.outcome_date.max(p.trigger_date)).max()
    }
}

/// `progressAPI.getHistoricalPatterns` shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoricalPattern {
    pub id: String,
    pub title: String,
    pub dimension: Dimension,
    pub discovered_date: DateTime<Utc>,
    pub was_acted_on: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<String>,
    pub status: PatternStatus,
}

impl From<&Pattern> for HistoricalPattern {
    fn from(p: &Pattern) -> Self {
        Self {
            id: p.id.clone(),
            title: p.title.clone(),
            dimension: p.dimension,
            discovered_date: p.discovered,
            was_acted_on: p.was_acted_on,
            outcome: p.outcome.clone(),
            status: p.status,
        }
    }
}
