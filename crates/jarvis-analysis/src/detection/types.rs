//! Detector output types.

use jarvis_core::types::{Pattern, PatternStatus};
use serde::Serialize;

/// A detected association not yet ranked or published.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidatePattern {
    /// Fully narrated pattern in `Candidate` status.
    pub pattern: Pattern,
    /// Score before rounding and clamping.
    pub raw_confidence: f64,
    pub consistency: f64,
}

impl From<CandidatePattern> for Pattern {
    fn from(candidate: CandidatePattern) -> Self {
        let mut pattern = candidate.pattern;
        pattern.status = PatternStatus::Candidate;
        pattern
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionOutcome {
    Completed,
    /// Too few observed days to correlate anything.
    InsufficientData,
}

impl DetectionOutcome {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::InsufficientData => "insufficient_data",
        }
    }
}

#[derive(Debug, Clone)]
pub struct DetectionResult {
    pub outcome: DetectionOutcome,
    /// At most one per unordered signal pair.
    pub candidates: Vec<CandidatePattern>,
    /// Signal pairs × lags correlated.
    pub pairs_examined: usize,
}

impl DetectionResult {
    pub fn insufficient() -> Self {
        Self {
            outcome: DetectionOutcome::InsufficientData,
            candidates: Vec::new(),
            pairs_examined: 0,
        }
    }
}
