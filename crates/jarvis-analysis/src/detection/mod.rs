//! Pattern detection: lagged signal correlations over a trailing window.
//!
//! Pipeline per user: pair observed signal series → correlate → gate on
//! strength, samples, occurrences, significance → score confidence →
//! classify → narrate → collapse same-pair duplicates.

pub mod budget;
pub mod classify;
pub mod confidence;
pub mod detector;
pub mod narrative;
pub mod stats;
pub mod types;

pub use budget::JobBudget;
pub use confidence::{ConfidenceInput, ConfidenceScorer};
pub use detector::PatternDetector;
pub use types::{CandidatePattern, DetectionOutcome, DetectionResult};
