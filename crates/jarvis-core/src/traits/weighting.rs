//! Hook through which user feedback may later shape confidence.
//!
//! Acted-on feedback is recorded by the insight surface; a weighting
//! implementation turns it into a per-association multiplier. The shipped
//! implementation is neutral.

use crate::types::PatternBasis;

pub trait FeedbackWeighting: Send + Sync {
    /// Multiplier applied to a candidate's raw confidence, clamped to [0, 2].
    fn confidence_multiplier(&self, user_id: &str, basis: &PatternBasis) -> f64;
}

/// Leaves every confidence unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeutralWeighting;

impl FeedbackWeighting for NeutralWeighting {
    fn confidence_multiplier(&self, _user_id: &str, _basis: &PatternBasis) -> f64 {
        1.0
    }
}
