//! # jarvis-analysis
//!
//! The insight engine proper. Per user, strictly sequential:
//! log entries → [`features`] → [`detection`] → [`ranking`] → patterns.
//! Nothing here touches storage; [`pipeline`] ties the stages together.

pub mod detection;
pub mod features;
#[cfg(test)]
pub(crate) mod fixtures;
pub mod ids;
pub mod pipeline;
pub mod ranking;

pub use detection::{CandidatePattern, DetectionOutcome, JobBudget, PatternDetector};
pub use features::{FeatureExtractor, RangeExtraction};
pub use pipeline::{PatternPipeline, PipelineInput, PipelineOutput};
pub use ranking::{PatternRanker, Reconciler, Reconciliation};
