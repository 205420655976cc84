//! Shared traits used across JARVIS crates.

pub mod cancellation;
pub mod weighting;

pub use cancellation::CancellationToken;
pub use weighting::{FeedbackWeighting, NeutralWeighting};
