//! Wire and domain types shared by every JARVIS crate.
//!
//! The `Pattern` and `PatternFilters` shapes here are the JSON contract the
//! front end consumes; they are defined once and reused everywhere.

pub mod collections;
pub mod dimension;
pub mod feature;
pub mod feedback;
pub mod filters;
pub mod log;
pub mod pagination;
pub mod pattern;
pub mod profile;
pub mod run;
pub mod signal;

pub use dimension::Dimension;
pub use feature::{FeatureVector, Freshness, SignalValue};
pub use feedback::{FeedbackAction, PatternFeedback};
pub use filters::{PatternFilters, Timeframe};
pub use log::{LogEntry, LogKind, NewLogEntry};
pub use pagination::{Page, PageRequest};
pub use pattern::{
    ConditionSide, EvidencePoint, EvidencePoints, HistoricalPattern, Pattern, PatternBasis,
    PatternStatus, PatternType,
};
pub use profile::{ProfileUpdate, UserProfile, RETAIN_FOREVER};
pub use run::{DetectionRun, RunOutcome};
pub use signal::{Polarity, Signal, SignalKind};
