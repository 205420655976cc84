//! Feature extraction: raw log entries → per-day signal vectors.
//!
//! - [`mapping`] turns one entry's answers into signal observations
//! - [`extractor`] aggregates observations per day, carries values forward,
//!   and scores each dimension
//! - [`questions`] is the time-of-day quick-log question lookup

pub mod extractor;
pub mod mapping;
pub mod questions;

pub use extractor::{FeatureExtractor, RangeExtraction};
pub use mapping::{map_entry, Observation};
pub use questions::{contextual_questions, AnswerOption, ContextualQuestion};
