//! Batched background writes for derived data.

pub mod commands;
pub mod writer;

pub use commands::{BatchCommand, FeatureVectorRow};
pub use writer::{apply_command, BatchWriter, WriteStats};
