//! Ranking, deduplication, and lifecycle reconciliation of patterns.

pub mod ranker;
pub mod reconcile;
pub mod similarity;

pub use ranker::{compare_rank, PatternRanker};
pub use reconcile::{Reconciliation, Reconciler};
pub use similarity::jaccard;
