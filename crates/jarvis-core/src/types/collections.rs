//! Fast hash collections used across crates.

pub use rustc_hash::{FxHashMap, FxHashSet};
