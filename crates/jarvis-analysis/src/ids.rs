//! Stable pattern ids.
//!
//! The same association for the same user always hashes to the same id, so
//! feedback survives re-detection. A retired association that re-emerges is
//! given the next generation.

use jarvis_core::types::PatternBasis;
use xxhash_rust::xxh3::xxh3_64;

pub fn pattern_id(user_id: &str, basis: &PatternBasis, generation: u32) -> String {
    let key = format!(
        "{user_id}|{}|{}|{}|{}|{generation}",
        basis.trigger,
        basis.condition.name(),
        basis.outcome,
        basis.lag_days
    );
    format!("pat_{:016x}", xxh3_64(key.as_bytes()))
}
