//! Evidence-set similarity.

use std::hash::Hash;

use rustc_hash::FxHashSet;

/// Jaccard similarity of two sets. Two empty sets are not similar.
pub fn jaccard<T: Eq + Hash>(a: &FxHashSet<T>, b: &FxHashSet<T>) -> f64 {
    let intersection = a.intersection(b).count();
    let union = a.len() + b.len() - intersection;
    if union == 0 {
        return 0.0;
    }
    intersection as f64 / union as f64
}
