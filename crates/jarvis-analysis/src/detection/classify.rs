//! Pattern type lookup. Confidence plays no part.

use jarvis_core::config::DetectionConfig;
use jarvis_core::types::{Polarity, PatternType, Signal};

/// Whether the outcome moving in `direction` (+1 up, -1 down) is good news.
pub fn is_favourable(outcome: Signal, direction: f64) -> bool {
    match outcome.polarity() {
        Polarity::HigherIsBetter => direction > 0.0,
        Polarity::HigherIsWorse => direction < 0.0,
    }
}

/// Good predicted outcome → positive. Bad → warning, or alert when the
/// effect is large and recurring.
pub fn classify(
    outcome: Signal,
    direction: f64,
    effect_size: f64,
    occurrences: u32,
    config: &DetectionConfig,
) -> PatternType {
    if is_favourable(outcome, direction) {
        PatternType::Positive
    } else if effect_size.abs() >= config.alert_effect_size
        && occurrences >= config.alert_min_occurrences
    {
        PatternType::Alert
    } else {
        PatternType::Warning
    }
}
