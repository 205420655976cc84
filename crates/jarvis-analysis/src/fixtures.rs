//! Pattern builders shared by unit tests.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use jarvis_core::types::{
    ConditionSide, EvidencePoint, Pattern, PatternBasis, PatternStatus, PatternType, Signal,
};

pub fn discovered() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 10, 20, 3, 0, 0).unwrap()
}

pub fn oct(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 10, day).unwrap()
}

/// A candidate whose evidence cites trigger days `evidence_days` of
/// October 2024, outcomes the day after.
pub fn pattern(
    id: &str,
    trigger: Signal,
    outcome: Signal,
    confidence: u8,
    evidence_days: &[u32],
) -> Pattern {
    Pattern {
        id: id.into(),
        user_id: "u1".into(),
        title: id.into(),
        dimension: outcome.dimension(),
        pattern_type: PatternType::Warning,
        confidence,
        discovered: discovered(),
        pattern_text: String::new(),
        evidence: evidence_days.iter().map(|d| format!("Oct {d}")).collect(),
        why_it_matters: String::new(),
        suggestion: None,
        was_acted_on: false,
        outcome: None,
        status: PatternStatus::Candidate,
        basis: PatternBasis {
            trigger,
            condition: ConditionSide::High,
            outcome,
            lag_days: 1,
            strength: 0.8,
            p_value: 0.01,
            sample_size: 12,
            occurrences: 4,
            effect_size: 1.0,
            window_days: 21,
        },
        evidence_points: evidence_days
            .iter()
            .map(|&d| EvidencePoint {
                trigger_date: oct(d),
                trigger_value: 4.0,
                outcome_date: oct(d + 1),
                outcome_value: 5.0,
                support: 1.0,
            })
            .collect(),
        merged_from: Vec::new(),
    }
}
