//! Answer → signal value mapping.
//!
//! Categorical answers go through fixed tables; numeric answers are range
//! checked. An entry with any unusable recognised value is rejected whole so
//! a half-read entry never skews a day's average.

use jarvis_core::errors::{IngestionWarning, WarningKind};
use jarvis_core::types::{LogEntry, LogKind, Signal};
use serde_json::Value;
use smallvec::SmallVec;

/// One signal reading taken from a log entry.
pub type Observation = (Signal, f64);

/// Recognised answer keys and the signal each feeds.
const FIELD_SIGNALS: &[(&str, Signal)] = &[
    ("mood", Signal::Mood),
    ("overallMood", Signal::OverallMood),
    ("energy", Signal::Energy),
    ("energy-evening", Signal::EnergyEvening),
    ("energyEvening", Signal::EnergyEvening),
    ("sleep", Signal::SleepHours),
    ("sleepHours", Signal::SleepHours),
    ("focus", Signal::Focus),
    ("stress", Signal::Stress),
    ("workout", Signal::Workout),
    ("meetings", Signal::Meetings),
];

/// Normalise an answer token: lowercase, `_` and spaces become `-`.
fn normalize_token(raw: &str) -> String {
    raw.trim()
        .to_lowercase()
        .chars()
        .map(|c| if c == '_' || c == ' ' { '-' } else { c })
        .collect()
}

fn level_value(token: &str) -> Option<f64> {
    match token {
        "very-low" => Some(1.0),
        "low" => Some(2.0),
        "medium" => Some(3.0),
        "high" => Some(4.0),
        "very-high" => Some(5.0),
        _ => None,
    }
}

fn sleep_quality_hours(token: &str) -> Option<f64> {
    match token {
        "good" => Some(8.0),
        "okay" => Some(6.5),
        "restless" => Some(5.5),
        "poor" => Some(5.0),
        _ => None,
    }
}

fn workout_value(token: &str) -> Option<f64> {
    match token {
        "full" | "light" | "movement" => Some(1.0),
        "rest" => Some(0.0),
        _ => None,
    }
}

fn categorical(signal: Signal, token: &str) -> Option<f64> {
    match signal {
        Signal::SleepHours => sleep_quality_hours(token),
        Signal::Workout => workout_value(token),
        Signal::EnergyEvening if token == "empty" => Some(1.0),
        Signal::Energy | Signal::EnergyEvening | Signal::Focus | Signal::Stress => {
            level_value(token)
        }
        _ => None,
    }
}

fn map_value(entry_id: &str, key: &str, signal: Signal, value: &Value) -> Result<f64, IngestionWarning> {
    let numeric = match value {
        Value::Number(n) => n.as_f64(),
        Value::Bool(b) if signal == Signal::Workout => Some(if *b { 1.0 } else { 0.0 }),
        Value::String(s) => {
            let token = normalize_token(s);
            match categorical(signal, &token) {
                Some(v) => return Ok(v),
                None => token.parse::<f64>().ok(),
            }
        }
        _ => None,
    };

    let Some(v) = numeric.filter(|v| v.is_finite()) else {
        return Err(IngestionWarning::new(
            entry_id,
            WarningKind::UnrecognizedValue,
            Some(key),
            format!("cannot map {value} onto {}", signal.label()),
        ));
    };

    let (lo, hi) = signal.range();
    if v < lo || v > hi {
        return Err(IngestionWarning::new(
            entry_id,
            WarningKind::OutOfRange,
            Some(key),
            format!("{v} outside {lo}..={hi}"),
        ));
    }
    Ok(v)
}

/// Key an entry of `kind` must carry, if any.
fn required_field(kind: LogKind) -> Option<&'static str> {
    match kind {
        LogKind::MorningMood => Some("mood"),
        LogKind::EndOfDay => Some("overallMood"),
        LogKind::QuickLog => None,
    }
}

/// Map every recognised answer of `entry`. Unknown keys (notes, context,
/// free text) are ignored.
pub fn map_entry(entry: &LogEntry) -> Result<SmallVec<[Observation; 4]>, IngestionWarning> {
    if let Some(required) = required_field(entry.kind) {
        if entry.field(required).map_or(true, Value::is_null) {
            return Err(IngestionWarning::new(
                &entry.id,
                WarningKind::MissingField,
                Some(required),
                format!("{} entries require '{required}'", entry.kind),
            ));
        }
    }

    let mut observations: SmallVec<[Observation; 4]> = SmallVec::new();
    for (key, signal) in FIELD_SIGNALS {
        let Some(value) = entry.field(key) else {
            continue;
        };
        if value.is_null() {
            continue;
        }
        observations.push((*signal, map_value(&entry.id, key, *signal, value)?));
    }

    if observations.is_empty() {
        return Err(IngestionWarning::new(
            &entry.id,
            WarningKind::NoSignals,
            None,
            "no recognised answers",
        ));
    }
    Ok(observations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    fn entry(kind: LogKind, data: Value) -> LogEntry {
        LogEntry {
            id: "e1".into(),
            user_id: "u1".into(),
            kind,
            timestamp: Utc.with_ymd_and_hms(2024, 10, 22, 9, 0, 0).unwrap(),
            dimension_hints: Default::default(),
            fields: data.as_object().cloned().unwrap_or_default(),
        }
    }

    #[test]
    fn maps_categorical_answers() {
        let e = entry(
            LogKind::QuickLog,
            json!({"energy": "very_high", "sleep": "restless", "workout": "movement", "context": "gym"}),
        );
        let obs = map_entry(&e).unwrap();
        assert!(obs.contains(&(Signal::Energy, 5.0)));
        assert!(obs.contains(&(Signal::SleepHours, 5.5)));
        assert!(obs.contains(&(Signal::Workout, 1.0)));
        assert_eq!(obs.len(), 3);
    }

    #[test]
    fn evening_energy_accepts_empty() {
        let e = entry(LogKind::QuickLog, json!({"energy-evening": "Empty"}));
        assert_eq!(map_entry(&e).unwrap().as_slice(), &[(Signal::EnergyEvening, 1.0)]);
    }

    #[test]
    fn morning_mood_requires_mood() {
        let e = entry(LogKind::MorningMood, json!({"energy": "high"}));
        let w = map_entry(&e).unwrap_err();
        assert_eq!(w.kind, WarningKind::MissingField);
        assert_eq!(w.field.as_deref(), Some("mood"));
    }

    #[test]
    fn rejects_out_of_range_and_unknown_answers() {
        let e = entry(LogKind::MorningMood, json!({"mood": 9}));
        assert_eq!(map_entry(&e).unwrap_err().kind, WarningKind::OutOfRange);

        let e = entry(LogKind::QuickLog, json!({"stress": "apocalyptic"}));
        assert_eq!(map_entry(&e).unwrap_err().kind, WarningKind::UnrecognizedValue);

        let e = entry(LogKind::QuickLog, json!({"notes": "fine"}));
        assert_eq!(map_entry(&e).unwrap_err().kind, WarningKind::NoSignals);
    }
}
