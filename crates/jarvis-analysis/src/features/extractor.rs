//! Daily feature vectors with bounded carry-forward.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{Duration, NaiveDate};
use jarvis_core::config::FeatureConfig;
use jarvis_core::errors::IngestionWarning;
use jarvis_core::types::{Dimension, FeatureVector, LogEntry, Signal, SignalValue};

use super::mapping::map_entry;

/// Result of extracting a date range.
#[derive(Debug, Clone, Default)]
pub struct RangeExtraction {
    /// One vector per day of the range, oldest first.
    pub vectors: Vec<FeatureVector>,
    /// Skipped entries. Non-fatal.
    pub warnings: Vec<IngestionWarning>,
    /// Every day with at least one usable entry, in or out of the range.
    pub observed_dates: BTreeSet<NaiveDate>,
}

/// Per-signal daily means.
type SignalSeries = BTreeMap<Signal, BTreeMap<NaiveDate, f64>>;

pub struct FeatureExtractor {
    config: FeatureConfig,
}

impl FeatureExtractor {
    pub fn new(config: FeatureConfig) -> Self {
        Self { config }
    }

    pub fn with_defaults() -> Self {
        Self::new(FeatureConfig::default())
    }

    /// Feature vector for a single day.
    pub fn extract(
        &self,
        user_id: &str,
        logs: &[LogEntry],
        date: NaiveDate,
    ) -> (FeatureVector, Vec<IngestionWarning>) {
        let mut range = self.extract_range(user_id, logs, date, date);
        let vector = range
            .vectors
            .pop()
            .unwrap_or_else(|| FeatureVector::empty(user_id, date));
        (vector, range.warnings)
    }

    /// One vector per day in `from..=to`. Entry order does not matter.
    pub fn extract_range(
        &self,
        user_id: &str,
        logs: &[LogEntry],
        from: NaiveDate,
        to: NaiveDate,
    ) -> RangeExtraction {
        let (series, warnings, observed_dates) = daily_means(logs);

        let mut vectors = Vec::new();
        let mut day = from;
        while day <= to {
            vectors.push(self.vector_for(user_id, &series, day));
            day += Duration::days(1);
        }

        RangeExtraction { vectors, warnings, observed_dates }
    }

    fn vector_for(&self, user_id: &str, series: &SignalSeries, day: NaiveDate) -> FeatureVector {
        let mut vector = FeatureVector::empty(user_id, day);
        let staleness = i64::from(self.config.staleness_days);

        for (signal, days) in series {
            if let Some(&value) = days.get(&day) {
                vector.raw_signals.insert(*signal, SignalValue::observed(value));
                continue;
            }
            if let Some((last, &value)) = days.range(..day).next_back() {
                let age = (day - *last).num_days();
                if age <= staleness {
                    vector.raw_signals.insert(*signal, SignalValue::carried(value, age as u32));
                }
            }
        }

        vector.physical_score = dimension_score(&vector, Dimension::Physical);
        vector.mental_score = dimension_score(&vector, Dimension::Mental);
        vector.spiritual_score = dimension_score(&vector, Dimension::Spiritual);
        vector
    }
}

/// Mean of the dimension's available signals, normalised onto 0-10.
fn dimension_score(vector: &FeatureVector, dimension: Dimension) -> Option<f64> {
    let (sum, count) = vector
        .raw_signals
        .iter()
        .filter(|(signal, _)| signal.dimension() == dimension)
        .fold((0.0, 0u32), |(sum, count), (signal, v)| {
            (sum + signal.normalize(v.value) * 10.0, count + 1)
        });
    if count == 0 {
        return None;
    }
    Some((sum / f64::from(count) * 100.0).round() / 100.0)
}

fn daily_means(logs: &[LogEntry]) -> (SignalSeries, Vec<IngestionWarning>, BTreeSet<NaiveDate>) {
    let mut ordered: Vec<&LogEntry> = logs.iter().collect();
    ordered.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then_with(|| a.id.cmp(&b.id)));

    let mut sums: BTreeMap<Signal, BTreeMap<NaiveDate, (f64, u32)>> = BTreeMap::new();
    let mut warnings = Vec::new();
    let mut observed_dates = BTreeSet::new();

    for entry in ordered {
        match map_entry(entry) {
            Ok(observations) => {
                let date = entry.date();
                observed_dates.insert(date);
                for (signal, value) in observations {
                    let slot = sums.entry(signal).or_default().entry(date).or_insert((0.0, 0));
                    slot.0 += value;
                    slot.1 += 1;
                }
            }
            Err(warning) => {
                tracing::warn!(
                    entry_id = %warning.entry_id,
                    kind = warning.kind.name(),
                    "skipping log entry: {}",
                    warning.reason
                );
                warnings.push(warning);
            }
        }
    }

    let series = sums
        .into_iter()
        .map(|(signal, days)| {
            let means = days
                .into_iter()
                .map(|(date, (sum, count))| (date, sum / f64::from(count)))
                .collect();
            (signal, means)
        })
        .collect();

    (series, warnings, observed_dates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use jarvis_core::types::{Freshness, LogKind};
    use serde_json::json;

    fn log(id: &str, day: u32, hour: u32, data: serde_json::Value) -> LogEntry {
        LogEntry {
            id: id.into(),
            user_id: "u1".into(),
            kind: LogKind::QuickLog,
            timestamp: Utc.with_ymd_and_hms(2024, 10, day, hour, 0, 0).unwrap(),
            dimension_hints: Default::default(),
            fields: data.as_object().cloned().unwrap_or_default(),
        }
    }

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 10, day).unwrap()
    }

    #[test]
    fn same_day_values_are_averaged() {
        let logs = vec![
            log("a", 10, 9, json!({"stress": "high"})),
            log("b", 10, 15, json!({"stress": "low"})),
        ];
        let (v, warnings) = FeatureExtractor::with_defaults().extract("u1", &logs, date(10));
        assert!(warnings.is_empty());
        assert_eq!(v.observed(Signal::Stress), Some(3.0));
        assert_eq!(v.mental_score, Some(5.0));
        assert_eq!(v.physical_score, None);
    }

    #[test]
    fn entry_order_is_irrelevant() {
        let mut logs = vec![
            log("a", 10, 9, json!({"energy": "high", "sleep": "okay"})),
            log("b", 10, 9, json!({"energy": "low"})),
            log("c", 11, 8, json!({"focus": 4})),
        ];
        let extractor = FeatureExtractor::with_defaults();
        let forward = extractor.extract_range("u1", &logs, date(9), date(12));
        logs.reverse();
        let backward = extractor.extract_range("u1", &logs, date(9), date(12));
        assert_eq!(forward.vectors, backward.vectors);
        assert_eq!(forward.vectors.len(), 4);
    }

    #[test]
    fn carry_forward_respects_staleness() {
        let logs = vec![log("a", 1, 9, json!({"sleep": "good"}))];
        let extractor = FeatureExtractor::with_defaults();
        let range = extractor.extract_range("u1", &logs, date(1), date(5));

        assert!(range.vectors[0].raw_signals[&Signal::SleepHours].is_observed());
        assert_eq!(
            range.vectors[3].raw_signals[&Signal::SleepHours].freshness,
            Freshness::Carried { age_days: 3 }
        );
        assert!(range.vectors[4].raw_signals.is_empty());
        assert_eq!(range.vectors[4].physical_score, None);
        // Carried values count towards scores but not observations.
        assert!(range.vectors[2].physical_score.is_some());
        assert_eq!(range.vectors[2].observed(Signal::SleepHours), None);
    }

    #[test]
    fn malformed_entries_warn_without_aborting() {
        let logs = vec![
            log("bad", 10, 8, json!({"stress": "extreme"})),
            log("good", 10, 9, json!({"stress": "low"})),
        ];
        let range = FeatureExtractor::with_defaults().extract_range("u1", &logs, date(10), date(10));
        assert_eq!(range.warnings.len(), 1);
        assert_eq!(range.warnings[0].entry_id, "bad");
        assert_eq!(range.vectors[0].observed(Signal::Stress), Some(2.0));
        assert!(range.observed_dates.contains(&date(10)));
    }
}
