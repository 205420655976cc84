//! Detection benchmarks: feature extraction + correlation over a full window.

use chrono::{Duration, NaiveDate, TimeZone, Utc};
use criterion::{criterion_group, criterion_main, Criterion};
use jarvis_analysis::{FeatureExtractor, JobBudget, PatternDetector, PatternPipeline, PipelineInput};
use jarvis_core::types::{LogEntry, LogKind};
use serde_json::json;

fn synthetic_logs(days: i64) -> Vec<LogEntry> {
    let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    let levels = ["low", "medium", "high"];
    (0..days)
        .flat_map(|d| {
            let date = start + Duration::days(d);
            let morning = LogEntry {
                id: format!("m{d}"),
                user_id: "bench".into(),
                kind: LogKind::MorningMood,
                timestamp: Utc.from_utc_datetime(&date.and_hms_opt(7, 0, 0).unwrap()),
                dimension_hints: Default::default(),
                fields: json!({"mood": 1 + d % 5, "energy": levels[(d % 3) as usize], "sleep": "okay"})
                    .as_object()
                    .cloned()
                    .unwrap_or_default(),
            };
            let evening = LogEntry {
                id: format!("e{d}"),
                user_id: "bench".into(),
                kind: LogKind::EndOfDay,
                timestamp: Utc.from_utc_datetime(&date.and_hms_opt(21, 0, 0).unwrap()),
                dimension_hints: Default::default(),
                fields: json!({"overallMood": 1 + (d * 7) % 5, "stress": levels[(d % 2) as usize], "workout": d % 2 == 0, "meetings": d % 6})
                    .as_object()
                    .cloned()
                    .unwrap_or_default(),
            };
            [morning, evening]
        })
        .collect()
}

fn detection_benchmark(c: &mut Criterion) {
    let logs = synthetic_logs(120);
    let end = NaiveDate::from_ymd_opt(2024, 4, 29).unwrap();
    let vectors = FeatureExtractor::with_defaults()
        .extract_range("bench", &logs, end - Duration::days(20), end)
        .vectors;
    let now = Utc.from_utc_datetime(&end.and_hms_opt(23, 0, 0).unwrap());
    let detector = PatternDetector::with_defaults();

    c.bench_function("detect_21_day_window", |b| {
        b.iter(|| {
            std::hint::black_box(
                detector.detect("bench", &vectors, now, &JobBudget::unbounded()),
            )
        });
    });
}

fn pipeline_benchmark(c: &mut Criterion) {
    let logs = synthetic_logs(120);
    let now = Utc.with_ymd_and_hms(2024, 4, 30, 3, 0, 0).unwrap();
    let pipeline = PatternPipeline::with_defaults();

    c.bench_function("pipeline_120_days", |b| {
        b.iter(|| {
            let input = PipelineInput {
                user_id: "bench",
                logs: &logs,
                previous: &[],
                now,
                retention_days: None,
            };
            std::hint::black_box(pipeline.run(&input, &JobBudget::unbounded()))
        });
    });
}

criterion_group!(benches, detection_benchmark, pipeline_benchmark);
criterion_main!(benches);
