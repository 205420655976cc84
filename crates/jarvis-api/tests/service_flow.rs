//! Ingestion → detection → feedback → clear, through the service layer.

use std::sync::Arc;
use std::time::{Duration as StdDuration, Instant};

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use jarvis_api::runtime::{JarvisRuntime, RuntimeOptions};
use jarvis_api::InsightService;
use jarvis_core::errors::{InsightError, StorageError};
use jarvis_core::types::{
    Dimension, LogKind, NewLogEntry, PageRequest, PatternFilters, PatternStatus, PatternType, ProfileUpdate,
    RunOutcome, Signal, RETAIN_FOREVER,
};
use jarvis_core::JarvisConfig;
use jarvis_storage::queries::patterns::{self, PatternQuery};
use jarvis_storage::queries::{feedback, features, profiles};
use serde_json::json;

const USER: &str = "alex";

fn start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 10, 14).unwrap()
}

fn at(day: i64, hour: u32) -> DateTime<Utc> {
    let date = start() + Duration::days(day);
    Utc.from_utc_datetime(&date.and_hms_opt(hour, 0, 0).unwrap())
}

fn quiet_config() -> JarvisConfig {
    let mut config = JarvisConfig::default();
    config.scheduler.new_log_threshold = 1_000;
    config
}

fn service(config: JarvisConfig) -> InsightService {
    InsightService::new(Arc::new(JarvisRuntime::in_memory(config).unwrap()))
}

fn new_log(kind: LogKind, timestamp: DateTime<Utc>, data: serde_json::Value) -> NewLogEntry {
    NewLogEntry {
        kind,
        timestamp,
        data: data.as_object().cloned().unwrap_or_default(),
    }
}

/// Two weeks in which every high-stress afternoon precedes a restless night.
fn submit_stress_sleep_history(service: &InsightService) {
    let stressed = [0, 2, 4, 6, 8];
    for day in 0..14 {
        let sleep = if day > 0 && stressed.contains(&(day - 1)) { "restless" } else { "good" };
        service
            .submit_log(USER, new_log(LogKind::MorningMood, at(day, 7), json!({"mood": 3, "sleep": sleep})))
            .unwrap();
        let stress = if stressed.contains(&day) { "high" } else { "low" };
        service
            .submit_log(
                USER,
                new_log(LogKind::QuickLog, at(day, 14), json!({"stress": stress, "context": "work"})),
            )
            .unwrap();
    }
}

/// `days` of a dozen varied entries each, enough that extraction alone
/// outlasts a one-millisecond budget.
fn submit_busy_history(service: &InsightService, days: i64) {
    const LEVELS: [&str; 5] = ["very-low", "low", "medium", "high", "very-high"];
    for day in 0..days {
        for hour in 8..20u32 {
            let i = (day as usize) * 12 + hour as usize;
            service
                .submit_log(
                    USER,
                    new_log(
                        LogKind::QuickLog,
                        at(day, hour),
                        json!({
                            "stress": LEVELS[i % 5],
                            "energy": LEVELS[(i * 3 + day as usize) % 5],
                            "workout": if i % 4 == 0 { "movement" } else { "rest" },
                            "context": "work"
                        }),
                    ),
                )
                .unwrap();
        }
    }
}

fn file_service(dir: &tempfile::TempDir) -> InsightService {
    let rt = JarvisRuntime::new(RuntimeOptions {
        config: Some(quiet_config()),
        db_path: Some(dir.path().join("jarvis.db")),
        ..RuntimeOptions::default()
    })
    .unwrap();
    InsightService::new(Arc::new(rt))
}

#[test]
fn detection_publishes_and_feedback_survives_reruns() {
    let service = service(quiet_config());
    submit_stress_sleep_history(&service);
    let now = at(14, 3);

    let report = service.run_detection_at(USER, now).unwrap();
    assert!(!report.already_running);
    let run = report.run.unwrap();
    assert_eq!(run.outcome, RunOutcome::Completed);
    assert!(run.pattern_count >= 1);
    assert!(run.published >= 1);

    let visible = service.get_patterns_at(USER, &PatternFilters::default(), now).unwrap();
    let alert = visible
        .iter()
        .find(|p| p.basis.pair_key() == (Signal::SleepHours, Signal::Stress))
        .expect("stress/sleep pattern")
        .clone();
    assert_eq!(alert.pattern_type, PatternType::Alert);
    assert_eq!(alert.status, PatternStatus::Active);
    assert!(visible.windows(2).all(|w| w[0].confidence >= w[1].confidence));

    let acted = service
        .mark_acted_on(USER, &alert.id, Some(" wind down earlier ".into()))
        .unwrap();
    assert!(acted.was_acted_on);
    assert_eq!(acted.status, PatternStatus::ActedOn);
    assert_eq!(acted.outcome.as_deref(), Some("wind down earlier"));
    assert_eq!(acted.confidence, alert.confidence);

    let rerun = service.run_detection_at(USER, at(14, 5)).unwrap().run.unwrap();
    assert_eq!(rerun.published, 0);
    let again = service
        .get_patterns_at(USER, &PatternFilters::default(), at(14, 5))
        .unwrap()
        .into_iter()
        .find(|p| p.id == alert.id)
        .unwrap();
    assert_eq!(again.status, PatternStatus::ActedOn);
    assert_eq!(again.discovered, alert.discovered);

    let history = service.run_history(USER, 10).unwrap();
    assert_eq!(history.len(), 2);
    assert!(history[0].started_at >= history[1].started_at);

    let historical = service.historical_patterns(USER).unwrap();
    assert!(historical.len() >= visible.len());
}

#[test]
fn unknown_and_foreign_patterns_are_not_found() {
    let service = service(quiet_config());
    submit_stress_sleep_history(&service);
    service.run_detection_at(USER, at(14, 3)).unwrap();
    let id = service.get_patterns_at(USER, &PatternFilters::default(), at(14, 3)).unwrap()[0]
        .id
        .clone();
    let rt = service.runtime();
    let snapshot = || {
        rt.db
            .with_reader(|conn| {
                Ok((
                    patterns::get_patterns(conn, USER, &PatternQuery::all())?,
                    feedback::get_feedback(conn, USER)?,
                    feedback::get_feedback(conn, "someone-else")?,
                ))
            })
            .unwrap()
    };
    let before = snapshot();

    assert!(matches!(
        service.mark_acted_on(USER, "pat_missing", None),
        Err(InsightError::NotFound { .. })
    ));
    assert!(matches!(
        service.mark_acted_on("someone-else", &id, Some("not mine".into())),
        Err(InsightError::NotFound { .. })
    ));
    assert!(matches!(service.get_patterns(" ", &PatternFilters::default()), Err(InsightError::Unauthorized)));

    let after = snapshot();
    assert_eq!(after, before);
    assert!(after.1.is_empty() && after.2.is_empty());
}

#[test]
fn an_unknown_cursor_is_an_invalid_filter() {
    let service = service(quiet_config());
    submit_stress_sleep_history(&service);
    service.run_detection_at(USER, at(14, 3)).unwrap();
    let all = service.get_patterns(USER, &PatternFilters::default()).unwrap();

    let first = service
        .get_patterns_page(USER, &PatternFilters::default(), &PageRequest { after_id: None, limit: Some(1) })
        .unwrap();
    assert_eq!(first.items[0].id, all[0].id);
    assert_eq!(first.has_more, all.len() > 1);

    let err = service
        .get_patterns_page(
            USER,
            &PatternFilters::default(),
            &PageRequest {
                after_id: Some("pat_retired".into()),
                limit: Some(1),
            },
        )
        .unwrap_err();
    assert!(matches!(err, InsightError::InvalidFilter { field: "after", ref value } if value == "pat_retired"));
}

#[test]
fn sparse_history_records_insufficient_data() {
    let service = service(quiet_config());
    service
        .submit_log(USER, new_log(LogKind::QuickLog, at(0, 9), json!({"stress": "high"})))
        .unwrap();

    let run = service.run_detection_at(USER, at(1, 3)).unwrap().run.unwrap();
    assert_eq!(run.outcome, RunOutcome::InsufficientData);
    assert!(service.get_patterns(USER, &PatternFilters::default()).unwrap().is_empty());
}

#[test]
fn dashboard_and_trends_follow_the_log_history() {
    let service = service(quiet_config());
    submit_stress_sleep_history(&service);
    let now = at(14, 3);
    service.run_detection_at(USER, now).unwrap();

    let dashboard = service.dashboard_at(USER, now).unwrap();
    assert_eq!(dashboard.current_streak, 14);
    assert_eq!(dashboard.longest_streak, 14);
    assert_eq!(dashboard.last_log_at, Some(at(13, 14)));
    assert!(dashboard.has_new_insights);
    assert!(dashboard.has_active_interventions);

    let trend = service.trends_at(USER, "physical", Some("week"), now).unwrap();
    assert!(!trend.is_empty());
    assert!(trend.iter().all(|p| p.dimension == Dimension::Physical));
    assert!(trend.iter().all(|p| p.date >= at(8, 0).date_naive() && p.date <= now.date_naive()));
    assert!(trend.windows(2).all(|w| w[0].date < w[1].date));

    assert!(matches!(
        service.trends_at(USER, "cosmic", None, now),
        Err(InsightError::InvalidFilter { field: "dimension", .. })
    ));
    assert!(matches!(
        service.trends_at(USER, "physical", Some("decade"), now),
        Err(InsightError::InvalidFilter { field: "range", .. })
    ));
}

#[test]
fn malformed_entries_are_rejected_before_storage() {
    let service = service(quiet_config());
    let err = service
        .submit_log(USER, new_log(LogKind::QuickLog, at(0, 9), json!({"focus": "laser"})))
        .unwrap_err();
    assert!(matches!(err, InsightError::InvalidLog { .. }));
    assert!(service.get_logs(USER, None, None).unwrap().is_empty());

    assert!(matches!(
        service.get_logs(USER, Some("yesterday"), None),
        Err(InsightError::InvalidFilter { field: "start_date", .. })
    ));
}

#[test]
fn morning_logs_update_the_profile() {
    let service = service(quiet_config());
    service
        .submit_log(USER, new_log(LogKind::MorningMood, at(3, 7), json!({"mood": 4, "sleep": "good"})))
        .unwrap();
    service
        .submit_log(USER, new_log(LogKind::MorningMood, at(1, 7), json!({"mood": 2, "sleep": "good"})))
        .unwrap();

    let view = service.get_profile(USER).unwrap();
    assert_eq!(view.profile.last_morning_log_date, Some(at(3, 0).date_naive()));
    assert_eq!(view.total_logs, 2);

    let err = service
        .update_profile(
            USER,
            ProfileUpdate {
                data_retention_days: Some(0),
                ..ProfileUpdate::default()
            },
        )
        .unwrap_err();
    assert!(matches!(err, InsightError::InvalidProfile { .. }));

    let view = service
        .update_profile(
            USER,
            ProfileUpdate {
                data_retention_days: Some(RETAIN_FOREVER),
                ..ProfileUpdate::default()
            },
        )
        .unwrap();
    assert_eq!(view.profile.data_retention_days, RETAIN_FOREVER);
    assert_eq!(service.purge_expired_at(USER, at(3650, 0)).unwrap(), 0);
    assert_eq!(service.get_logs(USER, None, None).unwrap().len(), 2);
}

#[test]
fn a_shorter_retention_retires_patterns_and_purges_old_logs() {
    let service = service(quiet_config());
    submit_stress_sleep_history(&service);
    let first = service.run_detection_at(USER, at(14, 3)).unwrap().run.unwrap();
    assert!(first.pattern_count >= 1);

    service
        .update_profile(
            USER,
            ProfileUpdate {
                data_retention_days: Some(7),
                ..ProfileUpdate::default()
            },
        )
        .unwrap();
    let rerun = service.run_detection_at(USER, at(14, 5)).unwrap().run.unwrap();
    assert!(rerun.retired >= 1);
    let visible = service.get_patterns_at(USER, &PatternFilters::default(), at(14, 5)).unwrap();
    assert!(visible
        .iter()
        .all(|p| p.basis.pair_key() != (Signal::SleepHours, Signal::Stress)));

    // A week back from Oct 28 keeps Oct 21 onwards.
    let purged = service.purge_expired_at(USER, at(14, 5)).unwrap();
    assert_eq!(purged, 14);
    let kept = service.get_logs(USER, None, None).unwrap();
    assert_eq!(kept.len(), 14);
    assert!(kept.iter().all(|l| l.date() >= at(7, 0).date_naive()));
}

#[test]
fn future_timestamps_are_rejected_before_storage() {
    let service = service(quiet_config());
    for timestamp in [Utc::now() + Duration::days(3), DateTime::<Utc>::MAX_UTC - Duration::hours(1)] {
        let err = service
            .submit_log(USER, new_log(LogKind::QuickLog, timestamp, json!({"stress": "high"})))
            .unwrap_err();
        assert!(matches!(err, InsightError::InvalidLog { .. }), "{timestamp} accepted");
    }
    assert!(service.get_logs(USER, None, None).unwrap().is_empty());

    // A little clock skew is fine.
    service
        .submit_log(
            USER,
            new_log(LogKind::QuickLog, Utc::now() + Duration::hours(1), json!({"stress": "high"})),
        )
        .unwrap();
    assert_eq!(service.get_logs(USER, None, None).unwrap().len(), 1);
}

#[test]
fn timed_out_detection_retries_then_leaves_patterns_alone() {
    let seeded = {
        let service = service(quiet_config());
        submit_stress_sleep_history(&service);
        service.run_detection_at(USER, at(14, 3)).unwrap();
        service
            .runtime()
            .db
            .with_reader(|conn| patterns::get_patterns(conn, USER, &PatternQuery::all()))
            .unwrap()
    };
    assert!(!seeded.is_empty());

    let mut config = quiet_config();
    config.scheduler.new_log_threshold = 1_000_000;
    config.scheduler.max_attempts = 2;
    config.detection.timeout_ms = 1;
    config.detection.window_days = 365;
    let service = service(config);
    let rt = service.runtime();
    rt.db
        .with_writer(|conn| patterns::replace_patterns(conn, USER, &seeded))
        .unwrap();
    submit_busy_history(&service, 300);
    let stored = || {
        rt.db
            .with_reader(|conn| patterns::get_patterns(conn, USER, &PatternQuery::all()))
            .unwrap()
    };
    let before = stored();

    let run = service.run_detection_at(USER, at(300, 3)).unwrap().run.unwrap();
    assert_eq!(run.outcome, RunOutcome::Timeout);
    assert_eq!(run.attempts, 2);
    assert!(run.error.as_deref().is_some_and(|e| e.contains("budget")), "{:?}", run.error);
    assert_eq!(run.pattern_count, 0);

    let history = service.run_history(USER, 10).unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].outcome, RunOutcome::Timeout);
    assert_eq!(history[0].attempts, 2);
    assert_eq!(stored(), before);
}

#[test]
fn a_dropped_audit_batch_does_not_fail_later_calls() {
    let dir = tempfile::tempdir().unwrap();
    let service = file_service(&dir);
    submit_stress_sleep_history(&service);
    let rt = service.runtime();
    let rename = |from: &str, to: &str| {
        rt.db
            .with_writer(|conn| {
                conn.execute_batch(&format!("ALTER TABLE {from} RENAME TO {to};"))
                    .map_err(|e| StorageError::SqliteError { message: e.to_string() })
            })
            .unwrap();
    };

    rename("detection_runs", "detection_runs_moved");
    let run = service.run_detection_at(USER, at(14, 3)).unwrap().run.unwrap();
    assert_eq!(run.outcome, RunOutcome::Completed);
    service
        .submit_log(USER, new_log(LogKind::QuickLog, at(14, 9), json!({"stress": "low"})))
        .unwrap();
    service.clear_data("someone-else").unwrap();
    rename("detection_runs_moved", "detection_runs");

    assert_eq!(service.get_logs(USER, None, None).unwrap().len(), 29);
    assert!(!service.get_patterns_at(USER, &PatternFilters::default(), at(14, 3)).unwrap().is_empty());
    assert!(service.run_history(USER, 10).unwrap().is_empty());

    service.run_detection_at(USER, at(14, 12)).unwrap();
    rt.sync_derived().unwrap();
    assert_eq!(service.run_history(USER, 10).unwrap().len(), 1);
    rt.shutdown().unwrap();
}

#[test]
fn clear_data_keeps_the_profile_and_delete_account_does_not() {
    let service = service(quiet_config());
    submit_stress_sleep_history(&service);
    service.run_detection_at(USER, at(14, 3)).unwrap();
    let id = service.get_patterns_at(USER, &PatternFilters::default(), at(14, 3)).unwrap()[0]
        .id
        .clone();
    service.mark_acted_on(USER, &id, None).unwrap();

    let report = service.clear_data(USER).unwrap();
    assert_eq!(report.logs, 28);
    assert!(report.patterns >= 1);
    assert_eq!(report.feedback, 1);
    assert!(!report.cancelled_job);

    assert!(service.get_logs(USER, None, None).unwrap().is_empty());
    assert!(service.get_patterns(USER, &PatternFilters::default()).unwrap().is_empty());
    let view = service.get_profile(USER).unwrap();
    assert_eq!(view.total_logs, 0);
    assert_eq!(view.profile.last_morning_log_date, None);

    service.delete_account(USER).unwrap();
    let rt = service.runtime();
    assert!(rt.db.with_reader(|conn| profiles::get_profile(conn, USER)).unwrap().is_none());
}

#[test]
fn file_database_caches_features_through_the_batch_writer() {
    let dir = tempfile::tempdir().unwrap();
    let rt = JarvisRuntime::new(RuntimeOptions {
        config: Some(quiet_config()),
        db_path: Some(dir.path().join("jarvis.db")),
        ..RuntimeOptions::default()
    })
    .unwrap();
    let service = InsightService::new(Arc::new(rt));
    submit_stress_sleep_history(&service);

    let run = service.run_detection_at(USER, at(14, 3)).unwrap().run.unwrap();
    assert_eq!(run.outcome, RunOutcome::Completed);

    let rt = service.runtime();
    rt.sync_derived().unwrap();
    let cached = rt
        .db
        .with_reader(|conn| features::get_feature_vectors(conn, USER, start(), at(13, 0).date_naive()))
        .unwrap();
    assert_eq!(cached.len(), 14);

    // A backdated entry invalidates the days it can influence.
    service
        .submit_log(USER, new_log(LogKind::QuickLog, at(5, 18), json!({"stress": "high"})))
        .unwrap();
    let cached = rt
        .db
        .with_reader(|conn| features::get_feature_vectors(conn, USER, start(), at(13, 0).date_naive()))
        .unwrap();
    assert!(cached.len() < 14);
    assert!(cached.iter().all(|v| v.date < at(5, 0).date_naive() || v.date > at(8, 0).date_naive()));

    service.clear_data(USER).unwrap();
    let cached = rt
        .db
        .with_reader(|conn| features::get_feature_vectors(conn, USER, start(), at(13, 0).date_naive()))
        .unwrap();
    assert!(cached.is_empty());
    rt.shutdown().unwrap();
}

#[test]
fn reaching_the_log_threshold_queues_detection() {
    let mut config = JarvisConfig::default();
    config.scheduler.new_log_threshold = 3;
    let service = service(config);

    let receipts: Vec<_> = (0..3)
        .map(|day| {
            service
                .submit_log(USER, new_log(LogKind::QuickLog, at(day, 14), json!({"stress": "low"})))
                .unwrap()
        })
        .collect();
    assert!(!receipts[0].detection_scheduled);
    assert!(!receipts[1].detection_scheduled);
    assert!(receipts[2].detection_scheduled);

    let deadline = Instant::now() + StdDuration::from_secs(10);
    loop {
        let runs = service.run_history(USER, 10).unwrap();
        if !runs.is_empty() {
            assert_eq!(runs[0].outcome, RunOutcome::InsufficientData);
            break;
        }
        assert!(Instant::now() < deadline, "scheduled detection never ran");
        std::thread::sleep(StdDuration::from_millis(20));
    }
}
