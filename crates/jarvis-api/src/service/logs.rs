//! Log ingestion and per-user data removal.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use jarvis_analysis::features::map_entry;
use jarvis_core::errors::InsightError;
use jarvis_core::types::{LogEntry, LogKind, NewLogEntry, UserProfile};
use jarvis_storage::connection::with_immediate_transaction;
use jarvis_storage::queries::{feedback, features, logs, patterns, profiles, runs};
use serde::Serialize;

use super::{parse_day, require_user, InsightService};

/// Entries may be stamped at most this far ahead of the server clock.
const MAX_CLOCK_SKEW_HOURS: i64 = 24;

/// `POST /api/logs` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitReceipt {
    pub id: String,
    pub success: bool,
    /// Whether this entry queued an on-demand detection run.
    pub detection_scheduled: bool,
}

/// Rows removed by a data clear.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClearReport {
    pub logs: usize,
    pub feature_vectors: usize,
    pub patterns: usize,
    pub feedback: usize,
    pub cancelled_job: bool,
}

impl InsightService {
    /// Validate and append one entry, then drop the cached feature vectors
    /// it can influence.
    pub fn submit_log(&self, user_id: &str, entry: NewLogEntry) -> Result<SubmitReceipt, InsightError> {
        let user_id = require_user(user_id)?;
        let mut log = LogEntry {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            kind: entry.kind,
            timestamp: entry.timestamp,
            dimension_hints: Default::default(),
            fields: entry.data,
        };
        let observations = map_entry(&log).map_err(|w| InsightError::InvalidLog { reason: w.to_string() })?;
        log.dimension_hints = observations.iter().map(|(signal, _)| signal.dimension()).collect();

        let now = Utc::now();
        if log.timestamp > now + Duration::hours(MAX_CLOCK_SKEW_HOURS) {
            return Err(InsightError::InvalidLog {
                reason: format!("timestamp {} is in the future", log.timestamp.to_rfc3339()),
            });
        }

        // Carry-forward lets a day's values reach the following
        // staleness window, so those cached days are stale too.
        let from = log.date();
        let to = from
            .checked_add_signed(Duration::days(i64::from(self.rt.config.features.staleness_days)))
            .unwrap_or(NaiveDate::MAX);
        let retention = self.rt.config.server.default_retention_days;

        // Queued cache writes land before the invalidation below.
        self.rt.settle_derived();
        self.rt.db.with_writer(|conn| {
            with_immediate_transaction(conn, |tx| {
                logs::insert_log(tx, &log)?;
                let existing = profiles::get_profile(tx, user_id)?;
                let mut profile = existing
                    .clone()
                    .unwrap_or_else(|| UserProfile::new(user_id, now, retention));
                if log.kind == LogKind::MorningMood {
                    let day = log.date();
                    profile.last_morning_log_date =
                        Some(profile.last_morning_log_date.map_or(day, |d| d.max(day)));
                }
                if existing.as_ref() != Some(&profile) {
                    profiles::upsert_profile(tx, &profile, now)?;
                }
                features::invalidate_range(tx, user_id, from, to)?;
                Ok(())
            })
        })?;

        let pending = self.rt.jobs.note_log(user_id);
        let detection_scheduled = pending >= self.rt.config.scheduler.new_log_threshold
            && !self.rt.jobs.is_running(user_id);
        if detection_scheduled {
            self.schedule_detection(user_id);
        }

        tracing::debug!(
            user_id,
            log_id = %log.id,
            kind = log.kind.name(),
            signals = observations.len(),
            pending,
            "log entry stored"
        );
        Ok(SubmitReceipt {
            id: log.id,
            success: true,
            detection_scheduled,
        })
    }

    /// Entries in the optional inclusive day range, oldest first.
    pub fn get_logs(
        &self,
        user_id: &str,
        start_date: Option<&str>,
        end_date: Option<&str>,
    ) -> Result<Vec<LogEntry>, InsightError> {
        let user_id = require_user(user_id)?;
        let from = start_date
            .filter(|s| !s.trim().is_empty())
            .map(|s| parse_day("start_date", s))
            .transpose()?;
        let to = end_date
            .filter(|s| !s.trim().is_empty())
            .map(|s| parse_day("end_date", s))
            .transpose()?;
        Ok(self
            .rt
            .db
            .with_reader(|conn| logs::get_logs(conn, user_id, from, to))?)
    }

    /// Delete entries older than the user's retention as of `now`, plus the
    /// cached vectors they back. Returns the number of entries removed.
    /// Patterns citing them retire on the next detection run.
    pub fn purge_expired_at(&self, user_id: &str, now: DateTime<Utc>) -> Result<usize, InsightError> {
        let user_id = require_user(user_id)?;
        let profile = self.rt.db.with_reader(|conn| profiles::get_profile(conn, user_id))?;
        let Some(days) = self.retention_window(profile.as_ref()) else {
            return Ok(0);
        };
        let Some(cutoff) = now.date_naive().checked_sub_signed(Duration::days(i64::from(days))) else {
            return Ok(0);
        };
        let carried_to = cutoff
            .checked_add_signed(Duration::days(i64::from(self.rt.config.features.staleness_days)))
            .unwrap_or(NaiveDate::MAX);

        self.rt.settle_derived();
        let (purged, vectors) = self.rt.db.with_writer(|conn| {
            with_immediate_transaction(conn, |tx| {
                let purged = logs::delete_logs_before(tx, user_id, cutoff)?;
                let mut vectors = features::delete_feature_vectors_before(tx, user_id, cutoff)?;
                if purged > 0 {
                    // Days that carried purged values forward.
                    vectors += features::invalidate_range(tx, user_id, cutoff, carried_to)?;
                }
                Ok((purged, vectors))
            })
        })?;
        if purged > 0 {
            tracing::info!(user_id, purged, vectors, cutoff = %cutoff, "expired log entries purged");
        }
        Ok(purged)
    }

    /// Cancel any running job, then delete logs, cached features, patterns
    /// and feedback. The profile survives.
    pub fn clear_data(&self, user_id: &str) -> Result<ClearReport, InsightError> {
        let user_id = require_user(user_id)?;
        let report = self.clear_user(user_id, false)?;
        tracing::info!(
            user_id,
            logs = report.logs,
            patterns = report.patterns,
            cancelled_job = report.cancelled_job,
            "user data cleared"
        );
        Ok(report)
    }

    /// [`clear_data`](Self::clear_data) plus the profile and run audit.
    pub fn delete_account(&self, user_id: &str) -> Result<ClearReport, InsightError> {
        let user_id = require_user(user_id)?;
        let report = self.clear_user(user_id, true)?;
        tracing::info!(user_id, logs = report.logs, "account deleted");
        Ok(report)
    }

    fn clear_user(&self, user_id: &str, delete_account: bool) -> Result<ClearReport, InsightError> {
        // Cancel before taking the writer: a job commits only while holding
        // it and checks its token first.
        let cancelled_job = self.rt.jobs.cancel(user_id);
        self.rt.jobs.forget(user_id);
        self.rt.settle_derived();

        let now = Utc::now();
        let report = self.rt.db.with_writer(|conn| {
            with_immediate_transaction(conn, |tx| {
                let report = ClearReport {
                    logs: logs::delete_logs(tx, user_id)?,
                    feature_vectors: features::delete_feature_vectors(tx, user_id)?,
                    patterns: patterns::delete_patterns(tx, user_id)?,
                    feedback: feedback::delete_feedback(tx, user_id)?,
                    cancelled_job,
                };
                if delete_account {
                    profiles::delete_profile(tx, user_id)?;
                    runs::delete_runs(tx, user_id)?;
                } else if let Some(mut profile) = profiles::get_profile(tx, user_id)? {
                    profile.last_morning_log_date = None;
                    profiles::upsert_profile(tx, &profile, now)?;
                }
                Ok(report)
            })
        })?;
        Ok(report)
    }
}
