//! Running the per-user pipeline against stored data.

use std::time::Duration;

use chrono::{DateTime, Utc};
use jarvis_analysis::{DetectionOutcome, JobBudget, PipelineInput};
use jarvis_core::errors::{DetectionError, InsightError};
use jarvis_core::types::{DetectionRun, RunOutcome};
use jarvis_storage::batch::{BatchCommand, FeatureVectorRow};
use jarvis_storage::connection::with_immediate_transaction;
use jarvis_storage::queries::patterns::{self, PatternQuery};
use jarvis_storage::queries::{logs, profiles};
use serde::Serialize;

use super::{require_user, InsightService};

/// `POST /api/insights/refresh` response.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshReport {
    /// A job for this user was already running; nothing was started.
    pub already_running: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run: Option<DetectionRun>,
}

/// What one committed attempt produced.
struct AttemptSummary {
    outcome: DetectionOutcome,
    visible: usize,
    published: usize,
    retired: usize,
    warnings: usize,
}

impl InsightService {
    pub fn run_detection(&self, user_id: &str) -> Result<RefreshReport, InsightError> {
        self.run_detection_at(user_id, Utc::now())
    }

    /// Run detection for one user as of `now`, retrying a timed-out attempt
    /// up to `scheduler.max_attempts` in total. Whatever happens, one run
    /// row is recorded; a failed job leaves the stored patterns unchanged.
    pub fn run_detection_at(&self, user_id: &str, now: DateTime<Utc>) -> Result<RefreshReport, InsightError> {
        let user_id = require_user(user_id)?;
        let Some(job) = self.rt.jobs.begin(user_id) else {
            tracing::debug!(user_id, "detection already running");
            return Ok(RefreshReport { already_running: true, run: None });
        };

        let started_at = Utc::now();
        let max_attempts = self.rt.config.scheduler.max_attempts.max(1);
        let budget = Duration::from_millis(self.rt.config.detection.timeout_ms);

        let mut attempts = 0;
        let result = loop {
            attempts += 1;
            let attempt_budget = JobBudget::new(job.token().clone(), budget);
            match self.detect_once(user_id, now, &attempt_budget) {
                Err(e) if e.is_retryable() && attempts < max_attempts => {
                    tracing::warn!(user_id, attempt = attempts, error = %e, "detection attempt failed; retrying");
                }
                other => break other,
            }
        };

        let mut run = DetectionRun {
            user_id: user_id.to_string(),
            started_at,
            finished_at: Utc::now(),
            outcome: RunOutcome::Completed,
            attempts,
            pattern_count: 0,
            published: 0,
            retired: 0,
            warning_count: 0,
            error: None,
        };
        match result {
            Ok(summary) => {
                run.outcome = match summary.outcome {
                    DetectionOutcome::Completed => RunOutcome::Completed,
                    DetectionOutcome::InsufficientData => RunOutcome::InsufficientData,
                };
                run.pattern_count = summary.visible as u32;
                run.published = summary.published as u32;
                run.retired = summary.retired as u32;
                run.warning_count = summary.warnings as u32;
                tracing::info!(
                    user_id,
                    outcome = run.outcome.name(),
                    patterns = run.pattern_count,
                    published = run.published,
                    retired = run.retired,
                    "detection finished"
                );
            }
            Err(DetectionError::Cancelled) => {
                run.outcome = RunOutcome::Cancelled;
                tracing::info!(user_id, "detection cancelled");
            }
            Err(e @ DetectionError::Timeout { .. }) => {
                run.outcome = RunOutcome::Timeout;
                run.error = Some(e.to_string());
                tracing::error!(
                    target: "jarvis::ops",
                    user_id,
                    attempts,
                    error = %e,
                    "detection timed out; stored patterns left unchanged"
                );
            }
            Err(e) => {
                run.outcome = RunOutcome::Failed;
                run.error = Some(e.to_string());
                tracing::error!(target: "jarvis::ops", user_id, attempts, error = %e, "detection failed");
            }
        }

        // The pattern set is committed at this point; a lost audit row must
        // not turn the run into an error.
        if let Err(e) = self.rt.write_derived(BatchCommand::InsertDetectionRuns(vec![run.clone()])) {
            tracing::warn!(user_id, error = %e, "run audit row not queued");
        }
        self.rt.settle_derived();
        drop(job);
        Ok(RefreshReport { already_running: false, run: Some(run) })
    }

    /// Queue a job for `user_id` on the detection pool.
    pub fn schedule_detection(&self, user_id: &str) {
        let service = self.clone();
        let user_id = user_id.to_string();
        self.rt.pool().spawn(move || {
            if let Err(e) = service.run_detection(&user_id) {
                tracing::warn!(user_id = %user_id, error = %e, "scheduled detection failed");
            }
        });
    }

    fn detect_once(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
        budget: &JobBudget,
    ) -> Result<AttemptSummary, DetectionError> {
        let (history, previous, profile) = self.rt.db.with_reader(|conn| {
            Ok((
                logs::get_logs(conn, user_id, None, None)?,
                patterns::get_patterns(conn, user_id, &PatternQuery::all())?,
                profiles::get_profile(conn, user_id)?,
            ))
        })?;

        let output = self.rt.pipeline.run(
            &PipelineInput {
                user_id,
                logs: &history,
                previous: &previous,
                now,
                retention_days: self.retention_window(profile.as_ref()),
            },
            budget,
        )?;

        let rows = output
            .feature_vectors
            .iter()
            .map(|v| FeatureVectorRow::from_vector(v, now))
            .collect::<Result<Vec<_>, _>>()?;

        // The token is checked under the writer lock; data clears cancel
        // first and take the same lock to delete.
        let committed = self.rt.db.with_writer(|conn| {
            if budget.token().is_cancelled() {
                return Ok(false);
            }
            with_immediate_transaction(conn, |tx| {
                patterns::replace_patterns(tx, user_id, &output.reconciliation.patterns)
            })?;
            Ok(true)
        })?;
        if !committed {
            return Err(DetectionError::Cancelled);
        }
        self.rt.write_derived(BatchCommand::UpsertFeatureVectors(rows))?;

        Ok(AttemptSummary {
            outcome: output.outcome,
            visible: output.reconciliation.visible().count(),
            published: output.reconciliation.published,
            retired: output.reconciliation.retired,
            warnings: output.warnings.len(),
        })
    }
}
