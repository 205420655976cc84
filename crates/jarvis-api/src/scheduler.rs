//! Batch detection scheduling.
//!
//! A sweep runs every user with logs on the runtime's rayon pool, one job
//! per user. The periodic loop triggers a sweep every
//! `scheduler.interval_secs`; on-demand jobs are queued by log ingestion.

use chrono::{DateTime, Duration, Utc};
use jarvis_core::errors::InsightError;
use jarvis_core::types::RunOutcome;
use jarvis_storage::queries::{logs, runs};
use rayon::prelude::*;
use serde::Serialize;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::service::InsightService;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepReport {
    pub users: usize,
    /// Log entries dropped for being older than their owner's retention.
    pub purged_logs: usize,
    /// Ran recently enough to be left alone this sweep.
    pub not_due: usize,
    pub already_running: usize,
    pub completed: usize,
    pub insufficient_data: usize,
    pub timed_out: usize,
    pub cancelled: usize,
    pub failed: usize,
}

impl SweepReport {
    fn record(&mut self, result: &Result<crate::service::RefreshReport, InsightError>) {
        match result {
            Ok(report) => match &report.run {
                None => self.already_running += 1,
                Some(run) => match run.outcome {
                    RunOutcome::Completed => self.completed += 1,
                    RunOutcome::InsufficientData => self.insufficient_data += 1,
                    RunOutcome::Timeout => self.timed_out += 1,
                    RunOutcome::Cancelled => self.cancelled += 1,
                    RunOutcome::Failed => self.failed += 1,
                },
            },
            Err(_) => self.failed += 1,
        }
    }
}

#[derive(Clone)]
pub struct DetectionScheduler {
    service: InsightService,
}

impl DetectionScheduler {
    pub fn new(service: InsightService) -> Self {
        Self { service }
    }

    /// Purge expired logs for every user, then detect for every due user in
    /// parallel. Blocks until all jobs end. A user is due unless a run
    /// started within the last half interval.
    pub fn sweep(&self, now: DateTime<Utc>) -> Result<SweepReport, InsightError> {
        let rt = self.service.runtime();
        let users = rt.db.with_reader(logs::list_users)?;
        let min_gap = Duration::seconds((rt.config.scheduler.interval_secs / 2) as i64);

        let mut report = SweepReport {
            users: users.len(),
            ..SweepReport::default()
        };
        for user_id in &users {
            match self.service.purge_expired_at(user_id, now) {
                Ok(purged) => report.purged_logs += purged,
                Err(e) => tracing::warn!(user_id = %user_id, error = %e, "retention purge failed"),
            }
        }

        let mut due = Vec::with_capacity(users.len());
        for user_id in users {
            match rt.db.with_reader(|conn| runs::last_run_started_at(conn, &user_id)) {
                Ok(Some(at)) if now - at < min_gap => report.not_due += 1,
                Ok(_) => due.push(user_id),
                Err(e) => {
                    tracing::warn!(user_id = %user_id, error = %e, "cannot read run history; detecting anyway");
                    due.push(user_id);
                }
            }
        }

        tracing::debug!(due = due.len(), running = rt.jobs.running_count(), "detection sweep starting");
        let results: Vec<_> = rt.pool().install(|| {
            due.par_iter()
                .map(|user_id| self.service.run_detection_at(user_id, now))
                .collect()
        });
        for result in &results {
            report.record(result);
        }

        tracing::info!(
            users = report.users,
            purged_logs = report.purged_logs,
            due = due.len(),
            completed = report.completed,
            insufficient_data = report.insufficient_data,
            timed_out = report.timed_out,
            failed = report.failed,
            "detection sweep finished"
        );
        Ok(report)
    }

    /// Sweep every `scheduler.interval_secs` until `shutdown` fires. The
    /// first sweep happens one interval after start.
    pub fn spawn_periodic(self, mut shutdown: broadcast::Receiver<()>) -> JoinHandle<()> {
        let period = std::time::Duration::from_secs(self.service.runtime().config.scheduler.interval_secs);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        let scheduler = self.clone();
                        match tokio::task::spawn_blocking(move || scheduler.sweep(Utc::now())).await {
                            Ok(Ok(_)) => {}
                            Ok(Err(e)) => tracing::error!(target: "jarvis::ops", error = %e, "detection sweep failed"),
                            Err(e) => tracing::error!(target: "jarvis::ops", error = %e, "detection sweep panicked"),
                        }
                    }
                    _ = shutdown.recv() => {
                        tracing::debug!("scheduler received shutdown signal");
                        break;
                    }
                }
            }
        })
    }
}
