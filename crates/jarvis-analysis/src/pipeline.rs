//! Per-user insight pipeline: extract → detect → rank → reconcile.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use jarvis_core::errors::{DetectionError, IngestionWarning};
use jarvis_core::traits::FeedbackWeighting;
use jarvis_core::types::{FeatureVector, LogEntry, Pattern};
use jarvis_core::JarvisConfig;

use crate::detection::{DetectionOutcome, JobBudget, PatternDetector};
use crate::features::FeatureExtractor;
use crate::ranking::{PatternRanker, Reconciler, Reconciliation};

/// What one run sees of a user.
#[derive(Debug, Clone, Copy)]
pub struct PipelineInput<'a> {
    pub user_id: &'a str,
    /// The user's full log history.
    pub logs: &'a [LogEntry],
    /// The user's stored pattern set, stale ones included.
    pub previous: &'a [Pattern],
    pub now: DateTime<Utc>,
    /// The user's own retention in days, capping `ranking.retention_days`.
    pub retention_days: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub outcome: DetectionOutcome,
    /// Vectors of the detection window, oldest first.
    pub feature_vectors: Vec<FeatureVector>,
    pub reconciliation: Reconciliation,
    pub warnings: Vec<IngestionWarning>,
    pub candidates: usize,
    pub pairs_examined: usize,
}

pub struct PatternPipeline {
    extractor: FeatureExtractor,
    detector: PatternDetector,
    ranker: PatternRanker,
    reconciler: Reconciler,
    window_days: u32,
}

impl PatternPipeline {
    pub fn new(config: &JarvisConfig) -> Self {
        Self {
            extractor: FeatureExtractor::new(config.features.clone()),
            detector: PatternDetector::new(config.detection.clone()),
            ranker: PatternRanker::new(config.ranking.clone()),
            reconciler: Reconciler::new(config.ranking.clone()),
            window_days: config.detection.window_days,
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(&JarvisConfig::default())
    }

    pub fn with_weighting(mut self, weighting: Arc<dyn FeedbackWeighting>) -> Self {
        self.detector = self.detector.with_weighting(weighting);
        self
    }

    pub fn extractor(&self) -> &FeatureExtractor {
        &self.extractor
    }

    /// Run every stage for one user. Pure: the caller persists the output.
    pub fn run(&self, input: &PipelineInput<'_>, budget: &JobBudget) -> Result<PipelineOutput, DetectionError> {
        let to = input.now.date_naive();
        let from = to - Duration::days(i64::from(self.window_days) - 1);

        // Stage 1: features for the trailing window
        let extraction = self.extractor.extract_range(input.user_id, input.logs, from, to);
        budget.check()?;

        // Stage 2: correlations
        let detection = self
            .detector
            .detect(input.user_id, &extraction.vectors, input.now, budget)?;
        let candidates = detection.candidates.len();

        // Stage 3-4: rank and reconcile against the stored set
        let reconciler = self.reconciler.capped(input.retention_days);
        let reconciliation = match detection.outcome {
            DetectionOutcome::InsufficientData => {
                reconciler
                    .revalidate(input.previous, input.now, &extraction.observed_dates)
            }
            DetectionOutcome::Completed => {
                let mut fresh: Vec<Pattern> =
                    detection.candidates.into_iter().map(Pattern::from).collect();
                reconciler.assign_ids(input.user_id, &mut fresh, input.previous);
                let ranked = self.ranker.rank(fresh);
                budget.check()?;
                reconciler
                    .reconcile(input.previous, ranked, input.now, &extraction.observed_dates)
            }
        };

        tracing::debug!(
            user_id = input.user_id,
            outcome = detection.outcome.name(),
            candidates,
            published = reconciliation.published,
            retired = reconciliation.retired,
            warnings = extraction.warnings.len(),
            "pipeline finished"
        );

        Ok(PipelineOutput {
            outcome: detection.outcome,
            feature_vectors: extraction.vectors,
            reconciliation,
            warnings: extraction.warnings,
            candidates,
            pairs_examined: detection.pairs_examined,
        })
    }
}
