//! Pattern queries and acted-on feedback.

use chrono::{DateTime, Utc};
use jarvis_analysis::ranking::compare_rank;
use jarvis_core::errors::InsightError;
use jarvis_core::types::{
    DetectionRun, FeedbackAction, HistoricalPattern, Page, PageRequest, Pattern, PatternFeedback,
    PatternFilters, PatternStatus,
};
use jarvis_storage::connection::with_immediate_transaction;
use jarvis_storage::queries::patterns::{self, PatternQuery};
use jarvis_storage::queries::{feedback, runs};

use super::{require_user, InsightService};

impl InsightService {
    /// The user's visible patterns matching `filters`, best first.
    pub fn get_patterns(&self, user_id: &str, filters: &PatternFilters) -> Result<Vec<Pattern>, InsightError> {
        self.get_patterns_at(user_id, filters, Utc::now())
    }

    pub fn get_patterns_at(
        &self,
        user_id: &str,
        filters: &PatternFilters,
        now: DateTime<Utc>,
    ) -> Result<Vec<Pattern>, InsightError> {
        let user_id = require_user(user_id)?;
        let query = PatternQuery {
            dimension: filters.dimension,
            pattern_type: filters.pattern_type,
            include_stale: false,
        };
        let mut found = self
            .rt
            .db
            .with_reader(|conn| patterns::get_patterns(conn, user_id, &query))?;
        found.retain(|p| p.is_visible() && filters.matches(p, now));
        found.sort_by(compare_rank);
        Ok(found)
    }

    /// One page of [`get_patterns`](Self::get_patterns), keyed on the last
    /// id of the previous page. A cursor naming no visible pattern is an
    /// invalid `after` filter.
    pub fn get_patterns_page(
        &self,
        user_id: &str,
        filters: &PatternFilters,
        page: &PageRequest,
    ) -> Result<Page<Pattern>, InsightError> {
        let all = self.get_patterns(user_id, filters)?;
        Page::from_ordered(all, page, |p| p.id.as_str()).ok_or_else(|| InsightError::InvalidFilter {
            field: "after",
            value: page.after_id.clone().unwrap_or_default(),
        })
    }

    /// Record that the user acted on a pattern. Confidence is untouched.
    /// Unknown and retired ids are `NotFound` and change nothing.
    pub fn mark_acted_on(
        &self,
        user_id: &str,
        pattern_id: &str,
        outcome: Option<String>,
    ) -> Result<Pattern, InsightError> {
        let user_id = require_user(user_id)?;
        let outcome = outcome.map(|o| o.trim().to_string()).filter(|o| !o.is_empty());
        let now = Utc::now();

        let updated = self.rt.db.with_writer(|conn| {
            with_immediate_transaction(conn, |tx| {
                let Some(mut pattern) = patterns::get_pattern(tx, user_id, pattern_id)? else {
                    return Ok(None);
                };
                if pattern.status == PatternStatus::Stale {
                    return Ok(None);
                }
                if pattern.mark_acted_on(outcome.clone()).is_err() {
                    return Ok(None);
                }
                patterns::update_pattern(tx, &pattern)?;
                feedback::insert_feedback(
                    tx,
                    &PatternFeedback {
                        pattern_id: pattern.id.clone(),
                        user_id: user_id.to_string(),
                        action: FeedbackAction::ActedOn,
                        outcome: outcome.clone(),
                        created_at: now,
                    },
                )?;
                Ok(Some(pattern))
            })
        })?;

        match updated {
            Some(pattern) => {
                tracing::info!(user_id, pattern_id, "pattern marked acted on");
                Ok(pattern)
            }
            None => Err(InsightError::NotFound { id: pattern_id.to_string() }),
        }
    }

    /// Every pattern the user was ever shown, retired ones included,
    /// newest discovery first.
    pub fn historical_patterns(&self, user_id: &str) -> Result<Vec<HistoricalPattern>, InsightError> {
        let user_id = require_user(user_id)?;
        let mut all = self
            .rt
            .db
            .with_reader(|conn| patterns::get_patterns(conn, user_id, &PatternQuery::all()))?;
        all.retain(|p| p.status != PatternStatus::Candidate);
        all.sort_by(|a, b| b.discovered.cmp(&a.discovered).then_with(|| a.id.cmp(&b.id)));
        Ok(all.iter().map(HistoricalPattern::from).collect())
    }

    /// Detection run audit, most recent first.
    pub fn run_history(&self, user_id: &str, limit: usize) -> Result<Vec<DetectionRun>, InsightError> {
        let user_id = require_user(user_id)?;
        Ok(self
            .rt
            .db
            .with_reader(|conn| runs::list_runs(conn, user_id, limit.clamp(1, 100)))?)
    }
}
