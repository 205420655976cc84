//! Dashboard and trend aggregates over cached feature vectors.

use std::collections::BTreeSet;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use jarvis_analysis::ranking::compare_rank;
use jarvis_core::errors::InsightError;
use jarvis_core::types::{Dimension, FeatureVector, Pattern, PatternStatus, PatternType, Timeframe};
use jarvis_storage::batch::{BatchCommand, FeatureVectorRow};
use jarvis_storage::queries::patterns::{self, PatternQuery};
use jarvis_storage::queries::{features, logs};
use serde::Serialize;

use super::{require_user, InsightService};

/// Patterns discovered this recently and not yet acted on count as new.
const NEW_INSIGHT_DAYS: i64 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DimensionStatus {
    Great,
    Good,
    Warning,
    Alert,
}

impl DimensionStatus {
    /// Bands over the 0-10 dimension score.
    pub fn from_score(score: f64) -> Self {
        if score >= 8.0 {
            Self::Great
        } else if score >= 6.0 {
            Self::Good
        } else if score >= 4.0 {
            Self::Warning
        } else {
            Self::Alert
        }
    }

    fn blurb(&self) -> &'static str {
        match self {
            Self::Great => "Going strong",
            Self::Good => "Holding steady",
            Self::Warning => "Worth keeping an eye on",
            Self::Alert => "Needs some attention",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DimensionSummary {
    pub dimension: Dimension,
    pub status: DimensionStatus,
    pub score: f64,
    /// Title of the dimension's top pattern, or a status line.
    pub insight: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    /// Dimensions without a current score are omitted.
    pub dimensions: Vec<DimensionSummary>,
    pub current_streak: u32,
    pub longest_streak: u32,
    pub has_new_insights: bool,
    pub has_active_interventions: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_log_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendPoint {
    pub date: NaiveDate,
    pub value: f64,
    pub dimension: Dimension,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Streaks {
    pub current: u32,
    pub longest: u32,
}

/// Consecutive logging days. The current streak still counts when today
/// has no entry yet but yesterday does.
pub fn streaks(days: &[NaiveDate], today: NaiveDate) -> Streaks {
    let set: BTreeSet<NaiveDate> = days.iter().copied().filter(|d| *d <= today).collect();

    let mut longest = 0;
    let mut run = 0;
    let mut prev: Option<NaiveDate> = None;
    for day in &set {
        run = match prev {
            Some(p) if *day - p == Duration::days(1) => run + 1,
            _ => 1,
        };
        longest = longest.max(run);
        prev = Some(*day);
    }

    let mut cursor = if set.contains(&today) { today } else { today - Duration::days(1) };
    let mut current = 0;
    while set.contains(&cursor) {
        current += 1;
        cursor -= Duration::days(1);
    }

    Streaks { current, longest }
}

impl InsightService {
    pub fn dashboard(&self, user_id: &str) -> Result<Dashboard, InsightError> {
        self.dashboard_at(user_id, Utc::now())
    }

    pub fn dashboard_at(&self, user_id: &str, now: DateTime<Utc>) -> Result<Dashboard, InsightError> {
        let user_id = require_user(user_id)?;
        let today = now.date_naive();

        let (days, last_log_at, mut visible) = self.rt.db.with_reader(|conn| {
            Ok((
                logs::log_days(conn, user_id)?,
                logs::latest_log_at(conn, user_id)?,
                patterns::get_patterns(conn, user_id, &PatternQuery::visible())?,
            ))
        })?;
        visible.sort_by(compare_rank);

        let latest = self.feature_vectors(user_id, today, today)?.pop();
        let dimensions = Dimension::ALL
            .iter()
            .filter_map(|&dimension| {
                let score = latest.as_ref()?.score(dimension)?;
                let status = DimensionStatus::from_score(score);
                let insight = visible
                    .iter()
                    .find(|p| p.dimension == dimension)
                    .map_or_else(|| status.blurb().to_string(), |p| p.title.clone());
                Some(DimensionSummary { dimension, status, score, insight })
            })
            .collect();

        let streaks = streaks(&days, today);
        let new_since = now - Duration::days(NEW_INSIGHT_DAYS);
        Ok(Dashboard {
            dimensions,
            current_streak: streaks.current,
            longest_streak: streaks.longest,
            has_new_insights: visible.iter().any(|p| is_new(p, new_since)),
            has_active_interventions: visible
                .iter()
                .any(|p| p.status == PatternStatus::Active && p.pattern_type == PatternType::Alert),
            last_log_at,
        })
    }

    /// Daily dimension scores over `range`, days without a score omitted.
    pub fn trends(&self, user_id: &str, dimension: &str, range: Option<&str>) -> Result<Vec<TrendPoint>, InsightError> {
        self.trends_at(user_id, dimension, range, Utc::now())
    }

    pub fn trends_at(
        &self,
        user_id: &str,
        dimension: &str,
        range: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Vec<TrendPoint>, InsightError> {
        let user_id = require_user(user_id)?;
        let dimension = Dimension::parse(dimension.trim()).ok_or_else(|| InsightError::InvalidFilter {
            field: "dimension",
            value: dimension.to_string(),
        })?;
        let range = match range.map(str::trim).filter(|r| !r.is_empty()) {
            None => Timeframe::Week,
            Some(raw) => Timeframe::parse(raw).ok_or_else(|| InsightError::InvalidFilter {
                field: "range",
                value: raw.to_string(),
            })?,
        };

        let today = now.date_naive();
        let from = match range {
            Timeframe::Week => today - Duration::days(6),
            Timeframe::Month => today - Duration::days(29),
            Timeframe::All => {
                let first = self
                    .rt
                    .db
                    .with_reader(|conn| logs::log_days(conn, user_id))?
                    .first()
                    .copied();
                match first {
                    Some(first) if first <= today => first,
                    _ => return Ok(Vec::new()),
                }
            }
        };

        Ok(self
            .feature_vectors(user_id, from, today)?
            .into_iter()
            .filter_map(|v| {
                v.score(dimension).map(|value| TrendPoint {
                    date: v.date,
                    value,
                    dimension,
                })
            })
            .collect())
    }

    /// One vector per day in `from..=to`, served from the cache when it is
    /// complete, otherwise rebuilt from logs and written back.
    pub fn feature_vectors(
        &self,
        user_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<FeatureVector>, InsightError> {
        let expected = (to - from).num_days() + 1;
        let cached = self
            .rt
            .db
            .with_reader(|conn| features::get_feature_vectors(conn, user_id, from, to))?;
        if cached.len() as i64 == expected {
            return Ok(cached);
        }

        let history = self
            .rt
            .db
            .with_reader(|conn| logs::get_logs(conn, user_id, None, Some(to)))?;
        let extraction = self.rt.pipeline.extractor().extract_range(user_id, &history, from, to);
        for warning in &extraction.warnings {
            tracing::warn!(user_id, %warning, "log entry skipped during extraction");
        }

        let now = Utc::now();
        let rows = extraction
            .vectors
            .iter()
            .map(|v| FeatureVectorRow::from_vector(v, now))
            .collect::<Result<Vec<_>, _>>()?;
        self.rt.write_derived(BatchCommand::UpsertFeatureVectors(rows))?;
        tracing::debug!(user_id, %from, %to, cached = cached.len(), "feature cache rebuilt");
        Ok(extraction.vectors)
    }
}

fn is_new(pattern: &Pattern, since: DateTime<Utc>) -> bool {
    pattern.status == PatternStatus::Active && !pattern.was_acted_on && pattern.discovered >= since
}
