//! Query filters mirroring the front end's `PatternFilters`.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::InsightError;

use super::dimension::Dimension;
use super::pattern::{Pattern, PatternType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Timeframe {
    Week,
    Month,
    #[default]
    All,
}

impl Timeframe {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "week" => Some(Self::Week),
            "month" => Some(Self::Month),
            "all" => Some(Self::All),
            _ => None,
        }
    }

    /// Oldest discovery time still inside the timeframe.
    pub fn cutoff(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            Self::Week => Some(now - Duration::days(7)),
            Self::Month => Some(now - Duration::days(30)),
            Self::All => None,
        }
    }
}

/// `None` means "all" for dimension and type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatternFilters {
    pub dimension: Option<Dimension>,
    #[serde(rename = "type")]
    pub pattern_type: Option<PatternType>,
    #[serde(default)]
    pub timeframe: Timeframe,
}

impl PatternFilters {
    /// Parse raw query values. Empty strings and `"all"` mean no filter;
    /// anything unrecognised is an `InvalidFilter` error.
    pub fn parse(
        dimension: Option<&str>,
        pattern_type: Option<&str>,
        timeframe: Option<&str>,
    ) -> Result<Self, InsightError> {
        let dimension = match normalize(dimension) {
            None => None,
            Some(raw) => Some(Dimension::parse(raw).ok_or_else(|| InsightError::InvalidFilter {
                field: "dimension",
                value: raw.to_string(),
            })?),
        };
        let pattern_type = match normalize(pattern_type) {
            None => None,
            Some(raw) => Some(PatternType::parse(raw).ok_or_else(|| InsightError::InvalidFilter {
                field: "type",
                value: raw.to_string(),
            })?),
        };
        let timeframe = match timeframe.map(str::trim).filter(|s| !s.is_empty()) {
            None => Timeframe::All,
            Some(raw) => Timeframe::parse(raw).ok_or_else(|| InsightError::InvalidFilter {
                field: "timeframe",
                value: raw.to_string(),
            })?,
        };
        Ok(Self { dimension, pattern_type, timeframe })
    }

    pub fn matches(&self, pattern: &Pattern, now: DateTime<Utc>) -> bool {
        if let Some(d) = self.dimension {
            if pattern.dimension != d {
                return false;
            }
        }
        if let Some(t) = self.pattern_type {
            if pattern.pattern_type != t {
                return false;
            }
        }
        match self.timeframe.cutoff(now) {
            Some(cutoff) => pattern.discovered >= cutoff,
            None => true,
        }
    }
}

fn normalize(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim).filter(|s| !s.is_empty() && *s != "all")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_values() {
        let f = PatternFilters::parse(Some("mental"), Some("all"), None).unwrap();
        assert_eq!(f.dimension, Some(Dimension::Mental));
        assert_eq!(f.pattern_type, None);
        assert_eq!(f.timeframe, Timeframe::All);
    }

    #[test]
    fn rejects_unknown_values() {
        let err = PatternFilters::parse(Some("emotional"), None, None).unwrap_err();
        assert!(matches!(err, InsightError::InvalidFilter { field: "dimension", .. }));

        let err = PatternFilters::parse(None, Some("strength"), None).unwrap_err();
        assert!(matches!(err, InsightError::InvalidFilter { field: "type", .. }));

        let err = PatternFilters::parse(None, None, Some("year")).unwrap_err();
        assert!(matches!(err, InsightError::InvalidFilter { field: "timeframe", .. }));
    }
}
