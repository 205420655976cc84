//! Log entries as submitted by the logging flows.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::dimension::Dimension;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogKind {
    MorningMood,
    QuickLog,
    EndOfDay,
}

impl LogKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::MorningMood => "morning_mood",
            Self::QuickLog => "quick_log",
            Self::EndOfDay => "end_of_day",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "morning_mood" => Some(Self::MorningMood),
            "quick_log" => Some(Self::QuickLog),
            "end_of_day" => Some(Self::EndOfDay),
            _ => None,
        }
    }
}

impl fmt::Display for LogKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An immutable, stored log entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub id: String,
    pub user_id: String,
    #[serde(rename = "type")]
    pub kind: LogKind,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub dimension_hints: BTreeSet<Dimension>,
    #[serde(rename = "data", alias = "fields")]
    pub fields: Map<String, Value>,
}

impl LogEntry {
    /// Calendar day (UTC) the entry counts towards.
    pub fn date(&self) -> NaiveDate {
        self.timestamp.date_naive()
    }

    pub fn field(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }
}

/// The `POST /api/logs` request body: `{type, timestamp, data}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewLogEntry {
    #[serde(rename = "type")]
    pub kind: LogKind,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub data: Map<String, Value>,
}
