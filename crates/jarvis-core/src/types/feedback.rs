//! User feedback on patterns.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackAction {
    ActedOn,
}

impl FeedbackAction {
    pub fn name(&self) -> &'static str {
        match self {
            Self::ActedOn => "acted_on",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "acted_on" => Some(Self::ActedOn),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatternFeedback {
    pub pattern_id: String,
    pub user_id: String,
    pub action: FeedbackAction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<String>,
    pub created_at: DateTime<Utc>,
}
