//! Server-side user profile flags (formerly client `localStorage`).

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// `dataRetentionDays` value that keeps history forever.
pub const RETAIN_FOREVER: i32 = -1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub user_id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    pub joined_at: DateTime<Utc>,
    #[serde(default)]
    pub onboarding_complete: bool,
    #[serde(default)]
    pub open_integrations: bool,
    #[serde(default)]
    pub skipped_integrations: bool,
    #[serde(default)]
    pub last_morning_log_date: Option<NaiveDate>,
    /// "HH:MM".
    #[serde(default)]
    pub morning_check_in_time: Option<String>,
    /// Days of history kept, or [`RETAIN_FOREVER`].
    pub data_retention_days: i32,
}

impl UserProfile {
    pub fn new(user_id: impl Into<String>, now: DateTime<Utc>, data_retention_days: i32) -> Self {
        Self {
            user_id: user_id.into(),
            name: None,
            email: None,
            joined_at: now,
            onboarding_complete: false,
            open_integrations: false,
            skipped_integrations: false,
            last_morning_log_date: None,
            morning_check_in_time: None,
            data_retention_days,
        }
    }

    /// Days of history kept; `None` when nothing expires.
    pub fn retention_window(&self) -> Option<u32> {
        u32::try_from(self.data_retention_days).ok().filter(|&days| days > 0)
    }

    pub fn apply(&mut self, update: ProfileUpdate) {
        if let Some(v) = update.name {
            self.name = Some(v);
        }
        if let Some(v) = update.email {
            self.email = Some(v);
        }
        if let Some(v) = update.onboarding_complete {
            self.onboarding_complete = v;
        }
        if let Some(v) = update.open_integrations {
            self.open_integrations = v;
        }
        if let Some(v) = update.skipped_integrations {
            self.skipped_integrations = v;
        }
        if let Some(v) = update.morning_check_in_time {
            self.morning_check_in_time = Some(v);
        }
        if let Some(v) = update.data_retention_days {
            self.data_retention_days = v;
        }
    }
}

/// `PATCH /api/profile` body; absent fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub onboarding_complete: Option<bool>,
    pub open_integrations: Option<bool>,
    pub skipped_integrations: Option<bool>,
    pub morning_check_in_time: Option<String>,
    pub data_retention_days: Option<i32>,
}
