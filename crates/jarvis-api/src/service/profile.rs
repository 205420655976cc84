//! Server-side profile flags.

use chrono::{NaiveTime, Utc};
use jarvis_core::errors::InsightError;
use jarvis_core::types::{ProfileUpdate, UserProfile, RETAIN_FOREVER};
use jarvis_storage::connection::with_immediate_transaction;
use jarvis_storage::queries::{logs, profiles};
use serde::Serialize;

use super::progress::streaks;
use super::{require_user, InsightService};

const MAX_RETENTION_DAYS: i32 = 3650;

/// Profile plus the logging totals the settings screen shows.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileView {
    #[serde(flatten)]
    pub profile: UserProfile,
    pub total_logs: u64,
    pub current_streak: u32,
    pub longest_streak: u32,
}

impl InsightService {
    /// The user's profile, created with defaults on first access.
    pub fn get_profile(&self, user_id: &str) -> Result<ProfileView, InsightError> {
        let user_id = require_user(user_id)?;
        let profile = self.ensure_profile(user_id, None)?;
        self.profile_view(profile)
    }

    pub fn update_profile(&self, user_id: &str, update: ProfileUpdate) -> Result<ProfileView, InsightError> {
        let user_id = require_user(user_id)?;
        validate_update(&update)?;
        let profile = self.ensure_profile(user_id, Some(update))?;
        tracing::debug!(user_id, "profile updated");
        self.profile_view(profile)
    }

    fn ensure_profile(&self, user_id: &str, update: Option<ProfileUpdate>) -> Result<UserProfile, InsightError> {
        let now = Utc::now();
        let retention = self.rt.config.server.default_retention_days;
        Ok(self.rt.db.with_writer(|conn| {
            with_immediate_transaction(conn, |tx| {
                let existing = profiles::get_profile(tx, user_id)?;
                let mut profile = existing
                    .clone()
                    .unwrap_or_else(|| UserProfile::new(user_id, now, retention));
                if let Some(update) = update {
                    profile.apply(update);
                }
                if existing.as_ref() != Some(&profile) {
                    profiles::upsert_profile(tx, &profile, now)?;
                }
                Ok(profile)
            })
        })?)
    }

    /// Days of history kept for `profile`, falling back to the server
    /// default for users who never created one.
    pub(crate) fn retention_window(&self, profile: Option<&UserProfile>) -> Option<u32> {
        match profile {
            Some(profile) => profile.retention_window(),
            None => u32::try_from(self.rt.config.server.default_retention_days)
                .ok()
                .filter(|&days| days > 0),
        }
    }

    fn profile_view(&self, profile: UserProfile) -> Result<ProfileView, InsightError> {
        let (total_logs, days) = self.rt.db.with_reader(|conn| {
            Ok((
                logs::count_logs_since(conn, &profile.user_id, None)?,
                logs::log_days(conn, &profile.user_id)?,
            ))
        })?;
        let streaks = streaks(&days, Utc::now().date_naive());
        Ok(ProfileView {
            profile,
            total_logs,
            current_streak: streaks.current,
            longest_streak: streaks.longest,
        })
    }
}

fn validate_update(update: &ProfileUpdate) -> Result<(), InsightError> {
    if let Some(time) = &update.morning_check_in_time {
        if NaiveTime::parse_from_str(time, "%H:%M").is_err() {
            return Err(InsightError::InvalidProfile {
                field: "morningCheckInTime",
                reason: format!("'{time}' is not HH:MM"),
            });
        }
    }
    if let Some(days) = update.data_retention_days {
        if days != RETAIN_FOREVER && !(1..=MAX_RETENTION_DAYS).contains(&days) {
            return Err(InsightError::InvalidProfile {
                field: "dataRetentionDays",
                reason: format!("{days} is neither {RETAIN_FOREVER} nor within 1..={MAX_RETENTION_DAYS}"),
            });
        }
    }
    Ok(())
}
