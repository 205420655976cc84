//! Blocking service operations behind every HTTP route.
//!
//! Every call is scoped to one user id. Reads use the pooled readers;
//! user-visible writes are immediate transactions on the writer; derived
//! data goes through the runtime's batch writer.

mod detection;
mod insights;
mod logs;
mod profile;
mod progress;

use std::sync::Arc;

use chrono::NaiveDate;
use jarvis_core::errors::InsightError;

use crate::runtime::{self, JarvisRuntime, RuntimeError};

pub use detection::RefreshReport;
pub use logs::{ClearReport, SubmitReceipt};
pub use profile::ProfileView;
pub use progress::{streaks, Dashboard, DimensionStatus, DimensionSummary, Streaks, TrendPoint};

#[derive(Clone)]
pub struct InsightService {
    rt: Arc<JarvisRuntime>,
}

impl InsightService {
    pub fn new(rt: Arc<JarvisRuntime>) -> Self {
        Self { rt }
    }

    /// Service over the global runtime.
    pub fn from_global() -> Result<Self, RuntimeError> {
        Ok(Self::new(runtime::get()?))
    }

    pub fn runtime(&self) -> &Arc<JarvisRuntime> {
        &self.rt
    }
}

/// Trimmed, non-empty user id.
fn require_user(user_id: &str) -> Result<&str, InsightError> {
    let user_id = user_id.trim();
    if user_id.is_empty() {
        return Err(InsightError::Unauthorized);
    }
    Ok(user_id)
}

/// `YYYY-MM-DD`, or an RFC 3339 timestamp reduced to its UTC day.
fn parse_day(field: &'static str, raw: &str) -> Result<NaiveDate, InsightError> {
    let raw = raw.trim();
    raw.parse::<NaiveDate>()
        .or_else(|_| {
            chrono::DateTime::parse_from_rfc3339(raw).map(|at| at.naive_utc().date())
        })
        .map_err(|_| InsightError::InvalidFilter {
            field,
            value: raw.to_string(),
        })
}
