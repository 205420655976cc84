//! Route handlers. Service calls block on SQLite, so each runs on the
//! blocking pool.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::Json;
use chrono::{Timelike, Utc};
use jarvis_analysis::features::{contextual_questions, ContextualQuestion};
use jarvis_core::constants::VERSION;
use jarvis_core::errors::InsightError;
use jarvis_core::types::{
    DetectionRun, HistoricalPattern, LogEntry, NewLogEntry, PageRequest, Pattern, PatternFilters,
    ProfileUpdate,
};
use serde::{Deserialize, Serialize};

use crate::service::{Dashboard, InsightService, ProfileView, RefreshReport, SubmitReceipt, TrendPoint};

use super::error::ApiError;
use super::extract::UserId;

/// Response header carrying the cursor of the next page.
pub const NEXT_CURSOR_HEADER: &str = "x-next-cursor";

async fn blocking<T, F>(service: &InsightService, f: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&InsightService) -> Result<T, InsightError> + Send + 'static,
{
    let service = service.clone();
    tokio::task::spawn_blocking(move || f(&service))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?
        .map_err(ApiError::from)
}

#[derive(Serialize)]
pub(super) struct Success {
    success: bool,
}

const SUCCESS: Success = Success { success: true };

#[derive(Serialize)]
pub(super) struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

pub(super) async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok", version: VERSION })
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct PatternsQuery {
    dimension: Option<String>,
    #[serde(rename = "type")]
    pattern_type: Option<String>,
    timeframe: Option<String>,
    limit: Option<u32>,
    after: Option<String>,
}

/// Array of patterns; when more remain, the next cursor is in
/// `X-Next-Cursor`.
pub(super) async fn list_patterns(
    State(service): State<InsightService>,
    UserId(user_id): UserId,
    Query(query): Query<PatternsQuery>,
) -> Result<(HeaderMap, Json<Vec<Pattern>>), ApiError> {
    let filters = PatternFilters::parse(
        query.dimension.as_deref(),
        query.pattern_type.as_deref(),
        query.timeframe.as_deref(),
    )?;
    let page = PageRequest {
        after_id: query.after.filter(|a| !a.is_empty()),
        limit: query.limit,
    };
    let page = blocking(&service, move |s| s.get_patterns_page(&user_id, &filters, &page)).await?;

    let mut headers = HeaderMap::new();
    if let Some(cursor) = page.next_cursor.as_deref() {
        if let Ok(value) = HeaderValue::from_str(cursor) {
            headers.insert(NEXT_CURSOR_HEADER, value);
        }
    }
    Ok((headers, Json(page.items)))
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct ActedBody {
    outcome: Option<String>,
}

pub(super) async fn mark_acted_on(
    State(service): State<InsightService>,
    UserId(user_id): UserId,
    Path(pattern_id): Path<String>,
    body: Option<Json<ActedBody>>,
) -> Result<Json<Success>, ApiError> {
    let outcome = body.and_then(|Json(b)| b.outcome);
    blocking(&service, move |s| s.mark_acted_on(&user_id, &pattern_id, outcome)).await?;
    Ok(Json(SUCCESS))
}

pub(super) async fn refresh(
    State(service): State<InsightService>,
    UserId(user_id): UserId,
) -> Result<Json<RefreshReport>, ApiError> {
    Ok(Json(blocking(&service, move |s| s.run_detection(&user_id)).await?))
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct RunsQuery {
    limit: Option<usize>,
}

pub(super) async fn run_history(
    State(service): State<InsightService>,
    UserId(user_id): UserId,
    Query(query): Query<RunsQuery>,
) -> Result<Json<Vec<DetectionRun>>, ApiError> {
    let limit = query.limit.unwrap_or(20);
    Ok(Json(blocking(&service, move |s| s.run_history(&user_id, limit)).await?))
}

pub(super) async fn submit_log(
    State(service): State<InsightService>,
    UserId(user_id): UserId,
    body: Result<Json<NewLogEntry>, JsonRejection>,
) -> Result<(StatusCode, Json<SubmitReceipt>), ApiError> {
    let Json(entry) = body.map_err(|e| InsightError::InvalidLog { reason: e.body_text() })?;
    let receipt = blocking(&service, move |s| s.submit_log(&user_id, entry)).await?;
    Ok((StatusCode::CREATED, Json(receipt)))
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct LogsQuery {
    start_date: Option<String>,
    end_date: Option<String>,
}

pub(super) async fn get_logs(
    State(service): State<InsightService>,
    UserId(user_id): UserId,
    Query(query): Query<LogsQuery>,
) -> Result<Json<Vec<LogEntry>>, ApiError> {
    Ok(Json(
        blocking(&service, move |s| {
            s.get_logs(&user_id, query.start_date.as_deref(), query.end_date.as_deref())
        })
        .await?,
    ))
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct QuestionsQuery {
    hour: Option<u32>,
}

pub(super) async fn questions(Query(query): Query<QuestionsQuery>) -> Result<Json<Vec<ContextualQuestion>>, ApiError> {
    let hour = query.hour.unwrap_or_else(|| Utc::now().hour());
    if hour > 23 {
        return Err(InsightError::InvalidFilter {
            field: "hour",
            value: hour.to_string(),
        }
        .into());
    }
    Ok(Json(contextual_questions(hour)))
}

pub(super) async fn dashboard(
    State(service): State<InsightService>,
    UserId(user_id): UserId,
) -> Result<Json<Dashboard>, ApiError> {
    Ok(Json(blocking(&service, move |s| s.dashboard(&user_id)).await?))
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct TrendsQuery {
    range: Option<String>,
}

pub(super) async fn trends(
    State(service): State<InsightService>,
    UserId(user_id): UserId,
    Path(dimension): Path<String>,
    Query(query): Query<TrendsQuery>,
) -> Result<Json<Vec<TrendPoint>>, ApiError> {
    Ok(Json(
        blocking(&service, move |s| s.trends(&user_id, &dimension, query.range.as_deref())).await?,
    ))
}

pub(super) async fn historical_patterns(
    State(service): State<InsightService>,
    UserId(user_id): UserId,
) -> Result<Json<Vec<HistoricalPattern>>, ApiError> {
    Ok(Json(blocking(&service, move |s| s.historical_patterns(&user_id)).await?))
}

pub(super) async fn get_profile(
    State(service): State<InsightService>,
    UserId(user_id): UserId,
) -> Result<Json<ProfileView>, ApiError> {
    Ok(Json(blocking(&service, move |s| s.get_profile(&user_id)).await?))
}

pub(super) async fn update_profile(
    State(service): State<InsightService>,
    UserId(user_id): UserId,
    body: Result<Json<ProfileUpdate>, JsonRejection>,
) -> Result<Json<ProfileView>, ApiError> {
    let Json(update) = body.map_err(|e| InsightError::InvalidProfile {
        field: "body",
        reason: e.body_text(),
    })?;
    Ok(Json(blocking(&service, move |s| s.update_profile(&user_id, update)).await?))
}

pub(super) async fn clear_data(
    State(service): State<InsightService>,
    UserId(user_id): UserId,
) -> Result<Json<Success>, ApiError> {
    blocking(&service, move |s| s.clear_data(&user_id)).await?;
    Ok(Json(SUCCESS))
}

pub(super) async fn delete_account(
    State(service): State<InsightService>,
    UserId(user_id): UserId,
) -> Result<Json<Success>, ApiError> {
    blocking(&service, move |s| s.delete_account(&user_id)).await?;
    Ok(Json(SUCCESS))
}
