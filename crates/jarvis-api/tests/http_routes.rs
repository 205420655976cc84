//! Router behavior over an in-memory runtime.

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use chrono::{Duration, Utc};
use jarvis_api::http::{router, NEXT_CURSOR_HEADER};
use jarvis_api::runtime::JarvisRuntime;
use jarvis_api::InsightService;
use jarvis_core::types::{LogKind, NewLogEntry};
use jarvis_core::JarvisConfig;
use serde_json::{json, Value};
use tower::ServiceExt;

const USER: &str = "alex";

fn service() -> InsightService {
    let mut config = JarvisConfig::default();
    config.scheduler.new_log_threshold = 1_000;
    InsightService::new(Arc::new(JarvisRuntime::in_memory(config).unwrap()))
}

fn request(method: Method, uri: &str, user: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(user) = user {
        builder = builder.header("x-user-id", user);
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, axum::http::HeaderMap, Value) {
    let response = app.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, headers, body)
}

/// Two weeks of stress-then-restless-night logs ending yesterday, then one
/// detection run.
fn seed_patterns(service: &InsightService) -> usize {
    let today = Utc::now().date_naive();
    let stressed = [0, 2, 4, 6, 8];
    for day in 0..14i64 {
        let date = today - Duration::days(14 - day);
        let morning = date.and_hms_opt(7, 0, 0).unwrap().and_utc();
        let afternoon = date.and_hms_opt(14, 0, 0).unwrap().and_utc();
        let sleep = if day > 0 && stressed.contains(&(day - 1)) { "restless" } else { "good" };
        let stress = if stressed.contains(&day) { "high" } else { "low" };
        for (kind, timestamp, data) in [
            (LogKind::MorningMood, morning, json!({"mood": 3, "sleep": sleep})),
            (LogKind::QuickLog, afternoon, json!({"stress": stress, "context": "work"})),
        ] {
            service
                .submit_log(
                    USER,
                    NewLogEntry {
                        kind,
                        timestamp,
                        data: data.as_object().cloned().unwrap_or_default(),
                    },
                )
                .unwrap();
        }
    }
    service.run_detection(USER).unwrap();
    service.get_patterns(USER, &Default::default()).unwrap().len()
}

#[tokio::test]
async fn health_reports_version() {
    let app = router(service());
    let (status, _, body) = send(&app, request(Method::GET, "/health", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn missing_user_header_is_unauthorized() {
    let app = router(service());
    let (status, _, body) = send(&app, request(Method::GET, "/api/insights/patterns", None, None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "UNAUTHORIZED");

    let (status, _, _) = send(&app, request(Method::GET, "/api/dashboard", Some("  "), None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn unknown_filter_values_are_bad_requests() {
    let app = router(service());
    let (status, _, body) = send(
        &app,
        request(Method::GET, "/api/insights/patterns?dimension=cosmic", Some(USER), None),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_FILTER");
    assert!(body["message"].as_str().unwrap().contains("cosmic"));

    let (status, _, body) = send(&app, request(Method::GET, "/api/logs/questions?hour=24", None, None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_FILTER");

    let (status, _, body) = send(
        &app,
        request(Method::GET, "/api/insights/patterns?after=pat_gone", Some(USER), None),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_FILTER");
    assert!(body["message"].as_str().unwrap().contains("pat_gone"));
}

#[tokio::test]
async fn acting_on_an_unknown_pattern_is_not_found() {
    let app = router(service());
    let (status, _, body) = send(
        &app,
        request(
            Method::POST,
            "/api/insights/patterns/pat_missing/acted",
            Some(USER),
            Some(json!({"outcome": "tried it"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn logs_are_created_and_listed() {
    let app = router(service());
    let entry = json!({
        "type": "quick_log",
        "timestamp": "2024-10-22T14:00:00Z",
        "data": {"stress": "high", "context": "work"}
    });
    let (status, _, body) = send(&app, request(Method::POST, "/api/logs", Some(USER), Some(entry))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["success"], true);
    assert_eq!(body["detectionScheduled"], false);
    let id = body["id"].as_str().unwrap().to_string();

    let (status, _, body) = send(
        &app,
        request(Method::GET, "/api/logs?start_date=2024-10-22&end_date=2024-10-22", Some(USER), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let logs = body.as_array().unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0]["id"], id.as_str());
    assert_eq!(logs[0]["type"], "quick_log");

    // Another user sees nothing.
    let (_, _, body) = send(&app, request(Method::GET, "/api/logs", Some("sam"), None)).await;
    assert_eq!(body.as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn malformed_logs_are_rejected() {
    let app = router(service());
    let (status, _, body) = send(
        &app,
        request(Method::POST, "/api/logs", Some(USER), Some(json!({"type": "nap", "timestamp": "soon"}))),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_LOG");

    let (status, _, body) = send(
        &app,
        request(
            Method::POST,
            "/api/logs",
            Some(USER),
            Some(json!({"type": "quick_log", "timestamp": "2024-10-22T14:00:00Z", "data": {"focus": "laser"}})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_LOG");

    let far_future = (Utc::now() + Duration::days(400)).to_rfc3339();
    let (status, _, body) = send(
        &app,
        request(
            Method::POST,
            "/api/logs",
            Some(USER),
            Some(json!({"type": "quick_log", "timestamp": far_future, "data": {"stress": "high"}})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_LOG");

    let (_, _, body) = send(&app, request(Method::GET, "/api/logs", Some(USER), None)).await;
    assert!(body.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn profile_updates_are_validated() {
    let app = router(service());
    let (status, _, body) = send(&app, request(Method::GET, "/api/profile", Some(USER), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["userId"], USER);
    assert_eq!(body["totalLogs"], 0);

    let (status, _, body) = send(
        &app,
        request(Method::PATCH, "/api/profile", Some(USER), Some(json!({"morningCheckInTime": "25:99"}))),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_PROFILE");

    let (status, _, body) = send(
        &app,
        request(
            Method::PATCH,
            "/api/profile",
            Some(USER),
            Some(json!({"onboardingComplete": true, "morningCheckInTime": "07:30"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["onboardingComplete"], true);
    assert_eq!(body["morningCheckInTime"], "07:30");
}

#[tokio::test]
async fn patterns_page_through_the_cursor_header() {
    let service = service();
    let total = tokio::task::spawn_blocking({
        let service = service.clone();
        move || seed_patterns(&service)
    })
    .await
    .unwrap();
    assert!(total >= 1);
    let app = router(service);

    let (status, headers, body) = send(
        &app,
        request(Method::GET, "/api/insights/patterns?limit=1", Some(USER), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let first = body.as_array().unwrap();
    assert_eq!(first.len(), 1);

    let mut seen = vec![first[0]["id"].as_str().unwrap().to_string()];
    let mut cursor = headers
        .get(NEXT_CURSOR_HEADER)
        .map(|v| v.to_str().unwrap().to_string());
    while let Some(after) = cursor {
        let (_, headers, body) = send(
            &app,
            request(
                Method::GET,
                &format!("/api/insights/patterns?limit=1&after={after}"),
                Some(USER),
                None,
            ),
        )
        .await;
        for p in body.as_array().unwrap() {
            seen.push(p["id"].as_str().unwrap().to_string());
        }
        cursor = headers
            .get(NEXT_CURSOR_HEADER)
            .map(|v| v.to_str().unwrap().to_string());
    }
    assert_eq!(seen.len(), total);

    let (status, _, body) = send(
        &app,
        request(Method::GET, "/api/insights/patterns?limit=1&after=pat_retired", Some(USER), None),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_FILTER");

    let id = seen[0].clone();
    let (status, _, body) = send(
        &app,
        request(Method::POST, &format!("/api/insights/patterns/{id}/acted"), Some(USER), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let (status, _, body) = send(&app, request(Method::GET, "/api/progress/patterns/historical", Some(USER), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.as_array().unwrap().len() >= total);

    let (status, _, body) = send(&app, request(Method::POST, "/api/data/clear", Some(USER), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    let (_, _, body) = send(&app, request(Method::GET, "/api/insights/patterns", Some(USER), None)).await;
    assert_eq!(body.as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn dashboard_and_trends_respond() {
    let app = router(service());
    let (status, _, body) = send(&app, request(Method::GET, "/api/dashboard", Some(USER), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["currentStreak"], 0);
    assert_eq!(body["hasNewInsights"], false);

    let (status, _, body) = send(
        &app,
        request(Method::GET, "/api/progress/trends/physical?range=month", Some(USER), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.as_array().unwrap().is_empty());

    let (status, _, body) = send(
        &app,
        request(Method::GET, "/api/progress/trends/cosmic", Some(USER), None),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_FILTER");
}
