//! HTTP surface: JSON camelCase, caller identified by `X-User-Id`.

mod error;
mod extract;
mod routes;

use std::future::Future;
use std::net::SocketAddr;

use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::service::InsightService;

pub use error::{ApiError, ErrorBody};
pub use extract::UserId;
pub use routes::NEXT_CURSOR_HEADER;

/// Build the router. CORS follows `server.permissive_cors`.
pub fn router(service: InsightService) -> Router {
    let cors = if service.runtime().config.server.permissive_cors {
        CorsLayer::permissive()
    } else {
        CorsLayer::new()
    };

    Router::new()
        // Insights
        .route("/api/insights/patterns", get(routes::list_patterns))
        .route("/api/insights/patterns/:id/acted", post(routes::mark_acted_on))
        .route("/api/insights/refresh", post(routes::refresh))
        .route("/api/insights/runs", get(routes::run_history))
        // Logging
        .route("/api/logs", post(routes::submit_log).get(routes::get_logs))
        .route("/api/logs/questions", get(routes::questions))
        // Dashboard & progress
        .route("/api/dashboard", get(routes::dashboard))
        .route("/api/progress/trends/:dimension", get(routes::trends))
        .route("/api/progress/patterns/historical", get(routes::historical_patterns))
        // Profile & data
        .route("/api/profile", get(routes::get_profile).patch(routes::update_profile))
        .route("/api/data/clear", post(routes::clear_data))
        .route("/api/account/delete", delete(routes::delete_account))
        // Health check
        .route("/health", get(routes::health))
        .with_state(service)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Serve until `shutdown` resolves.
pub async fn serve<F>(service: InsightService, addr: SocketAddr, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(addr = %listener.local_addr()?, "JARVIS API listening");
    axum::serve(listener, router(service))
        .with_graceful_shutdown(shutdown)
        .await
}
