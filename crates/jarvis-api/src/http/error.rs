//! Error → HTTP response mapping. Bodies are `{message, code}`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use jarvis_core::errors::error_code::{self, JarvisErrorCode};
use jarvis_core::errors::InsightError;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub message: String,
    pub code: &'static str,
}

#[derive(Debug)]
pub enum ApiError {
    Insight(InsightError),
    /// A blocking task died before answering.
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Insight(e) => match e {
                InsightError::InvalidFilter { .. }
                | InsightError::InvalidLog { .. }
                | InsightError::InvalidProfile { .. } => StatusCode::BAD_REQUEST,
                InsightError::NotFound { .. } => StatusCode::NOT_FOUND,
                InsightError::Unauthorized => StatusCode::UNAUTHORIZED,
                InsightError::InvalidTransition { .. } => StatusCode::CONFLICT,
                InsightError::Detection(_) | InsightError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn body(&self) -> ErrorBody {
        match self {
            // Internal details go to the log, not to the client.
            Self::Insight(e @ (InsightError::Detection(_) | InsightError::Storage(_))) => ErrorBody {
                message: "internal error".to_string(),
                code: e.error_code(),
            },
            Self::Insight(e) => ErrorBody {
                message: e.to_string(),
                code: e.error_code(),
            },
            Self::Internal(_) => ErrorBody {
                message: "internal error".to_string(),
                code: error_code::INTERNAL_ERROR,
            },
        }
    }
}

impl From<InsightError> for ApiError {
    fn from(e: InsightError) -> Self {
        Self::Insight(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            match &self {
                Self::Insight(e) => tracing::error!(error = %e, code = e.error_code(), "request failed"),
                Self::Internal(message) => tracing::error!(error = %message, "request failed"),
            }
        }
        (status, Json(self.body())).into_response()
    }
}
