use super::detection_error::DetectionError;
use super::error_code::{self, JarvisErrorCode};
use super::storage_error::StorageError;

/// Errors surfaced to callers of the insight API.
#[derive(Debug, Clone, thiserror::Error)]
pub enum InsightError {
    #[error("invalid value '{value}' for filter '{field}'")]
    InvalidFilter { field: &'static str, value: String },

    #[error("pattern not found: {id}")]
    NotFound { id: String },

    #[error("invalid log entry: {reason}")]
    InvalidLog { reason: String },

    #[error("invalid profile field '{field}': {reason}")]
    InvalidProfile { field: &'static str, reason: String },

    #[error("missing or empty user id")]
    Unauthorized,

    #[error("invalid lifecycle transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    #[error(transparent)]
    Detection(#[from] DetectionError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl JarvisErrorCode for InsightError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidFilter { .. } => error_code::INVALID_FILTER,
            Self::NotFound { .. } => error_code::NOT_FOUND,
            Self::InvalidLog { .. } => error_code::INVALID_LOG,
            Self::InvalidProfile { .. } => error_code::INVALID_PROFILE,
            Self::Unauthorized => error_code::UNAUTHORIZED,
            Self::InvalidTransition { .. } => error_code::INVALID_TRANSITION,
            Self::Detection(e) => e.error_code(),
            Self::Storage(e) => e.error_code(),
        }
    }
}
