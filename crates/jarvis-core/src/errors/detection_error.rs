use super::error_code::{self, JarvisErrorCode};
use super::storage_error::StorageError;

/// Errors that abort a single user's detection job.
///
/// Running out of history is not an error: the pipeline reports it as an
/// `InsufficientData` outcome with an empty pattern list.
#[derive(Debug, Clone, thiserror::Error)]
pub enum DetectionError {
    #[error("detection exceeded its {budget_ms}ms budget after {elapsed_ms}ms")]
    Timeout { elapsed_ms: u64, budget_ms: u64 },

    #[error("detection cancelled")]
    Cancelled,

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl DetectionError {
    /// Timeouts are worth one more attempt; cancellation and storage
    /// failures are not.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

impl JarvisErrorCode for DetectionError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Timeout { .. } => error_code::DETECTION_TIMEOUT,
            Self::Cancelled => error_code::DETECTION_CANCELLED,
            Self::Storage(e) => e.error_code(),
        }
    }
}
