//! Error taxonomy for the JARVIS insight engine.
//!
//! One `thiserror` enum per subsystem. Every error exposes a stable code via
//! [`JarvisErrorCode`] so outer surfaces can map it without string matching.

pub mod config_error;
pub mod detection_error;
pub mod error_code;
pub mod ingestion;
pub mod insight_error;
pub mod storage_error;

pub use config_error::ConfigError;
pub use detection_error::DetectionError;
pub use error_code::JarvisErrorCode;
pub use ingestion::{IngestionWarning, WarningKind};
pub use insight_error::InsightError;
pub use storage_error::StorageError;
