//! Stable error codes shared by every error enum.

pub const STORAGE_ERROR: &str = "STORAGE_ERROR";
pub const MIGRATION_ERROR: &str = "MIGRATION_ERROR";
pub const SERIALIZATION_ERROR: &str = "SERIALIZATION_ERROR";
pub const CONFIG_ERROR: &str = "CONFIG_ERROR";
pub const DETECTION_TIMEOUT: &str = "DETECTION_TIMEOUT";
pub const DETECTION_CANCELLED: &str = "DETECTION_CANCELLED";
pub const INVALID_FILTER: &str = "INVALID_FILTER";
pub const INVALID_LOG: &str = "INVALID_LOG";
pub const INVALID_PROFILE: &str = "INVALID_PROFILE";
pub const NOT_FOUND: &str = "NOT_FOUND";
pub const UNAUTHORIZED: &str = "UNAUTHORIZED";
pub const INVALID_TRANSITION: &str = "INVALID_TRANSITION";
pub const RUNTIME_NOT_INITIALIZED: &str = "RUNTIME_NOT_INITIALIZED";
pub const ALREADY_INITIALIZED: &str = "ALREADY_INITIALIZED";
pub const INIT_ERROR: &str = "INIT_ERROR";
pub const INTERNAL_ERROR: &str = "INTERNAL_ERROR";

/// Implemented by every JARVIS error type.
pub trait JarvisErrorCode {
    fn error_code(&self) -> &'static str;
}
