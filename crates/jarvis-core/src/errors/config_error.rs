use super::error_code::{self, JarvisErrorCode};

/// Errors raised while loading or validating configuration.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {message}")]
    FileRead { path: String, message: String },

    #[error("failed to parse config: {message}")]
    ParseError { message: String },

    #[error("invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}

impl JarvisErrorCode for ConfigError {
    fn error_code(&self) -> &'static str {
        error_code::CONFIG_ERROR
    }
}
