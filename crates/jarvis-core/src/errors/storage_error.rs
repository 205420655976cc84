use super::error_code::{self, JarvisErrorCode};

/// Errors raised by the SQLite persistence layer.
#[derive(Debug, Clone, thiserror::Error)]
pub enum StorageError {
    #[error("SQLite error: {message}")]
    SqliteError { message: String },

    #[error("migration v{version} failed: {message}")]
    MigrationFailed { version: u32, message: String },

    #[error("serialization error: {message}")]
    Serialization { message: String },
}

impl StorageError {
    pub fn sqlite(e: impl std::fmt::Display) -> Self {
        Self::SqliteError { message: e.to_string() }
    }

    pub fn serialization(e: impl std::fmt::Display) -> Self {
        Self::Serialization { message: e.to_string() }
    }
}

impl JarvisErrorCode for StorageError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::SqliteError { .. } => error_code::STORAGE_ERROR,
            Self::MigrationFailed { .. } => error_code::MIGRATION_ERROR,
            Self::Serialization { .. } => error_code::SERIALIZATION_ERROR,
        }
    }
}
