//! Configuration: TOML file, environment overrides, validation.
//!
//! Every section has serde defaults, so an empty file (or no file at all)
//! yields a working configuration.

mod engine;
mod service;

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;

pub use engine::{DetectionConfig, FeatureConfig, RankingConfig};
pub use service::{SchedulerConfig, ServerConfig, StorageConfig};

pub const CONFIG_ENV: &str = "JARVIS_CONFIG";
pub const DB_PATH_ENV: &str = "JARVIS_DB_PATH";
pub const ADDR_ENV: &str = "JARVIS_ADDR";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JarvisConfig {
    pub storage: StorageConfig,
    pub features: FeatureConfig,
    pub detection: DetectionConfig,
    pub ranking: RankingConfig,
    pub scheduler: SchedulerConfig,
    pub server: ServerConfig,
}

impl JarvisConfig {
    pub fn from_toml(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s).map_err(|e| ConfigError::ParseError {
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path` (or `$JARVIS_CONFIG`), apply environment overrides,
    /// then validate. No path and no env var means defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let env_path = std::env::var(CONFIG_ENV).ok();
        let path = path.map(Path::to_path_buf).or_else(|| env_path.map(Into::into));

        let mut config: Self = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(&path).map_err(|e| ConfigError::FileRead {
                    path: path.display().to_string(),
                    message: e.to_string(),
                })?;
                toml::from_str(&raw).map_err(|e| ConfigError::ParseError {
                    message: e.to_string(),
                })?
            }
            None => Self::default(),
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    pub fn apply_env_overrides(&mut self) {
        if let Ok(db) = std::env::var(DB_PATH_ENV) {
            if !db.trim().is_empty() {
                self.storage.db_path = db.into();
            }
        }
        if let Ok(addr) = std::env::var(ADDR_ENV) {
            if !addr.trim().is_empty() {
                self.server.addr = addr;
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.features.validate()?;
        self.detection.validate()?;
        self.ranking.validate()?;
        self.scheduler.validate()?;
        self.server.validate()?;
        Ok(())
    }
}

pub(crate) fn invalid(field: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        message: message.into(),
    }
}
