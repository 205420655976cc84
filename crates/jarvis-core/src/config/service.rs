//! Storage, scheduler, and HTTP server settings.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;

use super::invalid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub db_path: PathBuf,
    /// Read-only connections kept open next to the writer.
    pub read_pool_size: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(".jarvis/jarvis.db"),
            read_pool_size: 4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Seconds between scheduled detection sweeps.
    pub interval_secs: u64,
    /// New log entries after which a user's detection runs on demand.
    pub new_log_threshold: u32,
    /// Worker threads for cross-user detection; 0 = one per CPU.
    pub worker_threads: usize,
    /// Attempts per job, including the first.
    pub max_attempts: u32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval_secs: 24 * 60 * 60,
            new_log_threshold: 10,
            worker_threads: 0,
            max_attempts: 2,
        }
    }
}

impl SchedulerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.interval_secs == 0 {
            return Err(invalid("scheduler.interval_secs", "must be positive"));
        }
        if self.new_log_threshold == 0 {
            return Err(invalid("scheduler.new_log_threshold", "must be positive"));
        }
        if self.max_attempts == 0 {
            return Err(invalid("scheduler.max_attempts", "must be at least 1"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub addr: String,
    /// Allow any origin (development front ends).
    pub permissive_cors: bool,
    /// Retention applied to new profiles; `-1` keeps history forever.
    pub default_retention_days: i32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1:8000".to_string(),
            permissive_cors: true,
            default_retention_days: 365,
        }
    }
}

impl ServerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_retention_days == 0 || self.default_retention_days < -1 {
            return Err(invalid("server.default_retention_days", "must be -1 or positive"));
        }
        Ok(())
    }
}
