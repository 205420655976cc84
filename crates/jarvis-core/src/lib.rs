//! # jarvis-core
//!
//! Shared foundation for the JARVIS insight engine: wire types, error
//! taxonomy, configuration, tracing setup, and cancellation primitives.

pub mod config;
pub mod constants;
pub mod errors;
pub mod logging;
pub mod traits;
pub mod types;

pub use config::JarvisConfig;
pub use errors::{ConfigError, DetectionError, InsightError, JarvisErrorCode, StorageError};
pub use traits::CancellationToken;
