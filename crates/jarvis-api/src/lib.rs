//! # jarvis-api
//!
//! The outer surface of the JARVIS insight engine:
//! - [`runtime`]: process-wide singleton owning config, database, batch
//!   writer, worker pool and the job registry
//! - [`service`]: insight, ingestion, profile and progress operations
//! - [`scheduler`]: nightly and on-demand detection sweeps
//! - [`http`]: axum routes over the service

pub mod http;
pub mod jobs;
pub mod runtime;
pub mod scheduler;
pub mod service;

pub use runtime::{JarvisRuntime, RuntimeError, RuntimeOptions};
pub use scheduler::{DetectionScheduler, SweepReport};
pub use service::InsightService;
