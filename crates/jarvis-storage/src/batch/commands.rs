//! BatchCommand enum: every write that may go through the batch writer.

use chrono::{DateTime, Utc};
use crossbeam_channel::Sender;
use jarvis_core::errors::StorageError;
use jarvis_core::types::{DetectionRun, FeatureVector};

/// A command sent to the batch writer thread.
#[derive(Debug)]
pub enum BatchCommand {
    /// Insert or replace cached feature vectors.
    UpsertFeatureVectors(Vec<FeatureVectorRow>),
    /// Append detection run audit rows.
    InsertDetectionRuns(Vec<DetectionRun>),
    /// Flush any pending writes immediately.
    Flush,
    /// Flush, then answer with the first flush failure since the previous
    /// barrier, if any.
    Barrier(Sender<Result<(), StorageError>>),
    /// Shut down the writer thread.
    Shutdown,
}

/// A row for the feature_vectors table.
#[derive(Debug, Clone)]
pub struct FeatureVectorRow {
    pub user_id: String,
    /// `YYYY-MM-DD`.
    pub day: String,
    pub payload: String,
    pub computed_ms: i64,
}

impl FeatureVectorRow {
    pub fn from_vector(vector: &FeatureVector, computed_at: DateTime<Utc>) -> Result<Self, StorageError> {
        Ok(Self {
            user_id: vector.user_id.clone(),
            day: vector.date.to_string(),
            payload: serde_json::to_string(vector).map_err(StorageError::serialization)?,
            computed_ms: computed_at.timestamp_millis(),
        })
    }
}
