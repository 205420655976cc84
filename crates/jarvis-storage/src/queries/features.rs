//! feature_vectors cache queries. The cache is derived data: rows may be
//! missing or invalidated at any time and are rebuilt from logs.

use chrono::NaiveDate;
use jarvis_core::errors::StorageError;
use jarvis_core::types::FeatureVector;
use rusqlite::{params, Connection};

use crate::batch::FeatureVectorRow;

use super::from_json;

/// Rows for users without any log entry are skipped: their data was cleared
/// after the vectors were computed.
pub fn upsert_feature_vectors(conn: &Connection, rows: &[FeatureVectorRow]) -> Result<(), StorageError> {
    let mut stmt = conn
        .prepare_cached(
            "INSERT OR REPLACE INTO feature_vectors (user_id, day, payload, computed_ms)
             SELECT ?1, ?2, ?3, ?4
             WHERE EXISTS (SELECT 1 FROM log_entries WHERE user_id = ?1)",
        )
        .map_err(|e| StorageError::SqliteError { message: e.to_string() })?;

    for row in rows {
        stmt.execute(params![row.user_id, row.day, row.payload, row.computed_ms])
            .map_err(|e| StorageError::SqliteError { message: e.to_string() })?;
    }
    Ok(())
}

/// Cached vectors within `from..=to`, oldest first. Gaps are not filled.
pub fn get_feature_vectors(
    conn: &Connection,
    user_id: &str,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<Vec<FeatureVector>, StorageError> {
    let mut stmt = conn
        .prepare_cached(
            "SELECT payload FROM feature_vectors
             WHERE user_id = ?1 AND day >= ?2 AND day <= ?3
             ORDER BY day",
        )
        .map_err(|e| StorageError::SqliteError { message: e.to_string() })?;

    let payloads = stmt
        .query_map(params![user_id, from.to_string(), to.to_string()], |row| {
            row.get::<_, String>(0)
        })
        .map_err(|e| StorageError::SqliteError { message: e.to_string() })?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| StorageError::SqliteError { message: e.to_string() })?;

    payloads.iter().map(|p| from_json(p)).collect()
}

/// Drop cached vectors for `from..=to`, e.g. after a late log entry.
pub fn invalidate_range(
    conn: &Connection,
    user_id: &str,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<usize, StorageError> {
    conn.execute(
        "DELETE FROM feature_vectors WHERE user_id = ?1 AND day >= ?2 AND day <= ?3",
        params![user_id, from.to_string(), to.to_string()],
    )
    .map_err(|e| StorageError::SqliteError { message: e.to_string() })
}

pub fn delete_feature_vectors_before(
    conn: &Connection,
    user_id: &str,
    cutoff: NaiveDate,
) -> Result<usize, StorageError> {
    conn.execute(
        "DELETE FROM feature_vectors WHERE user_id = ?1 AND day < ?2",
        params![user_id, cutoff.to_string()],
    )
    .map_err(|e| StorageError::SqliteError { message: e.to_string() })
}

pub fn delete_feature_vectors(conn: &Connection, user_id: &str) -> Result<usize, StorageError> {
    conn.execute("DELETE FROM feature_vectors WHERE user_id = ?1", params![user_id])
        .map_err(|e| StorageError::SqliteError { message: e.to_string() })
}
