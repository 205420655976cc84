//! detection_runs audit table queries.

use chrono::{DateTime, Utc};
use jarvis_core::errors::StorageError;
use jarvis_core::types::{DetectionRun, RunOutcome};
use rusqlite::{params, Connection};

use super::{from_ms, to_ms};

pub fn insert_runs(conn: &Connection, runs: &[DetectionRun]) -> Result<(), StorageError> {
    let mut stmt = conn
        .prepare_cached(
            "INSERT INTO detection_runs
             (user_id, started_ms, finished_ms, outcome, attempts, pattern_count,
              published, retired, warning_count, error)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        )
        .map_err(|e| StorageError::SqliteError { message: e.to_string() })?;

    for run in runs {
        stmt.execute(params![
            run.user_id,
            to_ms(run.started_at),
            to_ms(run.finished_at),
            run.outcome.name(),
            run.attempts,
            run.pattern_count,
            run.published,
            run.retired,
            run.warning_count,
            run.error,
        ])
        .map_err(|e| StorageError::SqliteError { message: e.to_string() })?;
    }
    Ok(())
}

/// Most recent runs first.
pub fn list_runs(conn: &Connection, user_id: &str, limit: usize) -> Result<Vec<DetectionRun>, StorageError> {
    let mut stmt = conn
        .prepare_cached(
            "SELECT started_ms, finished_ms, outcome, attempts, pattern_count,
                    published, retired, warning_count, error
             FROM detection_runs WHERE user_id = ?1
             ORDER BY started_ms DESC, id DESC LIMIT ?2",
        )
        .map_err(|e| StorageError::SqliteError { message: e.to_string() })?;

    let rows = stmt
        .query_map(params![user_id, limit as i64], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, u32>(3)?,
                row.get::<_, u32>(4)?,
                row.get::<_, u32>(5)?,
                row.get::<_, u32>(6)?,
                row.get::<_, u32>(7)?,
                row.get::<_, Option<String>>(8)?,
            ))
        })
        .map_err(|e| StorageError::SqliteError { message: e.to_string() })?;

    let mut out = Vec::new();
    for row in rows {
        let (started, finished, outcome, attempts, pattern_count, published, retired, warning_count, error) =
            row.map_err(|e| StorageError::SqliteError { message: e.to_string() })?;
        out.push(DetectionRun {
            user_id: user_id.to_string(),
            started_at: from_ms(started)?,
            finished_at: from_ms(finished)?,
            outcome: RunOutcome::parse(&outcome).ok_or_else(|| StorageError::Serialization {
                message: format!("unknown run outcome '{outcome}'"),
            })?,
            attempts,
            pattern_count,
            published,
            retired,
            warning_count,
            error,
        });
    }
    Ok(out)
}

/// Start of the user's most recent run, whatever its outcome.
pub fn last_run_started_at(conn: &Connection, user_id: &str) -> Result<Option<DateTime<Utc>>, StorageError> {
    let ms: Option<i64> = conn
        .query_row(
            "SELECT MAX(started_ms) FROM detection_runs WHERE user_id = ?1",
            params![user_id],
            |row| row.get(0),
        )
        .map_err(|e| StorageError::SqliteError { message: e.to_string() })?;
    ms.map(from_ms).transpose()
}

pub fn delete_runs(conn: &Connection, user_id: &str) -> Result<usize, StorageError> {
    conn.execute("DELETE FROM detection_runs WHERE user_id = ?1", params![user_id])
        .map_err(|e| StorageError::SqliteError { message: e.to_string() })
}
