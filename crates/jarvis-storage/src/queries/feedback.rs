//! pattern_feedback table queries.

use jarvis_core::errors::StorageError;
use jarvis_core::types::{FeedbackAction, PatternFeedback};
use rusqlite::{params, Connection};

use super::{from_ms, to_ms};

pub fn insert_feedback(conn: &Connection, feedback: &PatternFeedback) -> Result<i64, StorageError> {
    let mut stmt = conn
        .prepare_cached(
            "INSERT INTO pattern_feedback (pattern_id, user_id, action, outcome, created_ms)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .map_err(|e| StorageError::SqliteError { message: e.to_string() })?;
    stmt.execute(params![
        feedback.pattern_id,
        feedback.user_id,
        feedback.action.name(),
        feedback.outcome,
        to_ms(feedback.created_at),
    ])
    .map_err(|e| StorageError::SqliteError { message: e.to_string() })?;
    Ok(conn.last_insert_rowid())
}

/// A user's feedback, oldest first.
pub fn get_feedback(conn: &Connection, user_id: &str) -> Result<Vec<PatternFeedback>, StorageError> {
    let mut stmt = conn
        .prepare_cached(
            "SELECT pattern_id, action, outcome, created_ms FROM pattern_feedback
             WHERE user_id = ?1 ORDER BY created_ms, id",
        )
        .map_err(|e| StorageError::SqliteError { message: e.to_string() })?;
    let rows = stmt
        .query_map(params![user_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, Option<String>>(2)?,
                row.get::<_, i64>(3)?,
            ))
        })
        .map_err(|e| StorageError::SqliteError { message: e.to_string() })?;

    let mut out = Vec::new();
    for row in rows {
        let (pattern_id, action, outcome, created_ms) =
            row.map_err(|e| StorageError::SqliteError { message: e.to_string() })?;
        out.push(PatternFeedback {
            pattern_id,
            user_id: user_id.to_string(),
            action: FeedbackAction::parse(&action).ok_or_else(|| StorageError::Serialization {
                message: format!("unknown feedback action '{action}'"),
            })?,
            outcome,
            created_at: from_ms(created_ms)?,
        });
    }
    Ok(out)
}

pub fn delete_feedback(conn: &Connection, user_id: &str) -> Result<usize, StorageError> {
    conn.execute("DELETE FROM pattern_feedback WHERE user_id = ?1", params![user_id])
        .map_err(|e| StorageError::SqliteError { message: e.to_string() })
}
