//! log_entries table queries.

use chrono::{DateTime, NaiveDate, Utc};
use jarvis_core::errors::StorageError;
use jarvis_core::types::{LogEntry, LogKind};
use rusqlite::{params, Connection};

use super::{from_json, from_ms, parse_day, to_json, to_ms};

pub fn insert_log(conn: &Connection, entry: &LogEntry) -> Result<(), StorageError> {
    let mut stmt = conn
        .prepare_cached(
            "INSERT INTO log_entries
             (id, user_id, kind, timestamp_ms, day, dimension_hints, fields)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )
        .map_err(|e| StorageError::SqliteError { message: e.to_string() })?;

    stmt.execute(params![
        entry.id,
        entry.user_id,
        entry.kind.name(),
        to_ms(entry.timestamp),
        entry.date().to_string(),
        to_json(&entry.dimension_hints)?,
        to_json(&entry.fields)?,
    ])
    .map_err(|e| StorageError::SqliteError { message: e.to_string() })?;
    Ok(())
}

/// A user's entries, optionally bounded by inclusive UTC days, oldest first.
pub fn get_logs(
    conn: &Connection,
    user_id: &str,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
) -> Result<Vec<LogEntry>, StorageError> {
    let mut stmt = conn
        .prepare_cached(
            "SELECT id, user_id, kind, timestamp_ms, dimension_hints, fields
             FROM log_entries
             WHERE user_id = ?1
               AND (?2 IS NULL OR day >= ?2)
               AND (?3 IS NULL OR day <= ?3)
             ORDER BY timestamp_ms, id",
        )
        .map_err(|e| StorageError::SqliteError { message: e.to_string() })?;

    let rows = stmt
        .query_map(
            params![user_id, from.map(|d| d.to_string()), to.map(|d| d.to_string())],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, i64>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, String>(5)?,
                ))
            },
        )
        .map_err(|e| StorageError::SqliteError { message: e.to_string() })?;

    let mut entries = Vec::new();
    for row in rows {
        let (id, user_id, kind, timestamp_ms, hints, fields) =
            row.map_err(|e| StorageError::SqliteError { message: e.to_string() })?;
        let kind = LogKind::parse(&kind).ok_or_else(|| StorageError::Serialization {
            message: format!("unknown log kind '{kind}'"),
        })?;
        entries.push(LogEntry {
            id,
            user_id,
            kind,
            timestamp: from_ms(timestamp_ms)?,
            dimension_hints: from_json(&hints)?,
            fields: from_json(&fields)?,
        });
    }
    Ok(entries)
}

/// Entries created strictly after `since` (all entries when `None`).
pub fn count_logs_since(
    conn: &Connection,
    user_id: &str,
    since: Option<DateTime<Utc>>,
) -> Result<u64, StorageError> {
    conn.prepare_cached(
        "SELECT COUNT(*) FROM log_entries
         WHERE user_id = ?1 AND (?2 IS NULL OR timestamp_ms > ?2)",
    )
    .and_then(|mut stmt| stmt.query_row(params![user_id, since.map(to_ms)], |row| row.get::<_, i64>(0)))
    .map(|n| n as u64)
    .map_err(|e| StorageError::SqliteError { message: e.to_string() })
}

/// Distinct days with at least one entry, oldest first.
pub fn log_days(conn: &Connection, user_id: &str) -> Result<Vec<NaiveDate>, StorageError> {
    let mut stmt = conn
        .prepare_cached("SELECT DISTINCT day FROM log_entries WHERE user_id = ?1 ORDER BY day")
        .map_err(|e| StorageError::SqliteError { message: e.to_string() })?;
    let days = stmt
        .query_map(params![user_id], |row| row.get::<_, String>(0))
        .map_err(|e| StorageError::SqliteError { message: e.to_string() })?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| StorageError::SqliteError { message: e.to_string() })?;
    days.iter().map(|d| parse_day(d)).collect()
}

pub fn latest_log_at(conn: &Connection, user_id: &str) -> Result<Option<DateTime<Utc>>, StorageError> {
    let ms: Option<i64> = conn
        .query_row(
            "SELECT MAX(timestamp_ms) FROM log_entries WHERE user_id = ?1",
            params![user_id],
            |row| row.get(0),
        )
        .map_err(|e| StorageError::SqliteError { message: e.to_string() })?;
    ms.map(from_ms).transpose()
}

/// Every user with at least one entry.
pub fn list_users(conn: &Connection) -> Result<Vec<String>, StorageError> {
    let mut stmt = conn
        .prepare_cached("SELECT DISTINCT user_id FROM log_entries ORDER BY user_id")
        .map_err(|e| StorageError::SqliteError { message: e.to_string() })?;
    let users = stmt
        .query_map([], |row| row.get(0))
        .map_err(|e| StorageError::SqliteError { message: e.to_string() })?
        .collect::<Result<Vec<String>, _>>()
        .map_err(|e| StorageError::SqliteError { message: e.to_string() })?;
    Ok(users)
}

/// Drop a user's entries from UTC days before `cutoff`.
pub fn delete_logs_before(conn: &Connection, user_id: &str, cutoff: NaiveDate) -> Result<usize, StorageError> {
    conn.execute(
        "DELETE FROM log_entries WHERE user_id = ?1 AND day < ?2",
        params![user_id, cutoff.to_string()],
    )
    .map_err(|e| StorageError::SqliteError { message: e.to_string() })
}

pub fn delete_logs(conn: &Connection, user_id: &str) -> Result<usize, StorageError> {
    conn.execute("DELETE FROM log_entries WHERE user_id = ?1", params![user_id])
        .map_err(|e| StorageError::SqliteError { message: e.to_string() })
}
