//! patterns table queries.
//!
//! The full `Pattern` lives in `payload`; the other columns exist for
//! filtering and for the feedback fields, which only the insight surface
//! mutates.

use jarvis_core::errors::StorageError;
use jarvis_core::types::collections::FxHashMap;
use jarvis_core::types::{Dimension, Pattern, PatternStatus, PatternType};
use rusqlite::{params, Connection, OptionalExtension};

use super::{from_json, to_json, to_ms};

/// Column-level filters. Timeframe and ordering are applied by callers.
#[derive(Debug, Clone, Copy, Default)]
pub struct PatternQuery {
    pub dimension: Option<Dimension>,
    pub pattern_type: Option<PatternType>,
    pub include_stale: bool,
}

impl PatternQuery {
    pub fn visible() -> Self {
        Self::default()
    }

    pub fn all() -> Self {
        Self { include_stale: true, ..Self::default() }
    }
}

pub fn get_patterns(conn: &Connection, user_id: &str, query: &PatternQuery) -> Result<Vec<Pattern>, StorageError> {
    let mut stmt = conn
        .prepare_cached(
            "SELECT payload FROM patterns
             WHERE user_id = ?1
               AND (?2 IS NULL OR dimension = ?2)
               AND (?3 IS NULL OR type = ?3)
               AND (?4 OR status IN ('active', 'acted_on'))
             ORDER BY confidence DESC, discovered_ms DESC, id",
        )
        .map_err(|e| StorageError::SqliteError { message: e.to_string() })?;

    let payloads = stmt
        .query_map(
            params![
                user_id,
                query.dimension.map(|d| d.name()),
                query.pattern_type.map(|t| t.name()),
                query.include_stale,
            ],
            |row| row.get::<_, String>(0),
        )
        .map_err(|e| StorageError::SqliteError { message: e.to_string() })?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| StorageError::SqliteError { message: e.to_string() })?;

    payloads.iter().map(|p| from_json(p)).collect()
}

pub fn get_pattern(conn: &Connection, user_id: &str, id: &str) -> Result<Option<Pattern>, StorageError> {
    let payload: Option<String> = conn
        .prepare_cached("SELECT payload FROM patterns WHERE user_id = ?1 AND id = ?2")
        .and_then(|mut stmt| stmt.query_row(params![user_id, id], |row| row.get(0)).optional())
        .map_err(|e| StorageError::SqliteError { message: e.to_string() })?;
    payload.map(|p| from_json(&p)).transpose()
}

fn insert_pattern(conn: &Connection, pattern: &Pattern) -> Result<(), StorageError> {
    let mut stmt = conn
        .prepare_cached(
            "INSERT OR REPLACE INTO patterns
             (id, user_id, dimension, type, status, confidence, discovered_ms,
              was_acted_on, outcome, payload)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        )
        .map_err(|e| StorageError::SqliteError { message: e.to_string() })?;

    stmt.execute(params![
        pattern.id,
        pattern.user_id,
        pattern.dimension.name(),
        pattern.pattern_type.name(),
        pattern.status.name(),
        pattern.confidence,
        to_ms(pattern.discovered),
        pattern.was_acted_on,
        pattern.outcome,
        to_json(pattern)?,
    ])
    .map_err(|e| StorageError::SqliteError { message: e.to_string() })?;
    Ok(())
}

/// Write back one pattern after a feedback change.
pub fn update_pattern(conn: &Connection, pattern: &Pattern) -> Result<(), StorageError> {
    insert_pattern(conn, pattern)
}

/// Replace a user's whole pattern set. Feedback recorded since the caller
/// read the previous set wins over what the caller computed. Run inside a
/// transaction.
pub fn replace_patterns(conn: &Connection, user_id: &str, patterns: &[Pattern]) -> Result<usize, StorageError> {
    let mut acted: FxHashMap<String, Option<String>> = FxHashMap::default();
    {
        let mut stmt = conn
            .prepare_cached("SELECT id, outcome FROM patterns WHERE user_id = ?1 AND was_acted_on = 1")
            .map_err(|e| StorageError::SqliteError { message: e.to_string() })?;
        let rows = stmt
            .query_map(params![user_id], |row| Ok((row.get::<_, String>(0)?, row.get::<_, Option<String>>(1)?)))
            .map_err(|e| StorageError::SqliteError { message: e.to_string() })?;
        for row in rows {
            let (id, outcome) = row.map_err(|e| StorageError::SqliteError { message: e.to_string() })?;
            acted.insert(id, outcome);
        }
    }

    delete_patterns(conn, user_id)?;

    for pattern in patterns {
        match acted.get(&pattern.id) {
            Some(outcome) if !pattern.was_acted_on => {
                let mut merged = pattern.clone();
                merged.was_acted_on = true;
                if merged.outcome.is_none() {
                    merged.outcome = outcome.clone();
                }
                if merged.status == PatternStatus::Active {
                    merged.status = PatternStatus::ActedOn;
                }
                insert_pattern(conn, &merged)?;
            }
            _ => insert_pattern(conn, pattern)?,
        }
    }
    Ok(patterns.len())
}

pub fn delete_patterns(conn: &Connection, user_id: &str) -> Result<usize, StorageError> {
    conn.execute("DELETE FROM patterns WHERE user_id = ?1", params![user_id])
        .map_err(|e| StorageError::SqliteError { message: e.to_string() })
}
