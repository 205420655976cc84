//! user_profiles table queries.

use chrono::{DateTime, Utc};
use jarvis_core::errors::StorageError;
use jarvis_core::types::UserProfile;
use rusqlite::{params, Connection, OptionalExtension};

use super::{from_json, to_json, to_ms};

pub fn get_profile(conn: &Connection, user_id: &str) -> Result<Option<UserProfile>, StorageError> {
    let payload: Option<String> = conn
        .prepare_cached("SELECT payload FROM user_profiles WHERE user_id = ?1")
        .and_then(|mut stmt| stmt.query_row(params![user_id], |row| row.get(0)).optional())
        .map_err(|e| StorageError::SqliteError { message: e.to_string() })?;
    payload.map(|p| from_json(&p)).transpose()
}

pub fn upsert_profile(conn: &Connection, profile: &UserProfile, now: DateTime<Utc>) -> Result<(), StorageError> {
    let payload = to_json(profile)?;
    conn.prepare_cached(
        "INSERT OR REPLACE INTO user_profiles (user_id, payload, updated_ms) VALUES (?1, ?2, ?3)",
    )
    .and_then(|mut stmt| stmt.execute(params![profile.user_id, payload, to_ms(now)]))
    .map_err(|e| StorageError::SqliteError { message: e.to_string() })?;
    Ok(())
}

pub fn delete_profile(conn: &Connection, user_id: &str) -> Result<usize, StorageError> {
    conn.execute("DELETE FROM user_profiles WHERE user_id = ?1", params![user_id])
        .map_err(|e| StorageError::SqliteError { message: e.to_string() })
}
