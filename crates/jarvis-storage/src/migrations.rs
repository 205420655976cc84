//! Schema migrations, tracked with `PRAGMA user_version`.

use jarvis_core::errors::StorageError;
use rusqlite::Connection;

const V1_INITIAL: &str = "
CREATE TABLE IF NOT EXISTS log_entries (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL,
    kind TEXT NOT NULL,
    timestamp_ms INTEGER NOT NULL,
    day TEXT NOT NULL,
    dimension_hints TEXT NOT NULL,
    fields TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_log_entries_user_time ON log_entries(user_id, timestamp_ms);

CREATE TABLE IF NOT EXISTS feature_vectors (
    user_id TEXT NOT NULL,
    day TEXT NOT NULL,
    payload TEXT NOT NULL,
    computed_ms INTEGER NOT NULL,
    PRIMARY KEY (user_id, day)
);

CREATE TABLE IF NOT EXISTS patterns (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL,
    dimension TEXT NOT NULL,
    type TEXT NOT NULL,
    status TEXT NOT NULL,
    confidence INTEGER NOT NULL,
    discovered_ms INTEGER NOT NULL,
    was_acted_on INTEGER NOT NULL DEFAULT 0,
    outcome TEXT,
    payload TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_patterns_user_dimension_type ON patterns(user_id, dimension, type);

CREATE TABLE IF NOT EXISTS user_profiles (
    user_id TEXT PRIMARY KEY,
    payload TEXT NOT NULL,
    updated_ms INTEGER NOT NULL
);
";

const V2_FEEDBACK_AND_RUNS: &str = "
CREATE TABLE IF NOT EXISTS pattern_feedback (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    pattern_id TEXT NOT NULL,
    user_id TEXT NOT NULL,
    action TEXT NOT NULL,
    outcome TEXT,
    created_ms INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_pattern_feedback_user ON pattern_feedback(user_id, pattern_id);

CREATE TABLE IF NOT EXISTS detection_runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id TEXT NOT NULL,
    started_ms INTEGER NOT NULL,
    finished_ms INTEGER NOT NULL,
    outcome TEXT NOT NULL,
    attempts INTEGER NOT NULL,
    pattern_count INTEGER NOT NULL,
    published INTEGER NOT NULL,
    retired INTEGER NOT NULL,
    warning_count INTEGER NOT NULL,
    error TEXT
);
CREATE INDEX IF NOT EXISTS idx_detection_runs_user ON detection_runs(user_id, started_ms);
";

const MIGRATIONS: &[(u32, &str)] = &[(1, V1_INITIAL), (2, V2_FEEDBACK_AND_RUNS)];

pub const LATEST_VERSION: u32 = 2;

pub fn schema_version(conn: &Connection) -> Result<u32, StorageError> {
    conn.query_row("PRAGMA user_version", [], |row| row.get(0))
        .map_err(StorageError::sqlite)
}

/// Apply every pending migration, each in its own transaction. Returns the
/// resulting schema version.
pub fn run_migrations(conn: &Connection) -> Result<u32, StorageError> {
    let current = schema_version(conn)?;
    if current > LATEST_VERSION {
        return Err(StorageError::MigrationFailed {
            version: current,
            message: format!("database is newer than this build (v{LATEST_VERSION})"),
        });
    }

    for &(version, sql) in MIGRATIONS.iter().filter(|(v, _)| *v > current) {
        let failed = |e: rusqlite::Error| StorageError::MigrationFailed {
            version,
            message: e.to_string(),
        };
        let tx = conn.unchecked_transaction().map_err(failed)?;
        tx.execute_batch(sql).map_err(failed)?;
        tx.pragma_update(None, "user_version", version).map_err(failed)?;
        tx.commit().map_err(failed)?;
        tracing::info!(version, "applied schema migration");
    }

    Ok(LATEST_VERSION.max(current))
}
