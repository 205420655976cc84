//! Write connection utilities: BEGIN IMMEDIATE transactions.

use jarvis_core::errors::StorageError;
use rusqlite::{Connection, Transaction, TransactionBehavior};

/// Execute `f` inside a BEGIN IMMEDIATE transaction. The write lock is taken
/// up front, so concurrent writers queue on `busy_timeout` instead of
/// failing mid-transaction. Any error rolls everything back.
pub fn with_immediate_transaction<F, T>(conn: &Connection, f: F) -> Result<T, StorageError>
where
    F: FnOnce(&Transaction<'_>) -> Result<T, StorageError>,
{
    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate).map_err(|e| {
        StorageError::SqliteError {
            message: format!("failed to begin immediate: {e}"),
        }
    })?;

    let result = f(&tx)?;

    tx.commit().map_err(|e| StorageError::SqliteError {
        message: format!("failed to commit: {e}"),
    })?;

    Ok(result)
}
