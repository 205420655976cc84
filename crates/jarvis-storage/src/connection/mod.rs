//! Connection management: one serialized writer, a small pool of readers.

pub mod writer;

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use jarvis_core::errors::StorageError;
use rusqlite::{Connection, OpenFlags};

use crate::migrations;

pub use writer::with_immediate_transaction;

const WRITER_PRAGMAS: &str = "PRAGMA journal_mode = WAL;
     PRAGMA synchronous = NORMAL;
     PRAGMA foreign_keys = ON;
     PRAGMA busy_timeout = 5000;
     PRAGMA temp_store = MEMORY;";

const READER_PRAGMAS: &str = "PRAGMA busy_timeout = 5000;
     PRAGMA query_only = ON;";

pub struct DatabaseManager {
    path: Option<PathBuf>,
    writer: Mutex<Connection>,
    /// Empty for in-memory databases; reads then go through the writer.
    readers: Vec<Mutex<Connection>>,
    next_reader: AtomicUsize,
}

impl DatabaseManager {
    /// Open (creating if needed) a file-backed database and migrate it.
    pub fn open(path: &Path, read_pool_size: usize) -> Result<Self, StorageError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| StorageError::SqliteError {
                message: format!("cannot create {}: {e}", parent.display()),
            })?;
        }

        let writer = Connection::open(path).map_err(StorageError::sqlite)?;
        writer.execute_batch(WRITER_PRAGMAS).map_err(StorageError::sqlite)?;
        let version = migrations::run_migrations(&writer)?;

        let mut readers = Vec::with_capacity(read_pool_size);
        for _ in 0..read_pool_size {
            let reader = Connection::open_with_flags(
                path,
                OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
            )
            .map_err(StorageError::sqlite)?;
            reader.execute_batch(READER_PRAGMAS).map_err(StorageError::sqlite)?;
            readers.push(Mutex::new(reader));
        }

        tracing::info!(path = %path.display(), schema_version = version, readers = read_pool_size, "database opened");

        Ok(Self {
            path: Some(path.to_path_buf()),
            writer: Mutex::new(writer),
            readers,
            next_reader: AtomicUsize::new(0),
        })
    }

    /// A private in-memory database, used by tests and ephemeral runs.
    pub fn open_in_memory() -> Result<Self, StorageError> {
        let writer = Connection::open_in_memory().map_err(StorageError::sqlite)?;
        writer
            .execute_batch("PRAGMA foreign_keys = ON;")
            .map_err(StorageError::sqlite)?;
        migrations::run_migrations(&writer)?;
        Ok(Self {
            path: None,
            writer: Mutex::new(writer),
            readers: Vec::new(),
            next_reader: AtomicUsize::new(0),
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn is_in_memory(&self) -> bool {
        self.path.is_none()
    }

    pub fn with_writer<F, T>(&self, f: F) -> Result<T, StorageError>
    where
        F: FnOnce(&Connection) -> Result<T, StorageError>,
    {
        let conn = lock(&self.writer, "writer")?;
        f(&conn)
    }

    pub fn with_reader<F, T>(&self, f: F) -> Result<T, StorageError>
    where
        F: FnOnce(&Connection) -> Result<T, StorageError>,
    {
        if self.readers.is_empty() {
            return self.with_writer(f);
        }
        let start = self.next_reader.fetch_add(1, Ordering::Relaxed) % self.readers.len();
        // Prefer an idle reader; otherwise wait on the round-robin pick.
        for offset in 0..self.readers.len() {
            let slot = &self.readers[(start + offset) % self.readers.len()];
            if let Ok(conn) = slot.try_lock() {
                return f(&conn);
            }
        }
        let conn = lock(&self.readers[start], "reader")?;
        f(&conn)
    }

    /// A fresh write connection for the batch writer thread. `None` for
    /// in-memory databases, which cannot be shared across connections.
    pub fn open_batch_connection(&self) -> Result<Option<Connection>, StorageError> {
        let Some(path) = &self.path else {
            return Ok(None);
        };
        let conn = Connection::open(path).map_err(StorageError::sqlite)?;
        conn.execute_batch(WRITER_PRAGMAS).map_err(StorageError::sqlite)?;
        Ok(Some(conn))
    }
}

fn lock<'a>(mutex: &'a Mutex<Connection>, role: &str) -> Result<MutexGuard<'a, Connection>, StorageError> {
    mutex.lock().map_err(|_| StorageError::SqliteError {
        message: format!("{role} connection lock poisoned"),
    })
}
