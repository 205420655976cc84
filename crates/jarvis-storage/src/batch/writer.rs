//! Dedicated writer thread with crossbeam-channel bounded(1024).
//! Batches writes into single transactions for throughput.
//!
//! A failed flush drops that batch and the thread keeps serving; the failure
//! is reported to the next [`BatchWriter::sync`] caller.

use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use jarvis_core::errors::StorageError;
use rusqlite::Connection;

use crate::queries::{features, runs};

use super::commands::BatchCommand;

const CHANNEL_BOUND: usize = 1024;
const BATCH_SIZE: usize = 500;
const FLUSH_TIMEOUT: Duration = Duration::from_millis(100);

/// Statistics from the batch writer.
#[derive(Debug, Default, Clone)]
pub struct WriteStats {
    pub feature_vector_rows: usize,
    pub detection_run_rows: usize,
    pub flushes: usize,
    /// Batches rolled back and dropped.
    pub failed_flushes: usize,
}

/// A batch writer that accepts commands via a channel and writes them
/// in batched transactions on a dedicated thread.
pub struct BatchWriter {
    tx: Sender<BatchCommand>,
    handle: Option<JoinHandle<WriteStats>>,
}

impl BatchWriter {
    /// Spawn the writer thread. The `conn` is moved to it.
    pub fn new(conn: Connection) -> Result<Self, StorageError> {
        let (tx, rx) = bounded(CHANNEL_BOUND);

        let handle = thread::Builder::new()
            .name("jarvis-batch-writer".to_string())
            .spawn(move || writer_loop(conn, rx))
            .map_err(|e| StorageError::SqliteError {
                message: format!("failed to spawn batch writer thread: {e}"),
            })?;

        Ok(Self {
            tx,
            handle: Some(handle),
        })
    }

    /// Send a command to the batch writer.
    pub fn send(&self, cmd: BatchCommand) -> Result<(), StorageError> {
        self.tx.send(cmd).map_err(|_| StorageError::SqliteError {
            message: "batch writer channel disconnected".to_string(),
        })
    }

    /// Flush pending writes without waiting.
    pub fn flush(&self) -> Result<(), StorageError> {
        self.send(BatchCommand::Flush)
    }

    /// Flush pending writes and wait until they are committed or dropped.
    /// Errors if any batch failed since the previous sync.
    pub fn sync(&self) -> Result<(), StorageError> {
        let (ack_tx, ack_rx) = bounded(1);
        self.send(BatchCommand::Barrier(ack_tx))?;
        ack_rx.recv().map_err(|_| StorageError::SqliteError {
            message: "batch writer stopped before acknowledging".to_string(),
        })?
    }

    /// Shut down the writer thread and wait for completion.
    pub fn shutdown(mut self) -> Result<WriteStats, StorageError> {
        let _ = self.tx.send(BatchCommand::Shutdown);
        if let Some(handle) = self.handle.take() {
            handle.join().map_err(|_| StorageError::SqliteError {
                message: "batch writer thread panicked".to_string(),
            })
        } else {
            Ok(WriteStats::default())
        }
    }
}

impl Drop for BatchWriter {
    fn drop(&mut self) {
        let _ = self.tx.send(BatchCommand::Shutdown);
    }
}

fn writer_loop(conn: Connection, rx: Receiver<BatchCommand>) -> WriteStats {
    let mut buffer: Vec<BatchCommand> = Vec::with_capacity(BATCH_SIZE);
    let mut stats = WriteStats::default();
    let mut unreported: Option<StorageError> = None;

    loop {
        match rx.recv_timeout(FLUSH_TIMEOUT) {
            Ok(BatchCommand::Shutdown) => {
                flush_or_record(&conn, &mut buffer, &mut stats, &mut unreported);
                break;
            }
            Ok(BatchCommand::Flush) => {
                flush_or_record(&conn, &mut buffer, &mut stats, &mut unreported);
            }
            Ok(BatchCommand::Barrier(ack)) => {
                flush_or_record(&conn, &mut buffer, &mut stats, &mut unreported);
                let result = match unreported.take() {
                    Some(e) => Err(e),
                    None => Ok(()),
                };
                let _ = ack.send(result);
            }
            Ok(cmd) => {
                buffer.push(cmd);
                if buffer.len() >= BATCH_SIZE {
                    flush_or_record(&conn, &mut buffer, &mut stats, &mut unreported);
                }
            }
            Err(RecvTimeoutError::Timeout) => {
                if !buffer.is_empty() {
                    flush_or_record(&conn, &mut buffer, &mut stats, &mut unreported);
                }
            }
            Err(RecvTimeoutError::Disconnected) => {
                flush_or_record(&conn, &mut buffer, &mut stats, &mut unreported);
                break;
            }
        }
    }

    tracing::debug!(
        feature_vectors = stats.feature_vector_rows,
        detection_runs = stats.detection_run_rows,
        flushes = stats.flushes,
        failed_flushes = stats.failed_flushes,
        "batch writer stopped"
    );
    stats
}

/// Flush; on failure the batch is gone and the first error is kept for the
/// next barrier.
fn flush_or_record(
    conn: &Connection,
    buffer: &mut Vec<BatchCommand>,
    stats: &mut WriteStats,
    unreported: &mut Option<StorageError>,
) {
    if let Err(e) = flush_buffer(conn, buffer, stats) {
        buffer.clear();
        stats.failed_flushes += 1;
        tracing::error!(error = %e, "batch write failed; dropping batch");
        unreported.get_or_insert(e);
    }
}

fn flush_buffer(
    conn: &Connection,
    buffer: &mut Vec<BatchCommand>,
    stats: &mut WriteStats,
) -> Result<(), StorageError> {
    if buffer.is_empty() {
        return Ok(());
    }

    let tx = conn.unchecked_transaction().map_err(|e| StorageError::SqliteError {
        message: format!("begin transaction: {e}"),
    })?;

    // Counted only once the batch commits.
    let mut pending = WriteStats::default();
    for cmd in buffer.drain(..) {
        apply_command(&tx, &cmd, &mut pending)?;
    }

    tx.commit().map_err(|e| StorageError::SqliteError {
        message: format!("commit: {e}"),
    })?;
    stats.feature_vector_rows += pending.feature_vector_rows;
    stats.detection_run_rows += pending.detection_run_rows;
    stats.flushes += 1;

    Ok(())
}

/// Apply one data command on `conn`. Control commands are no-ops. Also used
/// directly when no writer thread is available.
pub fn apply_command(conn: &Connection, cmd: &BatchCommand, stats: &mut WriteStats) -> Result<(), StorageError> {
    match cmd {
        BatchCommand::UpsertFeatureVectors(rows) => {
            features::upsert_feature_vectors(conn, rows)?;
            stats.feature_vector_rows += rows.len();
        }
        BatchCommand::InsertDetectionRuns(rows) => {
            runs::insert_runs(conn, rows)?;
            stats.detection_run_rows += rows.len();
        }
        BatchCommand::Flush | BatchCommand::Barrier(_) | BatchCommand::Shutdown => {}
    }
    Ok(())
}
