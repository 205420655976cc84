//! JarvisRuntime: singleton via `OnceLock`, lock-free after initialization.
//!
//! The runtime owns the configuration, the database manager, the batch
//! writer for derived data, the detection pipeline, the worker pool and the
//! job registry. Tests build their own instance with [`JarvisRuntime::new`]
//! instead of going through the global.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

use jarvis_analysis::PatternPipeline;
use jarvis_core::errors::error_code::{self, JarvisErrorCode};
use jarvis_core::{ConfigError, JarvisConfig, StorageError};
use jarvis_storage::batch::{apply_command, BatchCommand, WriteStats};
use jarvis_storage::{BatchWriter, DatabaseManager};
use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::jobs::JobRegistry;

static RUNTIME: OnceLock<Arc<JarvisRuntime>> = OnceLock::new();

#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("failed to build detection worker pool: {message}")]
    WorkerPool { message: String },

    #[error("JarvisRuntime already initialized")]
    AlreadyInitialized,

    #[error("JarvisRuntime not initialized")]
    NotInitialized,
}

impl JarvisErrorCode for RuntimeError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Config(e) => e.error_code(),
            Self::Storage(e) => e.error_code(),
            Self::WorkerPool { .. } => error_code::INIT_ERROR,
            Self::AlreadyInitialized => error_code::ALREADY_INITIALIZED,
            Self::NotInitialized => error_code::RUNTIME_NOT_INITIALIZED,
        }
    }
}

/// Options for building the runtime.
#[derive(Debug, Default)]
pub struct RuntimeOptions {
    /// Ready-made configuration. When `None`, it is loaded from
    /// `config_path` (or `$JARVIS_CONFIG`) with environment overrides.
    pub config: Option<JarvisConfig>,
    pub config_path: Option<PathBuf>,
    /// Overrides `storage.db_path`.
    pub db_path: Option<PathBuf>,
    /// Use a private in-memory database (no batch writer thread).
    pub in_memory: bool,
}

pub struct JarvisRuntime {
    pub config: JarvisConfig,
    pub db: DatabaseManager,
    pub pipeline: PatternPipeline,
    pub jobs: JobRegistry,
    pool: ThreadPool,
    /// `None` for in-memory databases and after shutdown; derived writes
    /// then go straight through the writer connection.
    batch: Mutex<Option<BatchWriter>>,
}

impl JarvisRuntime {
    pub fn new(opts: RuntimeOptions) -> Result<Self, RuntimeError> {
        let mut config = match opts.config {
            Some(config) => config,
            None => JarvisConfig::load(opts.config_path.as_deref())?,
        };
        if let Some(path) = opts.db_path {
            config.storage.db_path = path;
        }
        config.validate()?;

        let db = if opts.in_memory {
            DatabaseManager::open_in_memory()?
        } else {
            DatabaseManager::open(&config.storage.db_path, config.storage.read_pool_size)?
        };

        let batch = match db.open_batch_connection()? {
            Some(conn) => Some(BatchWriter::new(conn)?),
            None => None,
        };

        let pool = ThreadPoolBuilder::new()
            .num_threads(config.scheduler.worker_threads)
            .thread_name(|i| format!("jarvis-detect-{i}"))
            .build()
            .map_err(|e| RuntimeError::WorkerPool { message: e.to_string() })?;

        tracing::info!(
            db = %db.path().map_or_else(|| ":memory:".to_string(), |p| p.display().to_string()),
            workers = pool.current_num_threads(),
            batch_writer = batch.is_some(),
            "jarvis runtime ready"
        );

        Ok(Self {
            pipeline: PatternPipeline::new(&config),
            config,
            db,
            jobs: JobRegistry::new(),
            pool,
            batch: Mutex::new(batch),
        })
    }

    /// In-memory runtime with the given configuration.
    pub fn in_memory(config: JarvisConfig) -> Result<Self, RuntimeError> {
        Self::new(RuntimeOptions {
            config: Some(config),
            in_memory: true,
            ..RuntimeOptions::default()
        })
    }

    /// Worker pool for cross-user detection.
    pub fn pool(&self) -> &ThreadPool {
        &self.pool
    }

    /// Queue a feature-cache or run-audit write.
    pub fn write_derived(&self, cmd: BatchCommand) -> Result<(), StorageError> {
        {
            let batch = self.batch();
            if let Some(writer) = batch.as_ref() {
                return writer.send(cmd);
            }
        }
        self.db
            .with_writer(|conn| apply_command(conn, &cmd, &mut WriteStats::default()))
    }

    /// Wait until every queued derived write is committed.
    pub fn sync_derived(&self) -> Result<(), StorageError> {
        match self.batch().as_ref() {
            Some(writer) => writer.sync(),
            None => Ok(()),
        }
    }

    /// [`sync_derived`](Self::sync_derived) for callers whose own write is
    /// already committed or not yet started. Queued writes are applied or
    /// dropped either way, so a dropped cache or audit batch is only logged.
    pub fn settle_derived(&self) {
        if let Err(e) = self.sync_derived() {
            tracing::warn!(error = %e, "derived write batch was dropped");
        }
    }

    /// Stop the batch writer thread, committing what it holds. Later
    /// derived writes go through the writer connection.
    pub fn shutdown(&self) -> Result<(), StorageError> {
        let writer = self.batch().take();
        if let Some(writer) = writer {
            let stats = writer.shutdown()?;
            tracing::info!(
                feature_vectors = stats.feature_vector_rows,
                detection_runs = stats.detection_run_rows,
                flushes = stats.flushes,
                "batch writer drained"
            );
        }
        Ok(())
    }

    fn batch(&self) -> MutexGuard<'_, Option<BatchWriter>> {
        self.batch.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Initialize the global runtime. Fails if it already exists.
pub fn initialize(opts: RuntimeOptions) -> Result<Arc<JarvisRuntime>, RuntimeError> {
    let runtime = Arc::new(JarvisRuntime::new(opts)?);
    RUNTIME
        .set(Arc::clone(&runtime))
        .map_err(|_| RuntimeError::AlreadyInitialized)?;
    Ok(runtime)
}

/// The global runtime. Lock-free after init.
pub fn get() -> Result<Arc<JarvisRuntime>, RuntimeError> {
    RUNTIME.get().cloned().ok_or(RuntimeError::NotInitialized)
}

pub fn is_initialized() -> bool {
    RUNTIME.get().is_some()
}
