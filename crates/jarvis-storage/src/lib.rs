//! # jarvis-storage
//!
//! SQLite persistence layer for the JARVIS insight engine.
//! WAL mode, write-serialized + read-pooled, batch writer for derived
//! data, schema migrations via `PRAGMA user_version`.

pub mod batch;
pub mod connection;
pub mod migrations;
pub mod queries;

pub use batch::BatchWriter;
pub use connection::DatabaseManager;
