//! Storage traits and error types

use crate::session::ScrapeReport;
use crate::state::TargetState;
use crate::storage::{RunRecord, RunStatus, TargetAverage};
use std::collections::HashMap;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("Invalid stored value in column {column}: {value}")]
    InvalidValue { column: String, value: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
pub trait Storage {
    // ===== Run Management =====

    /// Creates a new run
    ///
    /// # Arguments
    ///
    /// * `config_hash` - Hash of the configuration file
    ///
    /// # Returns
    ///
    /// The ID of the newly created run
    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64>;

    /// Gets a run by ID
    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord>;

    /// Gets the most recent run
    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>>;

    /// Sets the final status and finish timestamp of a run
    fn finish_run(&mut self, run_id: i64, status: RunStatus) -> StorageResult<()>;

    // ===== Reports =====

    /// Stores a target outcome with its full report
    ///
    /// # Returns
    ///
    /// The ID of the target row
    fn save_report(&mut self, run_id: i64, report: &ScrapeReport) -> StorageResult<i64>;

    /// Loads every report of a run in insertion order
    fn load_reports(&self, run_id: i64) -> StorageResult<Vec<ScrapeReport>>;

    // ===== Statistics =====

    /// Counts the targets of a run by state
    fn count_by_state(&self, run_id: i64) -> StorageResult<HashMap<TargetState, u64>>;

    /// Per-target averages over every successful run, best rate first
    fn target_averages(&self) -> StorageResult<Vec<TargetAverage>>;
}
