//! Storage module for persisting batch results
//!
//! This module handles all database operations, including:
//! - SQLite database initialization and schema management
//! - Run tracking (started, completed, aborted)
//! - Per-target outcomes and their full JSON reports
//! - Aggregate queries across runs

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{Storage, StorageError, StorageResult};

/// One batch run as stored
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub config_hash: String,
    pub status: RunStatus,
}

/// Status of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Completed,
    /// Stopped by an authentication failure
    Aborted,
    Failed,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Aborted => "aborted",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "aborted" => Some(Self::Aborted),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// Averages for one target label across runs
#[derive(Debug, Clone, PartialEq)]
pub struct TargetAverage {
    pub label: String,
    pub platform: String,
    /// Successful runs included in the averages
    pub runs: u64,
    pub average_rate: f64,
    pub average_followers: f64,
    pub average_records: f64,
    pub last_scraped_at: String,
}
