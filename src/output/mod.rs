//! Output module for batch summaries and reports
//!
//! This module handles:
//! - Per-target JSON report files
//! - The markdown summary of a run
//! - Console reports and cross-run statistics

mod console;
pub mod json;
mod markdown;
pub mod stats;

pub use console::{format_report, print_report};
pub use json::{read_report, write_report, write_reports};
pub use markdown::{format_markdown_summary, generate_markdown_summary};
pub use stats::{format_statistics, load_statistics, print_statistics};

use crate::session::ScrapeReport;
use crate::state::TargetState;
use crate::storage::{Storage, StorageError};
use crate::ScrapeError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Everything the markdown summary shows about one run
#[derive(Debug, Clone)]
pub struct BatchSummary {
    pub run_id: i64,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub status: String,
    pub config_hash: String,
    pub reports: Vec<ScrapeReport>,
}

impl BatchSummary {
    /// Number of targets in a state
    pub fn count(&self, state: TargetState) -> usize {
        self.reports.iter().filter(|r| r.state == state).count()
    }

    /// Number of targets that produced usable data
    pub fn succeeded(&self) -> usize {
        self.reports.iter().filter(|r| r.state.is_success()).count()
    }

    /// Percentage of targets that produced usable data
    pub fn success_rate(&self) -> f64 {
        if self.reports.is_empty() {
            0.0
        } else {
            self.succeeded() as f64 / self.reports.len() as f64 * 100.0
        }
    }

    /// Successful reports ordered by engagement rate, best first
    pub fn ranked(&self) -> Vec<&ScrapeReport> {
        let mut ranked: Vec<&ScrapeReport> =
            self.reports.iter().filter(|r| r.state.is_success()).collect();
        ranked.sort_by(|a, b| b.headline_rate().total_cmp(&a.headline_rate()));
        ranked
    }
}

/// Builds the summary of a run from storage
///
/// # Arguments
///
/// * `storage` - The storage backend containing the run
/// * `run_id` - Run to summarize, or the latest run when None
///
/// # Returns
///
/// * `Ok(BatchSummary)` - Successfully generated summary
/// * `Err(ScrapeError)` - No run found or the reports could not be read
pub fn generate_summary(storage: &dyn Storage, run_id: Option<i64>) -> Result<BatchSummary, ScrapeError> {
    let run = match run_id {
        Some(id) => storage.get_run(id)?,
        None => storage.get_latest_run()?.ok_or(StorageError::RunNotFound(0))?,
    };
    let reports = storage.load_reports(run.id)?;

    Ok(BatchSummary {
        run_id: run.id,
        started_at: run.started_at,
        finished_at: run.finished_at,
        status: run.status.to_db_string().to_string(),
        config_hash: run.config_hash,
        reports,
    })
}
