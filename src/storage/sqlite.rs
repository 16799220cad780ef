//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.

use crate::session::ScrapeReport;
use crate::state::TargetState;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::{RunRecord, RunStatus, TargetAverage};
use crate::ScrapeError;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::HashMap;
use std::path::Path;

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(ScrapeError)` - Failed to open database
    pub fn new(path: &Path) -> Result<Self, ScrapeError> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> Result<Self, ScrapeError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }
}

fn run_from_row(row: &Row<'_>) -> rusqlite::Result<RunRecord> {
    Ok(RunRecord {
        id: row.get(0)?,
        started_at: row.get(1)?,
        finished_at: row.get(2)?,
        config_hash: row.get(3)?,
        status: RunStatus::from_db_string(&row.get::<_, String>(4)?).unwrap_or(RunStatus::Running),
    })
}

impl Storage for SqliteStorage {
    // ===== Run Management =====

    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO runs (started_at, config_hash, status) VALUES (?1, ?2, ?3)",
            params![now, config_hash, RunStatus::Running.to_db_string()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord> {
        self.conn
            .query_row(
                "SELECT id, started_at, finished_at, config_hash, status FROM runs WHERE id = ?1",
                params![run_id],
                run_from_row,
            )
            .optional()?
            .ok_or(StorageError::RunNotFound(run_id))
    }

    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>> {
        let run = self
            .conn
            .query_row(
                "SELECT id, started_at, finished_at, config_hash, status FROM runs ORDER BY id DESC LIMIT 1",
                [],
                run_from_row,
            )
            .optional()?;
        Ok(run)
    }

    fn finish_run(&mut self, run_id: i64, status: RunStatus) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let updated = self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2 WHERE id = ?3",
            params![status.to_db_string(), now, run_id],
        )?;
        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    // ===== Reports =====

    fn save_report(&mut self, run_id: i64, report: &ScrapeReport) -> StorageResult<i64> {
        let body = serde_json::to_string(report)?;
        let tx = self.conn.transaction()?;

        tx.execute(
            "INSERT INTO targets (run_id, label, platform, kind, url, state, source, followers,
             record_count, partial_count, headline_rate, error_message, scraped_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            params![
                run_id,
                report.target,
                report.platform.as_str(),
                report.kind.to_string(),
                report.url,
                report.state.to_db_string(),
                report.source.as_str(),
                report.counters.followers as i64,
                report.records.len() as i64,
                report.partial_records() as i64,
                report.headline_rate(),
                report.error,
                report.scraped_at.to_rfc3339(),
            ],
        )?;
        let target_id = tx.last_insert_rowid();

        tx.execute(
            "INSERT INTO reports (target_id, body) VALUES (?1, ?2)",
            params![target_id, body],
        )?;
        tx.commit()?;

        tracing::debug!("Stored report for {} as target {}", report.target, target_id);
        Ok(target_id)
    }

    fn load_reports(&self, run_id: i64) -> StorageResult<Vec<ScrapeReport>> {
        let mut stmt = self.conn.prepare(
            "SELECT r.body FROM reports r JOIN targets t ON t.id = r.target_id
             WHERE t.run_id = ?1 ORDER BY t.id",
        )?;

        let bodies = stmt
            .query_map(params![run_id], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;

        bodies
            .iter()
            .map(|body| serde_json::from_str(body).map_err(StorageError::from))
            .collect()
    }

    // ===== Statistics =====

    fn count_by_state(&self, run_id: i64) -> StorageResult<HashMap<TargetState, u64>> {
        let mut stmt = self
            .conn
            .prepare("SELECT state, COUNT(*) FROM targets WHERE run_id = ?1 GROUP BY state")?;

        let rows = stmt
            .query_map(params![run_id], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut counts = HashMap::new();
        for (state, count) in rows {
            let state = TargetState::from_db_string(&state).ok_or_else(|| StorageError::InvalidValue {
                column: "state".to_string(),
                value: state.clone(),
            })?;
            counts.insert(state, count as u64);
        }
        Ok(counts)
    }

    fn target_averages(&self) -> StorageResult<Vec<TargetAverage>> {
        let mut stmt = self.conn.prepare(
            "SELECT label, platform, COUNT(*), AVG(headline_rate), AVG(followers),
             AVG(record_count), MAX(scraped_at)
             FROM targets
             WHERE state IN ('completed', 'partial')
             GROUP BY label, platform
             ORDER BY AVG(headline_rate) DESC, label ASC",
        )?;

        let averages = stmt
            .query_map([], |row| {
                Ok(TargetAverage {
                    label: row.get(0)?,
                    platform: row.get(1)?,
                    runs: row.get::<_, i64>(2)? as u64,
                    average_rate: row.get(3)?,
                    average_followers: row.get(4)?,
                    average_records: row.get(5)?,
                    last_scraped_at: row.get(6)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(averages)
    }
}
