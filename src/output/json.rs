//! Per-target JSON report files

use super::{OutputError, OutputResult};
use crate::session::ScrapeReport;
use std::fs;
use std::path::{Path, PathBuf};

/// File name for a target label, e.g. `instagram_someone.json`
pub fn report_file_name(label: &str) -> String {
    let mut name = String::with_capacity(label.len());
    for c in label.chars() {
        if c.is_ascii_alphanumeric() || c == '.' || c == '-' {
            name.push(c);
        } else if !name.ends_with('_') {
            name.push('_');
        }
    }
    let name = name.trim_matches('_');
    if name.is_empty() {
        "report.json".to_string()
    } else {
        format!("{}.json", name)
    }
}

/// Writes a report as pretty JSON into `dir`, creating it if needed
///
/// # Returns
///
/// The path of the written file
pub fn write_report(dir: &Path, report: &ScrapeReport) -> OutputResult<PathBuf> {
    fs::create_dir_all(dir).map_err(|source| OutputError::Write {
        path: dir.to_path_buf(),
        source,
    })?;

    let path = dir.join(report_file_name(&report.target));
    let body = serde_json::to_string_pretty(report)?;
    fs::write(&path, body).map_err(|source| OutputError::Write {
        path: path.clone(),
        source,
    })?;

    tracing::debug!("Wrote report {}", path.display());
    Ok(path)
}

/// Writes every report into `dir`
pub fn write_reports(dir: &Path, reports: &[ScrapeReport]) -> OutputResult<Vec<PathBuf>> {
    reports.iter().map(|report| write_report(dir, report)).collect()
}

/// Reads a report written by [`write_report`]
pub fn read_report(path: &Path) -> OutputResult<ScrapeReport> {
    let body = fs::read_to_string(path).map_err(|source| OutputError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(serde_json::from_str(&body)?)
}
