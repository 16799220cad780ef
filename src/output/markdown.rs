//! Markdown summary generation
//!
//! This module generates a human-readable markdown summary of a run: run
//! metadata, an engagement ranking of the successful targets, and the
//! targets that failed.

use super::{BatchSummary, OutputError, OutputResult};
use crate::session::DataSource;
use crate::state::TargetState;
use std::fs;
use std::path::Path;

/// Writes the markdown summary of a run
///
/// # Arguments
///
/// * `summary` - The run summary
/// * `output_path` - Path where the markdown file should be written
///
/// # Returns
///
/// * `Ok(())` - Successfully wrote markdown summary
/// * `Err(OutputError)` - Failed to write summary
pub fn generate_markdown_summary(summary: &BatchSummary, output_path: &Path) -> OutputResult<()> {
    let markdown = format_markdown_summary(summary);
    fs::write(output_path, markdown).map_err(|source| OutputError::Write {
        path: output_path.to_path_buf(),
        source,
    })
}

/// Formats a run summary as markdown
pub fn format_markdown_summary(summary: &BatchSummary) -> String {
    let mut md = String::new();

    md.push_str("# Tidemark Engagement Summary\n\n");

    // Run metadata
    md.push_str("## Run Information\n\n");
    md.push_str(&format!("- **Run ID**: {}\n", summary.run_id));
    md.push_str(&format!("- **Started**: {}\n", summary.started_at));
    if let Some(finished) = &summary.finished_at {
        md.push_str(&format!("- **Finished**: {}\n", finished));
    }
    md.push_str(&format!("- **Status**: {}\n", summary.status));
    md.push_str(&format!("- **Config Hash**: {}\n\n", summary.config_hash));

    md.push_str("## Overview\n\n");
    md.push_str(&format!("- **Targets**: {}\n", summary.reports.len()));
    md.push_str(&format!(
        "- **Succeeded**: {} ({:.2}%)\n",
        summary.succeeded(),
        summary.success_rate()
    ));
    md.push_str(&format!("- **Partial**: {}\n", summary.count(TargetState::Partial)));
    md.push_str(&format!("- **Blocked**: {}\n\n", summary.count(TargetState::Blocked)));

    let ranked = summary.ranked();
    if !ranked.is_empty() {
        md.push_str("## Engagement Ranking\n\n");
        md.push_str("| # | Target | Followers | Items | Rate (%) | Consistency | Rating | Source |\n");
        md.push_str("|---|--------|-----------|-------|----------|-------------|--------|--------|\n");

        for (position, report) in ranked.iter().enumerate() {
            let (dispersion, rating) = match &report.summary {
                Some(s) => (format!("{:.2}", s.dispersion), s.rating.to_string()),
                None => ("-".to_string(), "-".to_string()),
            };
            let source = match report.source {
                DataSource::Page => "page",
                DataSource::PublicEndpoint => "endpoint",
            };
            md.push_str(&format!(
                "| {} | {} | {} | {} | {:.2} | {} | {} | {} |\n",
                position + 1,
                report.target,
                report.counters.followers,
                report.records.len(),
                report.headline_rate(),
                dispersion,
                rating,
                source
            ));
        }
        md.push('\n');

        md.push_str("## Averages per Target\n\n");
        for report in &ranked {
            let Some(s) = &report.summary else { continue };
            if s.averages_by_field.is_empty() {
                continue;
            }
            let averages: Vec<String> = s
                .averages_by_field
                .iter()
                .map(|(field, value)| format!("{} {:.2}", field, value))
                .collect();
            md.push_str(&format!("- **{}**: {}\n", report.target, averages.join(", ")));
        }
        md.push('\n');
    }

    let failures: Vec<_> = summary.reports.iter().filter(|r| r.state.is_error()).collect();
    if !failures.is_empty() {
        md.push_str("## Failed Targets\n\n");
        md.push_str("| Target | State | Error |\n");
        md.push_str("|--------|-------|-------|\n");
        for report in failures {
            md.push_str(&format!(
                "| {} | {} | {} |\n",
                report.target,
                report.state,
                report.error.as_deref().unwrap_or("")
            ));
        }
        md.push('\n');
    }

    md
}
