//! Console report per target

use crate::session::{DataSource, ScrapeReport};
use crate::state::TargetState;

/// Formats a report as a short multi-line block for the terminal
pub fn format_report(report: &ScrapeReport) -> String {
    let mut out = String::new();
    let via = match report.source {
        DataSource::Page => "page",
        DataSource::PublicEndpoint => "public endpoint",
    };
    out.push_str(&format!("{} [{}] via {}\n", report.target, report.state, via));

    if let Some(error) = &report.error {
        out.push_str(&format!("  error: {}\n", error));
    }
    if report.state.is_error() {
        return out;
    }

    let counters = &report.counters;
    out.push_str(&format!(
        "  followers {}, following {}, posts {}, likes {}\n",
        counters.followers, counters.following, counters.posts, counters.likes
    ));

    out.push_str(&format!(
        "  items {} ({} partial)",
        report.records.len(),
        report.partial_records()
    ));
    match &report.pagination {
        Some(p) if p.converged => out.push_str(&format!(", converged after {} scrolls\n", p.attempts)),
        Some(p) => out.push_str(&format!(", stopped after {} scrolls without converging\n", p.attempts)),
        None => out.push('\n'),
    }

    if let Some(summary) = &report.summary {
        out.push_str(&format!(
            "  engagement {:.2}% ({}), consistency {:.2}\n",
            summary.headline_rate(),
            summary.rating,
            summary.dispersion
        ));
        if summary.reach_ratio > 0.0 {
            out.push_str(&format!("  reach {:.2}% of followers per item\n", summary.reach_ratio));
        }
        for (field, average) in &summary.averages_by_field {
            out.push_str(&format!("  avg {}: {:.2}\n", field, average));
        }
    }

    if report.state == TargetState::Partial {
        out.push_str("  note: some values are missing or pagination did not finish\n");
    }
    out
}

/// Prints a report to stdout
pub fn print_report(report: &ScrapeReport) {
    print!("{}", format_report(report));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::{ExtractionRecord, FieldValue};
    use crate::metrics::{summarize, MetricsConfig, ProfileCounters};
    use crate::paginate::{PaginationOutcome, PaginationPhase};
    use crate::platform::{Platform, TargetKind};
    use std::collections::BTreeMap;

    fn base() -> ScrapeReport {
        ScrapeReport::new(
            "instagram:@someone".to_string(),
            Platform::Instagram,
            TargetKind::Profile,
            "https://www.instagram.com/someone/".to_string(),
        )
    }

    #[test]
    fn test_format_completed_report() {
        let mut fields = BTreeMap::new();
        fields.insert("likes".to_string(), FieldValue::Count(400));
        fields.insert("comments".to_string(), FieldValue::Count(20));
        let records = vec![ExtractionRecord {
            index: 1,
            partial: false,
            fields,
        }];
        let counters = ProfileCounters::with_followers(10_000);

        let mut report = base();
        report.state = TargetState::Completed;
        report.summary = Some(summarize(&records, &counters, &MetricsConfig::default()));
        report.counters = counters;
        report.records = records;
        report.pagination = Some(PaginationOutcome {
            converged: true,
            attempts: 3,
            phase: PaginationPhase::Converged,
            last_signature: Some(1),
        });

        let text = format_report(&report);
        assert!(text.starts_with("instagram:@someone [completed] via page"));
        assert!(text.contains("followers 10000"));
        assert!(text.contains("items 1 (0 partial), converged after 3 scrolls"));
        assert!(text.contains("engagement 4.20% (excellent)"));
        assert!(text.contains("avg likes: 400.00"));
    }

    #[test]
    fn test_format_failed_report() {
        let report = base().fail(TargetState::Blocked, "Log in to see");
        let text = format_report(&report);
        assert!(text.contains("[blocked]"));
        assert!(text.contains("error: Log in to see"));
        assert!(!text.contains("followers"));
    }
}
