use crate::extract::ExtractionRecord;
use crate::metrics::{EngagementSummary, ProfileCounters};
use crate::paginate::PaginationOutcome;
use crate::platform::{Platform, TargetKind};
use crate::state::TargetState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Where a report's numbers came from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DataSource {
    /// Read from the rendered page
    #[default]
    Page,
    /// Read from the public JSON endpoint after the page gave nothing usable
    PublicEndpoint,
}

impl DataSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Page => "page",
            Self::PublicEndpoint => "public_endpoint",
        }
    }
}

/// Everything produced for one target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrapeReport {
    pub target: String,
    pub platform: Platform,
    pub kind: TargetKind,
    pub url: String,
    pub state: TargetState,
    /// Header record (profile counters or post counters)
    pub profile: Option<ExtractionRecord>,
    pub counters: ProfileCounters,
    pub records: Vec<ExtractionRecord>,
    pub summary: Option<EngagementSummary>,
    pub pagination: Option<PaginationOutcome>,
    #[serde(default)]
    pub source: DataSource,
    pub scraped_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ScrapeReport {
    /// Creates an empty report in the `Pending` state
    pub fn new(target: String, platform: Platform, kind: TargetKind, url: String) -> Self {
        Self {
            target,
            platform,
            kind,
            url,
            state: TargetState::Pending,
            profile: None,
            counters: ProfileCounters::default(),
            records: Vec::new(),
            summary: None,
            pagination: None,
            source: DataSource::Page,
            scraped_at: Utc::now(),
            error: None,
        }
    }

    /// Marks the report as finished with an error state
    pub fn fail(mut self, state: TargetState, error: impl ToString) -> Self {
        self.state = state;
        self.error = Some(error.to_string());
        self.scraped_at = Utc::now();
        self
    }

    /// Number of records that are partial
    pub fn partial_records(&self) -> usize {
        self.records.iter().filter(|record| record.partial).count()
    }

    /// Engagement rate used for ranking, 0 without a summary
    pub fn headline_rate(&self) -> f64 {
        self.summary
            .as_ref()
            .map(EngagementSummary::headline_rate)
            .unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::FieldValue;
    use crate::metrics::{summarize, MetricsConfig};
    use crate::paginate::PaginationPhase;
    use std::collections::BTreeMap;

    fn sample() -> ScrapeReport {
        let mut fields = BTreeMap::new();
        fields.insert("likes".to_string(), FieldValue::Count(150));
        fields.insert("comments".to_string(), FieldValue::Count(0));
        fields.insert("link".to_string(), FieldValue::Text("/p/A/".to_string()));
        let records = vec![ExtractionRecord {
            index: 1,
            partial: false,
            fields,
        }];
        let counters = ProfileCounters::with_followers(10_000);
        let summary = summarize(&records, &counters, &MetricsConfig::default());

        let mut report = ScrapeReport::new(
            "instagram:@someone".to_string(),
            Platform::Instagram,
            TargetKind::Profile,
            "https://www.instagram.com/someone/".to_string(),
        );
        report.state = TargetState::Completed;
        report.counters = counters;
        report.records = records;
        report.summary = Some(summary);
        report.pagination = Some(PaginationOutcome {
            converged: true,
            attempts: 2,
            phase: PaginationPhase::Converged,
            last_signature: Some(1),
        });
        report
    }

    #[test]
    fn test_report_round_trip() {
        let report = sample();
        let json = serde_json::to_string_pretty(&report).unwrap();
        assert!(json.contains("\"scrapedAt\""));
        assert!(json.contains("\"sampleSize\": 1"));
        assert!(!json.contains("\"error\""));

        let back: ScrapeReport = serde_json::from_str(&json).unwrap();
        assert_eq!(back, report);
        assert_eq!(back.headline_rate(), 1.5);
    }

    #[test]
    fn test_fail_sets_state_and_error() {
        let report = sample().fail(TargetState::Blocked, "login wall");
        assert_eq!(report.state, TargetState::Blocked);
        assert_eq!(report.error.as_deref(), Some("login wall"));
        assert_eq!(report.partial_records(), 0);
    }
}
