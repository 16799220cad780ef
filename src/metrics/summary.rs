use super::{round_half_up, Deviation, MetricsConfig, ProfileCounters};
use crate::extract::ExtractionRecord;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Qualitative band of a per-item engagement rate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rating {
    Excellent,
    Good,
    Average,
    Low,
}

impl Rating {
    pub fn from_rate(rate: f64) -> Self {
        if rate >= 3.0 {
            Self::Excellent
        } else if rate >= 1.0 {
            Self::Good
        } else if rate >= 0.5 {
            Self::Average
        } else {
            Self::Low
        }
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Excellent => "excellent",
            Self::Good => "good",
            Self::Average => "average",
            Self::Low => "low",
        };
        write!(f, "{}", label)
    }
}

/// Aggregated engagement statistics for one target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngagementSummary {
    pub sample_size: usize,
    pub totals_by_field: BTreeMap<String, u64>,
    pub averages_by_field: BTreeMap<String, f64>,
    /// Summed engagement totals per 100 followers
    pub rate: f64,
    /// Consistency score, 100 means every item performed the same
    pub dispersion: f64,
    pub max_by_field: BTreeMap<String, u64>,
    pub min_by_field: BTreeMap<String, u64>,
    /// Mean of the per-item engagement rates
    pub average_item_rate: f64,
    /// Average reach per 100 followers
    pub reach_ratio: f64,
    /// Account-wide likes per 100 followers
    pub profile_like_rate: f64,
    pub rating: Rating,
}

impl EngagementSummary {
    /// Rate used for ranking: the per-item rate, or the account-wide like
    /// rate when no per-item engagement was measured
    pub fn headline_rate(&self) -> f64 {
        headline(self.average_item_rate, self.profile_like_rate)
    }
}

fn headline(average_item_rate: f64, profile_like_rate: f64) -> f64 {
    if average_item_rate > 0.0 {
        average_item_rate
    } else {
        profile_like_rate
    }
}

/// Summarizes records against profile counters
///
/// Every count field present in the records is totalled and averaged; the
/// average over no records is 0. Rates are 0 when the follower count is 0.
///
/// # Arguments
///
/// * `records` - Extracted items, partial ones included
/// * `profile` - Counters of the account the items belong to
/// * `config` - Engagement, dispersion and rounding settings
pub fn summarize(
    records: &[ExtractionRecord],
    profile: &ProfileCounters,
    config: &MetricsConfig,
) -> EngagementSummary {
    let decimals = config.decimals;
    let sample_size = records.len();

    let mut totals_by_field: BTreeMap<String, u64> = BTreeMap::new();
    let mut max_by_field: BTreeMap<String, u64> = BTreeMap::new();
    let mut min_by_field: BTreeMap<String, u64> = BTreeMap::new();

    for record in records {
        for (name, value) in &record.fields {
            if let Some(count) = value.as_count() {
                let total = totals_by_field.entry(name.clone()).or_insert(0);
                *total = total.saturating_add(count);
                let max = max_by_field.entry(name.clone()).or_insert(count);
                *max = (*max).max(count);
                let min = min_by_field.entry(name.clone()).or_insert(count);
                *min = (*min).min(count);
            }
        }
    }

    let averages_by_field = totals_by_field
        .iter()
        .map(|(name, total)| (name.clone(), round_half_up(mean(*total as f64, sample_size), decimals)))
        .collect();

    let engagement_total: u64 = config
        .engagement_fields
        .iter()
        .filter_map(|field| totals_by_field.get(field))
        .fold(0u64, |acc, total| acc.saturating_add(*total));

    let followers = profile.followers;
    let unrounded_item_rate = if followers == 0 || sample_size == 0 {
        0.0
    } else {
        let sum: f64 = records
            .iter()
            .map(|record| per_hundred(engagement_of(record, config) as f64, followers))
            .sum();
        sum / sample_size as f64
    };

    let average_item_rate = round_half_up(unrounded_item_rate, decimals);
    let profile_like_rate = round_half_up(per_hundred(profile.likes as f64, followers), decimals);

    let reach_ratio = match &config.reach_field {
        Some(field) => {
            let total = totals_by_field.get(field).copied().unwrap_or(0) as f64;
            per_hundred(mean(total, sample_size), followers)
        }
        None => 0.0,
    };

    EngagementSummary {
        sample_size,
        rate: round_half_up(per_hundred(engagement_total as f64, followers), decimals),
        dispersion: dispersion(records, config),
        average_item_rate,
        reach_ratio: round_half_up(reach_ratio, decimals),
        profile_like_rate,
        rating: Rating::from_rate(headline(average_item_rate, profile_like_rate)),
        totals_by_field,
        averages_by_field,
        max_by_field,
        min_by_field,
    }
}

fn mean(total: f64, count: usize) -> f64 {
    if count == 0 {
        0.0
    } else {
        total / count as f64
    }
}

/// `value * 100 / followers`, 0 without followers
fn per_hundred(value: f64, followers: u64) -> f64 {
    if followers == 0 {
        0.0
    } else {
        value * 100.0 / followers as f64
    }
}

fn engagement_of(record: &ExtractionRecord, config: &MetricsConfig) -> u64 {
    config
        .engagement_fields
        .iter()
        .fold(0u64, |acc, field| acc.saturating_add(record.count(field)))
}

/// `100 - min(cv, 100)` where cv is the coefficient of variation in percent
fn dispersion(records: &[ExtractionRecord], config: &MetricsConfig) -> f64 {
    let field = match &config.dispersion_field {
        Some(field) => field,
        None => return 0.0,
    };
    if records.len() < 2 {
        return 0.0;
    }

    let values: Vec<f64> = records.iter().map(|record| record.count(field) as f64).collect();
    let n = values.len() as f64;
    let avg = values.iter().sum::<f64>() / n;
    if avg == 0.0 {
        return 0.0;
    }

    let squares: f64 = values.iter().map(|value| (value - avg).powi(2)).sum();
    let divisor = match config.deviation {
        Deviation::Sample => n - 1.0,
        Deviation::Population => n,
    };
    let sigma = (squares / divisor).sqrt();
    let variation = (sigma / avg * 100.0).min(100.0);

    round_half_up(100.0 - variation, config.decimals)
}
