//! Engagement metrics
//!
//! Reduces extraction records and profile counters into an
//! [`EngagementSummary`]. Every rounded number goes through
//! [`round_half_up`].

mod summary;

pub use summary::{summarize, EngagementSummary, Rating};

use crate::extract::ExtractionRecord;
use serde::{Deserialize, Serialize};

/// Which standard deviation the dispersion score uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Deviation {
    #[default]
    Sample,
    Population,
}

/// What to aggregate and how to round it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct MetricsConfig {
    /// Fields summed into the engagement rate
    pub engagement_fields: Vec<String>,
    /// Field whose spread gives the consistency score
    pub dispersion_field: Option<String>,
    /// Field used for the reach ratio (views per follower)
    pub reach_field: Option<String>,
    pub decimals: u32,
    pub deviation: Deviation,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            engagement_fields: vec!["likes".to_string(), "comments".to_string()],
            dispersion_field: Some("likes".to_string()),
            reach_field: None,
            decimals: 2,
            deviation: Deviation::Sample,
        }
    }
}

/// Account-level counters read from a profile header
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileCounters {
    pub followers: u64,
    pub following: u64,
    pub posts: u64,
    /// Account-wide like total where the platform shows one
    pub likes: u64,
}

impl ProfileCounters {
    pub fn with_followers(followers: u64) -> Self {
        Self {
            followers,
            ..Self::default()
        }
    }

    /// Reads the counters from a profile record, missing fields are 0
    pub fn from_record(record: &ExtractionRecord) -> Self {
        Self {
            followers: record.count("followers"),
            following: record.count("following"),
            posts: record.count("posts"),
            likes: record.count("likes"),
        }
    }

    /// True if nothing useful was read
    pub fn is_empty(&self) -> bool {
        self.followers == 0 && self.following == 0 && self.posts == 0 && self.likes == 0
    }
}

/// Rounds half away from zero to `decimals` places
///
/// The scaled value is nudged by a few ULPs first so that decimal inputs like
/// `1.005`, stored slightly below their written value, still round up.
pub fn round_half_up(value: f64, decimals: u32) -> f64 {
    if !value.is_finite() {
        return 0.0;
    }
    let factor = 10f64.powi(decimals as i32);
    let scaled = value * factor;
    let nudged = scaled.abs() + scaled.abs() * 4.0 * f64::EPSILON;
    let rounded = (nudged + 0.5).floor() / factor;
    if scaled < 0.0 {
        -rounded
    } else {
        rounded
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::FieldValue;
    use std::collections::BTreeMap;

    #[test]
    fn test_round_half_up() {
        assert_eq!(round_half_up(1.005, 2), 1.01);
        assert_eq!(round_half_up(2.675, 2), 2.68);
        assert_eq!(round_half_up(1.5, 0), 2.0);
        assert_eq!(round_half_up(2.5, 0), 3.0);
        assert_eq!(round_half_up(1.234, 2), 1.23);
        assert_eq!(round_half_up(-1.5, 0), -2.0);
        assert_eq!(round_half_up(f64::NAN, 2), 0.0);
    }

    #[test]
    fn test_counters_from_record() {
        let mut fields = BTreeMap::new();
        fields.insert("followers".to_string(), FieldValue::Count(1234));
        fields.insert("posts".to_string(), FieldValue::Count(17));
        fields.insert("name".to_string(), FieldValue::Text("someone".to_string()));
        let record = ExtractionRecord {
            index: 1,
            partial: true,
            fields,
        };

        let counters = ProfileCounters::from_record(&record);
        assert_eq!(counters.followers, 1234);
        assert_eq!(counters.posts, 17);
        assert_eq!(counters.following, 0);
        assert!(!counters.is_empty());
        assert!(ProfileCounters::default().is_empty());
    }
}
