//! Cross-run statistics
//!
//! Text rendering of the per-target averages stored across runs, ranked by
//! engagement rate.

use crate::storage::{Storage, TargetAverage};
use crate::ScrapeError;

/// Loads the per-target averages from storage
pub fn load_statistics(storage: &dyn Storage) -> Result<Vec<TargetAverage>, ScrapeError> {
    Ok(storage.target_averages()?)
}

/// Formats averages as an aligned table
pub fn format_statistics(averages: &[TargetAverage]) -> String {
    let mut out = String::from("=== Engagement Statistics ===\n\n");
    if averages.is_empty() {
        out.push_str("No successful targets stored yet.\n");
        return out;
    }

    let width = averages
        .iter()
        .map(|a| a.label.len())
        .max()
        .unwrap_or(0)
        .max("Target".len());

    out.push_str(&format!(
        "{:>3}  {:<width$}  {:>6}  {:>10}  {:>12}  {:>7}\n",
        "#",
        "Target",
        "Runs",
        "Rate (%)",
        "Followers",
        "Items",
        width = width
    ));
    for (position, average) in averages.iter().enumerate() {
        out.push_str(&format!(
            "{:>3}  {:<width$}  {:>6}  {:>10.2}  {:>12.0}  {:>7.1}\n",
            position + 1,
            average.label,
            average.runs,
            average.average_rate,
            average.average_followers,
            average.average_records,
            width = width
        ));
    }
    out
}

/// Prints statistics to stdout
pub fn print_statistics(averages: &[TargetAverage]) {
    print!("{}", format_statistics(averages));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn average(label: &str, rate: f64) -> TargetAverage {
        TargetAverage {
            label: label.to_string(),
            platform: "instagram".to_string(),
            runs: 2,
            average_rate: rate,
            average_followers: 1500.0,
            average_records: 12.0,
            last_scraped_at: "2024-01-01T00:00:00Z".to_string(),
        }
    }

    #[test]
    fn test_format_statistics() {
        let text = format_statistics(&[average("instagram:@a", 3.456), average("instagram:@bb", 0.5)]);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "=== Engagement Statistics ===");
        assert!(lines[2].contains("Rate (%)"));
        assert!(lines[3].starts_with("  1  instagram:@a "));
        assert!(lines[3].contains("3.46"));
        assert!(lines[4].contains("0.50"));
    }

    #[test]
    fn test_format_empty() {
        assert!(format_statistics(&[]).contains("No successful targets"));
    }
}
