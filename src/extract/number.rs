//! Abbreviated count parsing
//!
//! Social pages render counters as "1,234", "12.3K" or "4M". [`parse_count`]
//! turns those into exact integers.

/// Parses a human-abbreviated count into an integer
///
/// The first whitespace-separated token is read, `,` separators are dropped and
/// a `K`, `M` or `B` suffix (any case) directly after the numeral scales it.
/// Fractional results are truncated. Anything unparseable yields 0.
///
/// # Examples
///
/// ```
/// use tidemark::parse_count;
///
/// assert_eq!(parse_count("1,234"), 1234);
/// assert_eq!(parse_count("2.5K"), 2500);
/// assert_eq!(parse_count("abc"), 0);
/// ```
pub fn parse_count(text: &str) -> u64 {
    let token = match text.split_whitespace().next() {
        Some(token) => token.replace(',', "").to_ascii_lowercase(),
        None => return 0,
    };

    let numeral_len = token
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(token.len());
    let (numeral, rest) = token.split_at(numeral_len);

    let exponent = match rest.chars().next() {
        Some('k') => 3,
        Some('m') => 6,
        Some('b') => 9,
        _ => 0,
    };

    scale_numeral(numeral, exponent).unwrap_or(0)
}

/// Multiplies a decimal numeral by `10^exponent`, truncating the fraction
fn scale_numeral(numeral: &str, exponent: usize) -> Option<u64> {
    let (whole, fraction) = match numeral.split_once('.') {
        Some((whole, fraction)) => (whole, fraction),
        None => (numeral, ""),
    };

    if fraction.contains('.') || (whole.is_empty() && fraction.is_empty()) {
        return None;
    }

    // Only the first `exponent` fractional digits survive truncation
    let mut digits = String::with_capacity(whole.len() + exponent);
    digits.push_str(whole);
    digits.extend(fraction.chars().take(exponent));
    for _ in fraction.len().min(exponent)..exponent {
        digits.push('0');
    }

    let trimmed = digits.trim_start_matches('0');
    if trimmed.is_empty() {
        return Some(0);
    }
    Some(trimmed.parse::<u64>().unwrap_or(u64::MAX))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_and_separated() {
        assert_eq!(parse_count("1,234"), 1234);
        assert_eq!(parse_count("987"), 987);
        assert_eq!(parse_count("  42 likes"), 42);
    }

    #[test]
    fn test_suffixes() {
        assert_eq!(parse_count("2.5K"), 2500);
        assert_eq!(parse_count("3M"), 3_000_000);
        assert_eq!(parse_count("1.2B"), 1_200_000_000);
        assert_eq!(parse_count("12.3k"), 12_300);
        assert_eq!(parse_count("4.1K"), 4100);
    }

    #[test]
    fn test_truncates_fraction() {
        assert_eq!(parse_count("1.2345K"), 1234);
        assert_eq!(parse_count("7.9"), 7);
        assert_eq!(parse_count(".5K"), 500);
    }

    #[test]
    fn test_text_after_suffix_ignored() {
        assert_eq!(parse_count("10Kfollowers"), 10_000);
        assert_eq!(parse_count("1.5M views"), 1_500_000);
    }

    #[test]
    fn test_unparseable_is_zero() {
        assert_eq!(parse_count(""), 0);
        assert_eq!(parse_count("   "), 0);
        assert_eq!(parse_count("abc"), 0);
        assert_eq!(parse_count("-5"), 0);
        assert_eq!(parse_count("1.2.3"), 0);
        assert_eq!(parse_count("K"), 0);
        assert_eq!(parse_count("."), 0);
    }

    #[test]
    fn test_overflow_saturates() {
        assert_eq!(parse_count("99999999999999999999999B"), u64::MAX);
    }
}
