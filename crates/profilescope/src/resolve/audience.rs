//! Audience-size (follower count) extraction from page text.

use std::sync::OnceLock;

use regex::Regex;

fn followers_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)(\d[\d,.]*)\s*([kmb])?\+?\s*followers\b").expect("valid regex")
    })
}

/// Parse a count like `12,345`, `1.2K`, `3M` or `2.5 B` into an integer.
pub fn parse_count(number: &str, suffix: Option<&str>) -> Option<u64> {
    let multiplier = match suffix.map(|s| s.to_ascii_lowercase()).as_deref() {
        None | Some("") => 1.0,
        Some("k") => 1e3,
        Some("m") => 1e6,
        Some("b") => 1e9,
        Some(_) => return None,
    };

    let cleaned = number.trim().replace(',', "");
    let cleaned = cleaned.trim_end_matches('.');
    let value: f64 = cleaned.parse().ok()?;
    if !value.is_finite() || value < 0.0 {
        return None;
    }
    Some((value * multiplier).round() as u64)
}

/// First follower count mentioned in `text`.
///
/// Pages list the profile's own count before any "similar pages" counts,
/// so the first match wins.
pub fn parse_audience_size(text: &str) -> Option<u64> {
    followers_re().captures_iter(text).find_map(|caps| {
        let number = caps.get(1)?.as_str();
        parse_count(number, caps.get(2).map(|m| m.as_str()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_and_grouped_numbers() {
        assert_eq!(parse_audience_size("Acme · 842 followers"), Some(842));
        assert_eq!(parse_audience_size("12,345 followers on LinkedIn"), Some(12_345));
    }

    #[test]
    fn test_suffixed_numbers() {
        assert_eq!(parse_audience_size("1.2K followers"), Some(1_200));
        assert_eq!(parse_audience_size("3M Followers"), Some(3_000_000));
        assert_eq!(parse_audience_size("2.5 b followers"), Some(2_500_000_000));
        assert_eq!(parse_audience_size("10K+ followers"), Some(10_000));
    }

    #[test]
    fn test_first_match_wins() {
        let text = "Acme 5,000 followers. Similar pages: Other 9M followers";
        assert_eq!(parse_audience_size(text), Some(5_000));
    }

    #[test]
    fn test_no_signal() {
        assert_eq!(parse_audience_size("Join us on our mission"), None);
        assert_eq!(parse_audience_size("followers"), None);
    }

    #[test]
    fn test_parse_count_rejects_unknown_suffix() {
        assert_eq!(parse_count("5", Some("x")), None);
        assert_eq!(parse_count("5.", None), Some(5));
    }
}
