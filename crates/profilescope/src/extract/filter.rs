//! Post text cleaning and validity filtering.

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;

use crate::config::ExtractionConfig;
use crate::names::normalize_name;

/// Why a piece of text was rejected as a post.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    Blank,
    CompanyName,
    TooShort,
    TooFewWords,
    AllUppercase,
    Noise,
}

fn noise_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            // Dates and relative timestamps.
            r"(?i)^\d{1,4}[/.-]\d{1,2}[/.-]\d{1,4}$",
            r"(?i)^(jan|feb|mar|apr|may|jun|jul|aug|sep|sept|oct|nov|dec)[a-z]*\.?\s+\d{1,2}(st|nd|rd|th)?,?\s+\d{4}$",
            r"(?i)^\d+\s*(s|m|h|d|w|mo|yr|y|min|mins|hour|hours|day|days|week|weeks|month|months|year|years)(\s+ago)?\s*(•.*)?$",
            // Engagement counters.
            r"(?i)^\d[\d,.]*[kmb]?\s+(followers?|employees?|reactions?|comments?|reposts?|likes?)$",
            // Calls to action and guest-wall prompts.
            r"(?i)^(follow|like|comment|share|repost|send|see more|show more|read more|learn more|apply now|register now|click here|view job|see jobs)\b[\w\s!.…]{0,40}$",
            r"(?i)^(sign in|join now|join to|log in|new to linkedin)\b.*$",
            r"(?i)(…|\.\.\.)\s*(see more|more)$",
            // Short acknowledgements.
            r"(?i)^(thanks?|thank you|thx|congrat\w*|great (post|news|work|job)|well done|awesome|amazing|love (this|it)|so proud)[\s\w!.,❤️👏🎉]{0,60}$",
        ]
        .iter()
        .map(|p| Regex::new(p).expect("valid regex"))
        .collect()
    })
}

/// Collapse whitespace and drop "see more" truncation markers.
pub fn clean_text(raw: &str) -> String {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    let mut text = collapsed.as_str();
    for marker in ["…see more", "... see more", "…more", "... more", "See more", "see more"] {
        if let Some(stripped) = text.strip_suffix(marker) {
            text = stripped.trim_end();
        }
    }
    text.to_string()
}

/// Drop exact duplicates, keeping first occurrences in order.
pub fn dedupe_preserving_order(texts: Vec<String>) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    texts
        .into_iter()
        .filter(|t| seen.insert(t.clone()))
        .collect()
}

/// Validity rules for candidate post texts of one company.
pub struct PostFilter {
    company: String,
    min_chars: usize,
    min_words: usize,
}

impl PostFilter {
    pub fn new(company: &str, config: &ExtractionConfig) -> Self {
        Self {
            company: normalize_name(company),
            min_chars: config.min_post_chars,
            min_words: config.min_post_words,
        }
    }

    /// Check one already-cleaned text.
    pub fn check(&self, text: &str) -> Result<(), Rejection> {
        let text = text.trim();
        if text.is_empty() {
            return Err(Rejection::Blank);
        }
        if !self.company.is_empty() && normalize_name(text) == self.company {
            return Err(Rejection::CompanyName);
        }
        if text.chars().count() < self.min_chars {
            return Err(Rejection::TooShort);
        }
        if text.split_whitespace().count() < self.min_words {
            return Err(Rejection::TooFewWords);
        }
        let mut letters = text.chars().filter(|c| c.is_alphabetic()).peekable();
        if letters.peek().is_some() && letters.all(|c| !c.is_lowercase()) {
            return Err(Rejection::AllUppercase);
        }
        if noise_patterns().iter().any(|re| re.is_match(text)) {
            return Err(Rejection::Noise);
        }
        Ok(())
    }

    pub fn is_valid(&self, text: &str) -> bool {
        self.check(text).is_ok()
    }

    /// Clean, filter and deduplicate `texts`, keeping at most `max`.
    pub fn apply<I>(&self, texts: I, max: usize) -> Vec<String>
    where
        I: IntoIterator<Item = String>,
    {
        let valid: Vec<String> = texts
            .into_iter()
            .map(|t| clean_text(&t))
            .filter(|t| self.is_valid(t))
            .collect();
        let mut posts = dedupe_preserving_order(valid);
        posts.truncate(max);
        posts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter() -> PostFilter {
        PostFilter::new("Acme Inc", &ExtractionConfig::default())
    }

    const GOOD: &str = "We are thrilled to announce our new line of rocket-powered roller skates.";

    #[test]
    fn test_accepts_real_post() {
        assert_eq!(filter().check(GOOD), Ok(()));
    }

    #[test]
    fn test_rejections() {
        let f = filter();
        assert_eq!(f.check("   "), Err(Rejection::Blank));
        assert_eq!(f.check("Acme, Inc."), Err(Rejection::CompanyName));
        assert_eq!(f.check("Short words only"), Err(Rejection::TooShort));
        assert_eq!(
            f.check("Supercalifragilisticexpialidocious antidisestablishment"),
            Err(Rejection::TooFewWords)
        );
        assert_eq!(
            f.check("ANNOUNCING OUR BIGGEST SALE OF THE ENTIRE YEAR TODAY"),
            Err(Rejection::AllUppercase)
        );
        assert_eq!(
            f.check("Sign in to see who you already know at Acme Inc today"),
            Err(Rejection::Noise)
        );
        assert_eq!(
            f.check("Congratulations to the whole team on this milestone!"),
            Err(Rejection::Noise)
        );
    }

    #[test]
    fn test_clean_text_strips_truncation() {
        assert_eq!(clean_text("  Big   news\ntoday …see more"), "Big news today");
        assert_eq!(clean_text("Nothing to strip"), "Nothing to strip");
    }

    #[test]
    fn test_dedupe_keeps_first_seen_order() {
        let input = vec!["b", "a", "b", "c", "a"]
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(dedupe_preserving_order(input), vec!["b", "a", "c"]);
    }

    #[test]
    fn test_dedupe_is_case_sensitive() {
        let input = vec!["Post".to_string(), "post".to_string()];
        assert_eq!(dedupe_preserving_order(input).len(), 2);
    }

    #[test]
    fn test_apply_filters_dedupes_and_caps() {
        let second = "Our engineering team just shipped the fastest anvil delivery pipeline ever.";
        let texts = vec![
            GOOD.to_string(),
            "2w".to_string(),
            format!("  {GOOD}  "),
            second.to_string(),
            GOOD.to_string(),
        ];
        assert_eq!(filter().apply(texts.clone(), 10), vec![GOOD, second]);
        assert_eq!(filter().apply(texts, 1), vec![GOOD]);
    }
}
