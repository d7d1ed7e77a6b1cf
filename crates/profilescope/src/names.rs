//! Company-name normalization, slug variants and profile URL handling.

use percent_encoding::percent_decode_str;
use url::Url;

/// Corporate suffixes stripped when generating name variants.
pub const CORPORATE_SUFFIXES: &[&str] = &[
    "inc",
    "incorporated",
    "corp",
    "corporation",
    "co",
    "company",
    "llc",
    "llp",
    "ltd",
    "limited",
    "plc",
    "gmbh",
    "ag",
    "sa",
    "srl",
    "bv",
    "nv",
    "group",
    "holdings",
];

/// Curated slugs for names whose profile slug cannot be guessed.
const KNOWN_SLUGS: &[(&str, &str)] = &[
    ("tesla", "tesla-motors"),
    ("facebook", "meta"),
    ("meta", "meta"),
    ("alphabet", "google"),
    ("google", "google"),
    ("amazon", "amazon"),
    ("microsoft", "microsoft"),
    ("apple", "apple"),
    ("ibm", "ibm"),
    ("netflix", "netflix"),
    ("openai", "openai"),
    ("twitter", "twitter"),
    ("x", "twitter"),
    ("salesforce", "salesforce"),
];

/// Lowercase, replace punctuation with spaces, collapse whitespace.
///
/// `"Acme, Inc."` becomes `"acme inc"`.
pub fn normalize_name(name: &str) -> String {
    let mut replaced = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_alphanumeric() {
            replaced.extend(c.to_lowercase());
        } else {
            replaced.push(' ');
        }
    }
    replaced.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Hyphenated slug form of a name: `"Acme Corp"` -> `"acme-corp"`.
pub fn slug_key(name: &str) -> String {
    normalize_name(name).replace(' ', "-")
}

/// Slug form with separators removed: `"Acme Corp"` -> `"acmecorp"`.
pub fn compact_key(name: &str) -> String {
    normalize_name(name).replace(' ', "")
}

/// Drop trailing corporate suffixes from a normalized name.
///
/// Never strips the last remaining word, so `"group"` stays `"group"`.
pub fn strip_corporate_suffix(normalized: &str) -> String {
    let mut words: Vec<&str> = normalized.split_whitespace().collect();
    while words.len() > 1 {
        match words.last() {
            Some(last) if CORPORATE_SUFFIXES.contains(last) => {
                words.pop();
            }
            _ => break,
        }
    }
    words.join(" ")
}

/// Whether `slug` is the company's key followed only by corporate suffixes,
/// e.g. `acme-inc` for "Acme".
pub fn is_suffixed_slug(slug: &str, company: &str) -> bool {
    let base = strip_corporate_suffix(&normalize_name(company)).replace(' ', "-");
    let Some(rest) = slug.strip_prefix(&base) else {
        return false;
    };
    let Some(rest) = rest.strip_prefix('-') else {
        return false;
    };
    !rest.is_empty()
        && rest
            .split('-')
            .all(|part| CORPORATE_SUFFIXES.contains(&part))
}

/// Alternative slug spellings for a company name, most likely first.
///
/// Produces hyphenated, suffix-stripped, compact and suffix-appended forms,
/// deduplicated and capped at `max`.
pub fn name_variants(name: &str, max: usize) -> Vec<String> {
    let normalized = normalize_name(name);
    if normalized.is_empty() {
        return Vec::new();
    }
    let stripped = strip_corporate_suffix(&normalized);
    let hyphenated = normalized.replace(' ', "-");
    let stripped_hyphenated = stripped.replace(' ', "-");

    let candidates = [
        hyphenated.clone(),
        stripped_hyphenated.clone(),
        normalized.replace(' ', ""),
        stripped.replace(' ', ""),
        format!("{stripped_hyphenated}-inc"),
        format!("{stripped_hyphenated}-corporation"),
        format!("{stripped_hyphenated}-group"),
    ];

    let mut variants: Vec<String> = Vec::new();
    for candidate in candidates {
        if !candidate.is_empty() && !variants.contains(&candidate) {
            variants.push(candidate);
        }
    }
    variants.truncate(max);
    variants
}

/// Curated slug for a company, if one is on file.
pub fn known_slug(name: &str) -> Option<&'static str> {
    let normalized = normalize_name(name);
    let stripped = strip_corporate_suffix(&normalized);
    KNOWN_SLUGS
        .iter()
        .find(|(key, _)| *key == normalized || *key == stripped)
        .map(|(_, slug)| *slug)
}

/// Extract the profile slug from a URL on the profile host.
///
/// Accepts `www.` and locale subdomains (`uk.linkedin.com`) and ignores
/// trailing path segments, query strings and fragments.
pub fn slug_from_url(raw: &str, host: &str, path_prefix: &str) -> Option<String> {
    let url = Url::parse(raw).ok()?;
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }
    let url_host = url.host_str()?.to_ascii_lowercase();
    let host = host.to_ascii_lowercase();
    if url_host != host && !url_host.ends_with(&format!(".{host}")) {
        return None;
    }

    let rest = url.path().strip_prefix(path_prefix)?;
    let segment = rest.split('/').next()?;
    let decoded = percent_decode_str(segment).decode_utf8_lossy().to_ascii_lowercase();
    let slug = decoded.trim();
    if slug.is_empty() {
        return None;
    }
    Some(slug.to_string())
}

/// Canonical profile URL for a slug.
pub fn profile_url(slug: &str, host: &str, path_prefix: &str) -> String {
    format!("https://www.{host}{path_prefix}{slug}/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("Acme, Inc."), "acme inc");
        assert_eq!(normalize_name("  Procter & Gamble  "), "procter gamble");
        assert_eq!(normalize_name("AT&T"), "at t");
        assert_eq!(normalize_name(""), "");
    }

    #[test]
    fn test_strip_corporate_suffix() {
        assert_eq!(strip_corporate_suffix("acme corp"), "acme");
        assert_eq!(strip_corporate_suffix("acme holdings ltd"), "acme");
        assert_eq!(strip_corporate_suffix("group"), "group");
        assert_eq!(strip_corporate_suffix("acme widgets"), "acme widgets");
    }

    #[test]
    fn test_name_variants_order_and_cap() {
        let variants = name_variants("Acme Widgets Inc.", 10);
        assert_eq!(variants[0], "acme-widgets-inc");
        assert_eq!(variants[1], "acme-widgets");
        assert!(variants.contains(&"acmewidgetsinc".to_string()));
        assert!(variants.contains(&"acme-widgets-corporation".to_string()));

        let capped = name_variants("Acme Widgets Inc.", 2);
        assert_eq!(capped.len(), 2);
    }

    #[test]
    fn test_name_variants_dedupes_single_word() {
        let variants = name_variants("Acme", 10);
        assert_eq!(variants[0], "acme");
        let unique: std::collections::HashSet<_> = variants.iter().collect();
        assert_eq!(unique.len(), variants.len());
    }

    #[test]
    fn test_known_slug_lookup() {
        assert_eq!(known_slug("Tesla"), Some("tesla-motors"));
        assert_eq!(known_slug("Tesla, Inc."), Some("tesla-motors"));
        assert_eq!(known_slug("Obscure Startup"), None);
    }

    #[test]
    fn test_slug_from_url_variants() {
        let host = "linkedin.com";
        let prefix = "/company/";
        assert_eq!(
            slug_from_url("https://www.linkedin.com/company/acme/", host, prefix),
            Some("acme".into())
        );
        assert_eq!(
            slug_from_url("https://uk.linkedin.com/company/Acme-Corp/about?trk=x", host, prefix),
            Some("acme-corp".into())
        );
        assert_eq!(
            slug_from_url("https://linkedin.com/company/caf%C3%A9-co", host, prefix),
            Some("café-co".into())
        );
        assert_eq!(slug_from_url("https://www.linkedin.com/in/jane", host, prefix), None);
        assert_eq!(slug_from_url("https://notlinkedin.com/company/acme", host, prefix), None);
        assert_eq!(slug_from_url("https://www.linkedin.com/company/", host, prefix), None);
        assert_eq!(slug_from_url("not a url", host, prefix), None);
    }

    #[test]
    fn test_slug_from_url_decodes_every_escape() {
        let host = "linkedin.com";
        let prefix = "/company/";
        assert_eq!(
            slug_from_url("https://www.linkedin.com/company/acme%2D", host, prefix),
            Some("acme-".into())
        );
        assert_eq!(
            slug_from_url("https://www.linkedin.com/company/acme%zz", host, prefix),
            Some("acme%zz".into())
        );
    }

    #[test]
    fn test_is_suffixed_slug() {
        assert!(is_suffixed_slug("acme-inc", "Acme"));
        assert!(is_suffixed_slug("acme-corp-ltd", "Acme Corp"));
        assert!(!is_suffixed_slug("acme", "Acme"));
        assert!(!is_suffixed_slug("acme-distribution", "Acme"));
    }

    #[test]
    fn test_profile_url() {
        assert_eq!(
            profile_url("acme", "linkedin.com", "/company/"),
            "https://www.linkedin.com/company/acme/"
        );
    }
}
