//! Query formulations tried for one company, in priority order.

use serde::Serialize;

use crate::config::SearchConfig;
use crate::names::name_variants;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryKind {
    /// The name as given, restricted to the profile domain.
    DomainExact,
    /// The quoted name, restricted to the profile domain.
    DomainQuoted,
    /// A generated slug variant, restricted to the profile domain.
    Variant,
    /// Unrestricted last resort.
    Broad,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchQuery {
    pub kind: QueryKind,
    pub text: String,
    pub domain_filter: Option<String>,
}

/// Build the ordered query list for `company`.
///
/// Queries whose text only differs by case from an earlier one are dropped.
pub fn build_queries(company: &str, config: &SearchConfig) -> Vec<SearchQuery> {
    let name = company.trim();
    if name.is_empty() {
        return Vec::new();
    }
    let filter = config.domain_filter();

    let mut queries = vec![
        SearchQuery {
            kind: QueryKind::DomainExact,
            text: name.to_string(),
            domain_filter: Some(filter.clone()),
        },
        SearchQuery {
            kind: QueryKind::DomainQuoted,
            text: format!("\"{name}\""),
            domain_filter: Some(filter.clone()),
        },
    ];

    for variant in name_variants(name, config.max_variants) {
        queries.push(SearchQuery {
            kind: QueryKind::Variant,
            text: variant,
            domain_filter: Some(filter.clone()),
        });
    }

    queries.push(SearchQuery {
        kind: QueryKind::Broad,
        text: format!("{name} {} company", config.profile_host),
        domain_filter: None,
    });

    let mut seen: Vec<String> = Vec::new();
    queries.retain(|q| {
        let key = q.text.to_lowercase();
        if seen.contains(&key) {
            false
        } else {
            seen.push(key);
            true
        }
    });
    queries
}
