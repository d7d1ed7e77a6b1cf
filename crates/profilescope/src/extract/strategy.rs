//! Ordered selector strategies, first non-empty result wins.

use scraper::Html;

use super::html::{first_text, meta_content, select_texts};

/// One way of pulling a value out of a parsed page.
pub struct Strategy<T> {
    pub name: &'static str,
    pub run: fn(&Html) -> Option<T>,
}

/// Run `strategies` in order and return the first hit with its name.
pub fn first_match<'a, T>(document: &Html, strategies: &'a [Strategy<T>]) -> Option<(&'a str, T)> {
    strategies
        .iter()
        .find_map(|s| (s.run)(document).map(|value| (s.name, value)))
}

fn non_empty(text: String) -> Option<String> {
    let text = text.trim().to_string();
    (!text.is_empty()).then_some(text)
}

fn strip_host_suffix(title: &str) -> String {
    title
        .rsplit_once(" | ")
        .filter(|(_, suffix)| suffix.trim().eq_ignore_ascii_case("linkedin"))
        .map(|(head, _)| head.to_string())
        .unwrap_or_else(|| title.to_string())
}

// ── Title ───────────────────────────────────────────────────────────────────

fn title_top_card(doc: &Html) -> Option<String> {
    first_text(
        doc,
        "h1.top-card-layout__title, h1.org-top-card-summary__title, h1",
    )
}

fn title_og(doc: &Html) -> Option<String> {
    meta_content(doc, "og:title").and_then(|t| non_empty(strip_host_suffix(&t)))
}

fn title_document(doc: &Html) -> Option<String> {
    first_text(doc, "title").and_then(|t| non_empty(strip_host_suffix(&t)))
}

pub const TITLE_STRATEGIES: &[Strategy<String>] = &[
    Strategy {
        name: "top_card",
        run: title_top_card,
    },
    Strategy {
        name: "og_title",
        run: title_og,
    },
    Strategy {
        name: "document_title",
        run: title_document,
    },
];

// ── Description ─────────────────────────────────────────────────────────────

fn description_about(doc: &Html) -> Option<String> {
    first_text(doc, r#"[data-test-id="about-us__description"]"#)
}

fn description_about_paragraph(doc: &Html) -> Option<String> {
    first_text(doc, "p.about-us__description, section.org-about-module p")
}

fn description_section(doc: &Html) -> Option<String> {
    first_text(doc, ".core-section-container__content p")
}

fn description_og(doc: &Html) -> Option<String> {
    meta_content(doc, "og:description")
}

fn description_meta(doc: &Html) -> Option<String> {
    meta_content(doc, "description")
}

pub const DESCRIPTION_STRATEGIES: &[Strategy<String>] = &[
    Strategy {
        name: "about_us",
        run: description_about,
    },
    Strategy {
        name: "about_paragraph",
        run: description_about_paragraph,
    },
    Strategy {
        name: "section_content",
        run: description_section,
    },
    Strategy {
        name: "og_description",
        run: description_og,
    },
    Strategy {
        name: "meta_description",
        run: description_meta,
    },
];

// ── Posts (static fallbacks) ────────────────────────────────────────────────

/// Selector used against the live page before falling back to these.
pub const PRIMARY_POST_SELECTOR: &str =
    r#"[data-test-id="main-feed-activity-card__commentary"], .attributed-text-segment-list__content"#;

fn non_empty_list(texts: Vec<String>) -> Option<Vec<String>> {
    (!texts.is_empty()).then_some(texts)
}

fn posts_update_text(doc: &Html) -> Option<Vec<String>> {
    non_empty_list(select_texts(
        doc,
        ".feed-shared-update-v2__description, .update-components-text, .feed-shared-text",
    ))
}

fn posts_article_paragraphs(doc: &Html) -> Option<Vec<String>> {
    non_empty_list(select_texts(doc, "article p, li.mb-1 p"))
}

pub const POST_STRATEGIES: &[Strategy<Vec<String>>] = &[
    Strategy {
        name: "update_text",
        run: posts_update_text,
    },
    Strategy {
        name: "article_paragraphs",
        run: posts_article_paragraphs,
    },
];
