//! Static HTML helpers built on `scraper`.

use scraper::{ElementRef, Html, Selector};

const NON_TEXT_ELEMENTS: &[&str] = &["script", "style", "noscript", "svg", "template"];

/// Text content of an element with whitespace collapsed.
pub fn element_text(el: &ElementRef<'_>) -> String {
    el.text()
        .collect::<Vec<_>>()
        .join(" ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Visible `<body>` text, skipping script and style content.
pub fn body_text(document: &Html) -> String {
    let Ok(sel) = Selector::parse("body") else {
        return String::new();
    };
    let Some(body) = document.select(&sel).next() else {
        return String::new();
    };

    let mut parts: Vec<&str> = Vec::new();
    for node in body.descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let hidden = node.ancestors().any(|a| {
            a.value()
                .as_element()
                .is_some_and(|e| NON_TEXT_ELEMENTS.contains(&e.name()))
        });
        if !hidden {
            parts.push(text);
        }
    }
    parts
        .join(" ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Non-empty texts of every element matching `selector`, in document order.
pub fn select_texts(document: &Html, selector: &str) -> Vec<String> {
    let Ok(sel) = Selector::parse(selector) else {
        return Vec::new();
    };
    document
        .select(&sel)
        .map(|el| element_text(&el))
        .filter(|t| !t.is_empty())
        .collect()
}

/// Text of the first element matching `selector` that has any.
pub fn first_text(document: &Html, selector: &str) -> Option<String> {
    select_texts(document, selector).into_iter().next()
}

/// `content` of a `<meta>` tag matched by `name` or `property`.
pub fn meta_content(document: &Html, key: &str) -> Option<String> {
    let selector = format!(r#"meta[name="{key}"], meta[property="{key}"]"#);
    let sel = Selector::parse(&selector).ok()?;
    document
        .select(&sel)
        .filter_map(|el| el.value().attr("content"))
        .map(|c| c.split_whitespace().collect::<Vec<_>>().join(" "))
        .find(|c| !c.is_empty())
}

/// Meta descriptions followed by body text, for signal scanning.
pub fn page_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let mut parts: Vec<String> = Vec::new();
    for key in ["og:description", "description"] {
        if let Some(c) = meta_content(&document, key) {
            parts.push(c);
        }
    }
    parts.push(body_text(&document));
    parts.join(" ")
}
