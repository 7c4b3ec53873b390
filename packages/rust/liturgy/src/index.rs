//! Season index documents: ordered `(title, reference)` links.

use std::collections::HashSet;
use std::sync::LazyLock;

use scraper::{Html, Selector};

/// One link of a season index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexLink {
    /// Link text with markup removed and whitespace collapsed.
    pub title: String,
    /// Decoded `href` path, without its `#fragment`.
    pub reference: String,
}

/// Extract the links of an index document in document order.
///
/// A reference seen earlier in the same document (fragment included) is
/// skipped. Links with an empty title or reference are skipped too, but still
/// count as seen.
pub fn parse_index(html: &str) -> Vec<IndexLink> {
    static LINK: LazyLock<Selector> =
        LazyLock::new(|| Selector::parse("a[href]").expect("valid selector"));

    let doc = Html::parse_document(html);
    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for anchor in doc.select(&LINK) {
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        let (path, fragment) = href.trim().split_once('#').unwrap_or((href.trim(), ""));
        let reference = decode_reference(path);

        if !seen.insert((reference.clone(), fragment.to_string())) {
            continue;
        }

        let title = collapse_whitespace(&anchor.text().collect::<String>());
        if reference.is_empty() || title.is_empty() {
            continue;
        }

        links.push(IndexLink { title, reference });
    }

    links
}

/// Percent-decode an `href`. Falls back to decoding only `%20` when the
/// result would not be valid UTF-8.
pub fn decode_reference(href: &str) -> String {
    let href = href.trim();
    match urlencoding::decode(href) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => href.replace("%20", " "),
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
