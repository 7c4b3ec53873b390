//! Markup cleanup for word-processor exported fragments.
//!
//! The fragment is parsed into a DOM and re-serialized by a walk that only
//! emits what survives: comments and non-content elements are dropped,
//! namespace-prefixed elements are unwrapped, and presentational attributes
//! are removed. A few text passes then normalize the result.

use std::sync::LazyLock;

use ego_tree::NodeRef;
use regex::Regex;
use scraper::{ElementRef, Html, Node, Selector};

/// Elements removed together with their contents.
const REMOVED_ELEMENTS: &[&str] = &["style", "script", "meta", "link", "object"];

/// Attributes removed from every element.
const REMOVED_ATTRIBUTES: &[&str] = &[
    "class", "style", "lang", "link", "vlink", "xmlns", "w:st",
];

/// Attribute name prefixes removed from every element.
const REMOVED_ATTRIBUTE_PREFIXES: &[&str] = &["mso-", "xmlns:"];

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "keygen", "param", "source",
    "track", "wbr",
];

/// Elements whose wrapper is dropped while their contents are kept.
const UNWRAPPED_ELEMENTS: &[&str] = &["noscript", "template"];

static HEAD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<head>.*?</head>").expect("valid regex"));

/// Clean one HTML fragment and return the surviving markup, trimmed.
///
/// Markup with a `<body>` tag contributes only the body contents. Anything
/// else is treated as a bare fragment and kept whole.
pub fn sanitize_fragment(raw_html: &str) -> String {
    static BODY_TAG_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"(?i)<body[\s/>]").expect("valid regex"));
    static BODY: LazyLock<Selector> =
        LazyLock::new(|| Selector::parse("body").expect("valid selector"));

    let mut out = String::with_capacity(raw_html.len());
    if BODY_TAG_RE.is_match(raw_html) {
        let doc = Html::parse_document(raw_html);
        match doc.select(&BODY).next() {
            Some(body) => write_children(*body, &mut out),
            None => write_children(*doc.root_element(), &mut out),
        }
    } else {
        // The fragment parser ignores <head> tags and would keep their children.
        let raw_html = HEAD_RE.replace_all(raw_html, "");
        let doc = Html::parse_fragment(&raw_html);
        write_children(*doc.root_element(), &mut out);
    }

    let out = strip_wrappers(&out);
    let out = collapse_blank_lines(&out);
    out.trim().to_string()
}

// ---------------------------------------------------------------------------
// Tree walk
// ---------------------------------------------------------------------------

fn write_children(node: NodeRef<'_, Node>, out: &mut String) {
    for child in node.children() {
        match child.value() {
            Node::Text(text) => escape_text(text, out),
            Node::Element(_) => {
                if let Some(child_el) = ElementRef::wrap(child) {
                    write_element(child_el, out);
                }
            }
            // Template contents live under a fragment node.
            Node::Fragment => write_children(child, out),
            // Comments, doctypes and processing instructions are dropped.
            _ => {}
        }
    }
}

fn write_element(el: ElementRef<'_>, out: &mut String) {
    let name = el.value().name();

    if REMOVED_ELEMENTS.contains(&name) {
        return;
    }

    // With scripting on, noscript contents arrive as raw markup text.
    if name == "noscript" && el.children().all(|child| child.value().is_text()) {
        let inner: String = el.text().collect();
        out.push_str(&sanitize_fragment(&inner));
        return;
    }

    // Editor markup such as <o:p> or <st1:place>: keep only the children.
    if name.contains(':') || UNWRAPPED_ELEMENTS.contains(&name) {
        write_children(*el, out);
        return;
    }

    out.push('<');
    out.push_str(name);
    for (attr, value) in el.value().attrs() {
        if is_removed_attribute(attr) {
            continue;
        }
        out.push(' ');
        out.push_str(attr);
        out.push_str("=\"");
        escape_attribute(value, out);
        out.push('"');
    }
    out.push('>');

    if VOID_ELEMENTS.contains(&name) {
        return;
    }

    write_children(*el, out);

    out.push_str("</");
    out.push_str(name);
    out.push('>');
}

fn is_removed_attribute(name: &str) -> bool {
    REMOVED_ATTRIBUTES.contains(&name)
        || REMOVED_ATTRIBUTE_PREFIXES
            .iter()
            .any(|prefix| name.starts_with(prefix))
}

fn escape_text(text: &str, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
}

fn escape_attribute(value: &str, out: &mut String) {
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
}

// ---------------------------------------------------------------------------
// Text passes
// ---------------------------------------------------------------------------

/// Remove any leftover `<html>` tags and `<head>` blocks.
fn strip_wrappers(html: &str) -> String {
    static HTML_TAG_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"</?html[^>]*>").expect("valid regex"));
    let html = HTML_TAG_RE.replace_all(html, "");
    HEAD_RE.replace_all(&html, "").into_owned()
}

/// Collapse runs of 3+ line breaks (blank lines included) into one blank line.
fn collapse_blank_lines(html: &str) -> String {
    static MULTI_BLANK_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\n\s*\n\s*\n").expect("valid regex"));

    MULTI_BLANK_RE.replace_all(html, "\n\n").into_owned()
}
