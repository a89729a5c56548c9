//! Offline page input: build a `RawPage` from saved HTML without a browser.
//!
//! Hidden-element detection is static only (attributes and inline styles);
//! computed styles need the live browser path in `fetcher`.

use ::scraper::node::Node;
use ::scraper::{ElementRef, Html, Selector};
use serde_json::Value;

use crate::fetcher::RawPage;
use crate::parser::metadata::parse_metadata;

const SKIPPED_TAGS: &[&str] = &["head", "script", "style", "noscript", "iframe", "template", "svg"];

/// Visible text nodes in document order, one per line.
pub fn visible_text(html: &str) -> String {
    let doc = Html::parse_document(html);
    let mut lines = Vec::new();
    collect_text(doc.root_element(), &mut lines);
    lines.join("\n")
}

fn collect_text(el: ElementRef, out: &mut Vec<String>) {
    for child in el.children() {
        match child.value() {
            Node::Text(t) => {
                let line = t.split_whitespace().collect::<Vec<_>>().join(" ");
                if !line.is_empty() {
                    out.push(line);
                }
            }
            Node::Element(_) => {
                if let Some(child_el) = ElementRef::wrap(child) {
                    if is_visible(&child_el) {
                        collect_text(child_el, out);
                    }
                }
            }
            _ => {}
        }
    }
}

fn is_visible(el: &ElementRef) -> bool {
    let e = el.value();
    if SKIPPED_TAGS.contains(&e.name()) {
        return false;
    }
    if e.attr("hidden").is_some() || e.attr("aria-hidden") == Some("true") {
        return false;
    }
    match e.attr("style") {
        Some(style) => {
            let style: String = style
                .chars()
                .filter(|c| !c.is_whitespace())
                .collect::<String>()
                .to_lowercase();
            !(style.contains("display:none") || style.contains("visibility:hidden"))
        }
        None => true,
    }
}

/// First `application/ld+json` block, if it parses.
pub fn first_ld_json(html: &str) -> Option<Value> {
    let doc = Html::parse_document(html);
    let selector = Selector::parse(r#"script[type="application/ld+json"]"#).ok()?;
    let block = doc.select(&selector).next()?;
    parse_metadata(&block.text().collect::<String>())
}

pub fn raw_page_from_html(url: &str, html: &str) -> RawPage {
    RawPage {
        url: url.to_string(),
        visible_text: visible_text(html),
        structured_metadata: first_ld_json(html),
    }
}

// ── Tests ──
