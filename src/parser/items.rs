use std::sync::LazyLock;

use regex::Regex;

/// Items shorter than this are dropped unless they carry sentence punctuation.
pub const MIN_ITEM_LEN: usize = 25;

/// Lowercase phrases that mark an item as page chrome rather than posting content.
/// A phrase starting with a letter must also start a word ("backlog in" is not "log in").
pub const DENYLIST: &[&str] = &[
    // cookies / consent
    "cookie",
    "accept all",
    "manage preferences",
    "cookie consent",
    // legal
    "privacy policy",
    "privacy notice",
    "terms of use",
    "terms of service",
    "terms and conditions",
    "all rights reserved",
    "©",
    "do not sell",
    // navigation / careers-page chrome
    "skip to main content",
    "skip to content",
    "back to jobs",
    "back to search",
    "view all jobs",
    "see all jobs",
    "similar jobs",
    "share this job",
    "share on linkedin",
    "share on twitter",
    "share on facebook",
    "apply now",
    "apply for this job",
    "sign in to",
    "log in to",
    "create an account",
    "job alert",
    "powered by",
    "follow us",
    "enable javascript",
    "returning applicant",
    "report this job",
];

// Separators: newlines, bullet glyphs, and line-leading "1." / "1)" or "-" / "–" / "*" prefixes.
static SPLIT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)\n|[•·●○◦▪■►▸➢✓✔]|^[ \t]*\d{1,2}[.)][ \t]+|^[ \t]*[-–—*][ \t]+").unwrap()
});

/// Split a section span into trimmed, filtered line items.
pub fn split_items(span: &str) -> Vec<String> {
    SPLIT_RE
        .split(span)
        .map(normalize_whitespace)
        .filter(|item| keep_item(item))
        .collect()
}

pub fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Length/punctuation gate plus denylist.
pub fn keep_item(item: &str) -> bool {
    if item.is_empty() {
        return false;
    }
    if item.chars().count() < MIN_ITEM_LEN && !item.contains(['.', ',', ':']) {
        return false;
    }
    !is_boilerplate(item)
}

pub fn is_boilerplate(item: &str) -> bool {
    let lower = item.to_lowercase();
    DENYLIST.iter().any(|phrase| contains_phrase(&lower, phrase))
}

fn contains_phrase(haystack: &str, phrase: &str) -> bool {
    let needs_boundary = phrase.starts_with(|c: char| c.is_alphanumeric());
    haystack.match_indices(phrase).any(|(at, _)| {
        !needs_boundary || !haystack[..at].ends_with(|c: char| c.is_alphanumeric())
    })
}

// ── Tests ──
