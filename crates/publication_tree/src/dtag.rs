//! D-tag generation utilities for NKBIP-01 publications
//!
//! Every node minted from a document gets a d-tag from, in order: its
//! explicit id, its title, or a per-context counter namespaced by the
//! document tag.

use std::borrow::Cow;
use std::collections::HashMap;

use quick_xml::escape::{resolve_html5_entity, unescape_with};

/// Normalize an id or title candidate into d-tag form
///
/// - Decodes character entities (`&amp;`, `&#8217;`, ...)
/// - Lowercases the string
/// - Treats underscores as spaces
/// - Collapses whitespace runs into single hyphens
/// - Drops anything outside `[a-z0-9-]`
///
/// # Examples
///
/// ```
/// use publication_tree::dtag::normalize_dtag;
///
/// assert_eq!(normalize_dtag("Hello World"), "hello-world");
/// assert_eq!(normalize_dtag("_intro_section"), "intro-section");
/// assert_eq!(normalize_dtag("Q&amp;A: Part 1"), "qa-part-1");
/// ```
pub fn normalize_dtag(s: &str) -> String {
    let decoded = unescape_with(s, resolve_html5_entity).unwrap_or(Cow::Borrowed(s));
    let lowered = decoded.to_lowercase().replace('_', " ");

    lowered
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '-')
        .collect()
}

/// Normalize a candidate, treating an empty result as absent
pub fn normalized_candidate(s: Option<&str>) -> Option<String> {
    s.map(normalize_dtag).filter(|d| !d.is_empty())
}

/// Fallback d-tag: `{document_tag}-{context}-{counter}`
pub fn fallback_dtag(document_tag: &str, context: &str, counter: usize) -> String {
    format!("{document_tag}-{context}-{counter}")
}

/// Per-context counters for one decomposition pass
#[derive(Debug, Default)]
pub struct ContextCounters {
    counters: HashMap<String, usize>,
}

impl ContextCounters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current value for `context`, then bump it. Counters start at 0.
    pub fn next(&mut self, context: &str) -> usize {
        let counter = self.counters.entry(context.to_string()).or_insert(0);
        let current = *counter;
        *counter += 1;
        current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_dtag() {
        assert_eq!(normalize_dtag("Hello World"), "hello-world");
        assert_eq!(normalize_dtag("Chapter 1"), "chapter-1");
        assert_eq!(normalize_dtag("  spaces  "), "spaces");
        assert_eq!(normalize_dtag("UPPERCASE"), "uppercase");
        assert_eq!(normalize_dtag("Multiple   Spaces\tand tabs"), "multiple-spaces-and-tabs");
        assert_eq!(normalize_dtag("special!@#chars"), "specialchars");
        assert_eq!(normalize_dtag("snake_case_id"), "snake-case-id");
    }

    #[test]
    fn test_entities_decoded_before_stripping() {
        assert_eq!(normalize_dtag("Tom &amp; Jerry"), "tom--jerry");
        assert_eq!(normalize_dtag("It&#8217;s here"), "its-here");
        assert_eq!(normalize_dtag("&lt;tag&gt;"), "tag");
        // unknown entities leave the input as-is
        assert_eq!(normalize_dtag("&bogus; x"), "bogus-x");
    }

    #[test]
    fn test_empty_inputs() {
        assert_eq!(normalize_dtag(""), "");
        assert_eq!(normalized_candidate(Some("!!!")), None);
        assert_eq!(normalized_candidate(None), None);
        assert_eq!(normalized_candidate(Some("Intro")), Some("intro".to_string()));
    }

    #[test]
    fn test_unicode_is_stripped() {
        assert_eq!(normalize_dtag("Café"), "caf");
        assert_eq!(normalize_dtag("日本語 Title"), "-title");
    }

    #[test]
    fn test_counters() {
        let mut counters = ContextCounters::new();
        assert_eq!(counters.next("paragraph"), 0);
        assert_eq!(counters.next("paragraph"), 1);
        assert_eq!(counters.next("table"), 0);
        assert_eq!(counters.next("paragraph"), 2);
        assert_eq!(fallback_dtag("my-book", "table", 0), "my-book-table-0");
    }
}
