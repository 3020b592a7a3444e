// src/ingest/mod.rs
pub mod providers;
pub mod trends;
pub mod types;

use once_cell::sync::OnceCell;
use regex::Regex;

pub use types::{FeedFetcher, NewsItem, TrendSource};

/// Longest title/summary kept from a feed item, in chars.
const MAX_TEXT_CHARS: usize = 1500;

/// Normalize feed text: decode entities, strip tags, fold whitespace, cap length.
pub fn normalize_text(s: &str) -> String {
    // 1) HTML entity decode
    let mut out = html_escape::decode_html_entities(s).to_string();

    // 2) Strip HTML tags
    static RE_TAGS: OnceCell<Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| Regex::new(r"(?is)</?[^>]+>").expect("static regex"));
    out = re_tags.replace_all(&out, "").to_string();

    // 3) Collapse whitespace (incl. NBSP and ideographic space)
    static RE_WS: OnceCell<Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| Regex::new(r"[\s\u{00A0}\u{3000}]+").expect("static regex"));
    out = re_ws.replace_all(&out, " ").trim().to_string();

    // 4) Length cap
    if out.chars().count() > MAX_TEXT_CHARS {
        out = out.chars().take(MAX_TEXT_CHARS).collect();
    }

    out
}

/// Candidates whose identifier is not already in `history`, in candidate order.
/// Comparison is exact string equality.
pub fn filter_unseen(candidates: Vec<NewsItem>, history: &[String]) -> Vec<NewsItem> {
    use std::collections::HashSet;
    let seen: HashSet<&str> = history.iter().map(String::as_str).collect();
    candidates
        .into_iter()
        .filter(|c| !seen.contains(c.identifier.as_str()))
        .collect()
}
