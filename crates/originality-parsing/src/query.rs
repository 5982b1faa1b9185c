use once_cell::sync::Lazy;
use regex::Regex;

use crate::text::truncate_chars;

/// Characters of body text considered when building the search query.
pub const QUERY_SOURCE_CHARS: usize = 500;

/// Maximum number of words in a search query.
pub const MAX_QUERY_WORDS: usize = 10;

/// Extract up to `n` significant words from `text`.
///
/// Punctuation is replaced by whitespace and words of three characters or
/// fewer are dropped. Order of appearance is preserved.
pub fn get_query_words(text: &str, n: usize) -> Vec<String> {
    static PUNCT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w\s]").unwrap());

    let cleaned = PUNCT_RE.replace_all(text, " ");
    cleaned
        .split_whitespace()
        .filter(|w| w.chars().count() > 3)
        .take(n)
        .map(String::from)
        .collect()
}

/// Build the single literature search query sent to every index.
///
/// Uses the first 500 characters of the body text and keeps the first 10
/// significant words, joined by spaces.
pub fn build_search_query(body_text: &str) -> String {
    get_query_words(truncate_chars(body_text, QUERY_SOURCE_CHARS), MAX_QUERY_WORDS).join(" ")
}
