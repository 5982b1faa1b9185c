//! Decide whether a matched paper is already cited in the references.

use crate::SimilarityMatch;
use crate::classifier::ClassifiedPassage;

/// Title tokens must be longer than this to count.
const MIN_TOKEN_CHARS: usize = 3;
/// Never require more than this many tokens to match.
const MAX_REQUIRED_TOKENS: usize = 3;

/// `true` if enough significant title words occur in the references text.
///
/// Comparison is case-insensitive substring containment. A title is cited
/// when at least `min(3, ceil(0.5 * tokens))` of its words longer than three
/// characters appear. Empty references are never a citation. A title with no
/// significant words needs zero hits, so it counts as cited whenever
/// references exist.
pub fn is_referenced(paper_title: &str, references_text: &str) -> bool {
    if references_text.trim().is_empty() {
        return false;
    }

    let refs = references_text.to_lowercase();
    let title = paper_title.to_lowercase();
    let tokens: Vec<&str> = title
        .split_whitespace()
        .filter(|w| w.chars().count() > MIN_TOKEN_CHARS)
        .collect();

    let hits = tokens.iter().filter(|t| refs.contains(*t)).count();
    let required = MAX_REQUIRED_TOKENS.min(tokens.len().div_ceil(2));
    hits >= required
}

/// Attach attribution to each classified passage, producing final matches.
pub fn attribute(passages: Vec<ClassifiedPassage>, references_text: &str) -> Vec<SimilarityMatch> {
    passages
        .into_iter()
        .map(|p| {
            let is_referenced = is_referenced(&p.paper.title, references_text);
            SimilarityMatch {
                paper_title: p.paper.title,
                paper_source: p.paper.source,
                paper_url: p.paper.url,
                matched_text_user: p.matched_text_user,
                matched_text_paper: p.matched_text_paper,
                similarity_percentage: p.similarity_percentage,
                is_referenced,
                section_name: p.section_name,
            }
        })
        .collect()
}
