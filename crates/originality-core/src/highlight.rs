//! Rebuild body text as ordered, disjoint highlight segments for display.

use crate::{HighlightedSegment, MatchInfo, SegmentKind, SimilarityMatch};

/// Split `body_text` into unique, referenced and unreferenced segments.
///
/// Matches are placed in order of the first occurrence of their excerpt.
/// A single cursor walks forward through the text; each excerpt is searched
/// only after the cursor, so an excerpt that overlaps one already placed (or
/// does not occur at all) is skipped. Concatenating the segment texts always
/// yields `body_text`.
pub fn highlight_segments(body_text: &str, matches: &[SimilarityMatch]) -> Vec<HighlightedSegment> {
    if matches.is_empty() {
        return vec![unique(body_text)];
    }

    let mut ordered: Vec<&SimilarityMatch> = matches
        .iter()
        .filter(|m| !m.matched_text_user.is_empty())
        .collect();
    // Not found sorts first (None < Some); ties keep input order.
    ordered.sort_by_key(|m| body_text.find(m.matched_text_user.as_str()));

    let mut segments = Vec::new();
    let mut cursor = 0;

    for m in ordered {
        let excerpt = m.matched_text_user.as_str();
        let Some(offset) = body_text[cursor..].find(excerpt) else {
            continue;
        };
        let start = cursor + offset;
        if start > cursor {
            segments.push(unique(&body_text[cursor..start]));
        }
        let end = start + excerpt.len();
        segments.push(HighlightedSegment {
            text: body_text[start..end].to_string(),
            kind: if m.is_referenced {
                SegmentKind::Referenced
            } else {
                SegmentKind::Unreferenced
            },
            match_info: Some(MatchInfo::from(m)),
        });
        cursor = end;
    }

    if cursor < body_text.len() {
        segments.push(unique(&body_text[cursor..]));
    }
    segments
}

fn unique(text: &str) -> HighlightedSegment {
    HighlightedSegment {
        text: text.to_string(),
        kind: SegmentKind::Unique,
        match_info: None,
    }
}
