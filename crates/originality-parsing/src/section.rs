use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::config::SegmenterConfig;
use crate::text::char_byte_offset;

/// Outcome of reference section detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionStatus {
    Success,
    Failed,
}

impl DetectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "success" => Some(Self::Success),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// A document split into body text and its references list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentedDocument {
    pub body_text: String,
    pub references_text: String,
    pub detection_status: DetectionStatus,
}

/// Split a document into body and references.
///
/// 1. The first standalone heading line (References, Bibliography, Works
///    Cited, Literature Cited; case-insensitive) splits the document. The
///    references part starts at the heading.
/// 2. Otherwise the trailing 20% is treated as references if it carries a
///    numeric citation marker (`[1]`, `(1)`, or a line like `1. Smith`).
/// 3. Otherwise the whole text is body and detection fails.
pub fn split_references(text: &str) -> SegmentedDocument {
    split_references_with_config(text, &SegmenterConfig::default())
}

/// Config-aware version of [`split_references`].
pub fn split_references_with_config(text: &str, config: &SegmenterConfig) -> SegmentedDocument {
    static HEADER_RE: Lazy<Regex> = Lazy::new(|| {
        Regex::new(
            r"(?i)\n\s*(?:References|Bibliography|Works[ \t]+Cited|Literature[ \t]+Cited)\s*\n",
        )
        .unwrap()
    });

    let header_re = config.section_header_re.as_ref().unwrap_or(&HEADER_RE);

    // Only the first heading counts, even if "References" shows up mid-body.
    if let Some(m) = header_re.find(text) {
        return SegmentedDocument {
            body_text: text[..m.start()].trim().to_string(),
            references_text: text[m.start()..].trim().to_string(),
            detection_status: DetectionStatus::Success,
        };
    }

    static MARKER_RE: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"(?m)\[\d{1,3}\]|\(\d{1,3}\)|^[ \t]*\d+\.[ \t]+[A-Z]").unwrap()
    });

    let marker_re = config.citation_marker_re.as_ref().unwrap_or(&MARKER_RE);

    // The tail window is measured in characters, not bytes.
    let char_count = text.chars().count();
    let cutoff_chars = (char_count as f64 * (1.0 - config.tail_fraction)) as usize;
    let cutoff = char_byte_offset(text, cutoff_chars);
    let tail = &text[cutoff..];

    if marker_re.is_match(tail) {
        return SegmentedDocument {
            body_text: text[..cutoff].trim().to_string(),
            references_text: tail.trim().to_string(),
            detection_status: DetectionStatus::Success,
        };
    }

    SegmentedDocument {
        body_text: text.to_string(),
        references_text: String::new(),
        detection_status: DetectionStatus::Failed,
    }
}
