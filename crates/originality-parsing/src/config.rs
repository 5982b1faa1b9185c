use regex::Regex;

use crate::ParsingError;

/// Configuration for reference section detection.
///
/// Regex fields are `Option<Regex>`: `None` means "use the built-in default".
/// Use [`SegmenterConfigBuilder`] to construct with string patterns.
#[derive(Debug, Clone)]
pub struct SegmenterConfig {
    /// Regex locating a standalone references heading line.
    pub(crate) section_header_re: Option<Regex>,
    /// Regex for citation markers that identify a trailing references slice.
    pub(crate) citation_marker_re: Option<Regex>,
    /// Fraction of the document (from the end) inspected by the positional fallback.
    pub(crate) tail_fraction: f64,
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            section_header_re: None,
            citation_marker_re: None,
            tail_fraction: 0.2,
        }
    }
}

impl SegmenterConfig {
    pub fn tail_fraction(&self) -> f64 {
        self.tail_fraction
    }
}

/// Builder for [`SegmenterConfig`].
///
/// Patterns are compiled in [`build()`](Self::build), which fails fast on
/// the first invalid one.
#[derive(Debug, Clone, Default)]
pub struct SegmenterConfigBuilder {
    section_header_re: Option<String>,
    citation_marker_re: Option<String>,
    tail_fraction: Option<f64>,
}

impl SegmenterConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn section_header_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.section_header_re = Some(pattern.into());
        self
    }

    pub fn citation_marker_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.citation_marker_re = Some(pattern.into());
        self
    }

    pub fn tail_fraction(mut self, fraction: f64) -> Self {
        self.tail_fraction = Some(fraction);
        self
    }

    pub fn build(self) -> Result<SegmenterConfig, ParsingError> {
        let tail_fraction = self.tail_fraction.unwrap_or(0.2);
        if !(tail_fraction > 0.0 && tail_fraction < 1.0) {
            return Err(ParsingError::TailFraction(tail_fraction));
        }

        Ok(SegmenterConfig {
            section_header_re: self
                .section_header_re
                .map(|p| Regex::new(&p))
                .transpose()?,
            citation_marker_re: self
                .citation_marker_re
                .map(|p| Regex::new(&p))
                .transpose()?,
            tail_fraction,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_builder_matches_default_config() {
        let config = SegmenterConfigBuilder::new().build().unwrap();
        assert!(config.section_header_re.is_none());
        assert!(config.citation_marker_re.is_none());
        assert_eq!(config.tail_fraction(), 0.2);
    }

    #[test]
    fn invalid_pattern_fails_fast() {
        let err = SegmenterConfigBuilder::new()
            .section_header_pattern("(unclosed")
            .build()
            .unwrap_err();
        assert!(matches!(err, ParsingError::Pattern(_)));
    }

    #[test]
    fn tail_fraction_out_of_range_rejected() {
        for bad in [0.0, 1.0, -0.5, 1.5] {
            let err = SegmenterConfigBuilder::new()
                .tail_fraction(bad)
                .build()
                .unwrap_err();
            assert!(matches!(err, ParsingError::TailFraction(_)));
        }
    }
}
