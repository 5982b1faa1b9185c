use thiserror::Error;

pub mod config;
pub mod query;
pub mod section;
pub mod text;

pub use config::{SegmenterConfig, SegmenterConfigBuilder};
pub use query::{build_search_query, get_query_words};
pub use section::{
    DetectionStatus, SegmentedDocument, split_references, split_references_with_config,
};
pub use text::truncate_chars;

#[derive(Error, Debug)]
pub enum ParsingError {
    #[error("invalid pattern: {0}")]
    Pattern(#[from] regex::Error),
    #[error("tail fraction must be in (0.0, 1.0), got {0}")]
    TailFraction(f64),
}
