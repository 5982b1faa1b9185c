use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod attribution;
pub mod classifier;
pub mod config_file;
pub mod db;
pub mod guidance;
pub mod highlight;
pub mod insights;
pub mod llm;
pub mod pipeline;
pub mod poll;
pub mod rate_limit;
pub mod retrieval;
pub mod scoring;
pub mod store;

// Re-export for convenience
pub use originality_parsing::{DetectionStatus, SegmentedDocument, split_references};
pub use pipeline::{AnalysisOutcome, AnalysisTrigger, Pipeline, process_trigger};
pub use rate_limit::RateLimiters;
pub use store::{AnalysisRecord, AnalysisStore, NewDocument, SqliteStore};

/// A normalized literature record retrieved from an external index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidatePaper {
    pub title: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    /// Name of the index this record came from (e.g. "arXiv").
    pub source: String,
    pub url: String,
}

/// A passage of the body text found similar to a candidate paper.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimilarityMatch {
    pub paper_title: String,
    pub paper_source: String,
    pub paper_url: String,
    /// Verbatim excerpt expected to occur in the body text.
    pub matched_text_user: String,
    /// Paraphrase of the paper content the excerpt overlaps with.
    pub matched_text_paper: String,
    /// Always within `0.0..=100.0`.
    pub similarity_percentage: f64,
    pub is_referenced: bool,
    pub section_name: String,
}

/// Three-tier originality classification derived from the overall score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UniquenessLevel {
    High,
    Medium,
    Low,
}

impl UniquenessLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "high" => Some(Self::High),
            "medium" => Some(Self::Medium),
            "low" => Some(Self::Low),
            _ => None,
        }
    }
}

/// Lifecycle of an analysis record.
///
/// `Pending -> Processing -> Completed | Failed`. Terminal states never change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl AnalysisStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "processing" => Some(Self::Processing),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    pub fn can_transition_to(&self, next: AnalysisStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Processing)
                | (Self::Processing, Self::Completed)
                | (Self::Processing, Self::Failed)
        )
    }
}

/// How the document was submitted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputType {
    #[default]
    Text,
    Pdf,
}

impl InputType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Pdf => "pdf",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "text" => Some(Self::Text),
            "pdf" => Some(Self::Pdf),
            _ => None,
        }
    }
}

/// Client-reported outcome of PDF text extraction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PdfExtractionStatus {
    Success,
    Partial,
    Failed,
    #[default]
    NotApplicable,
}

impl PdfExtractionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Partial => "partial",
            Self::Failed => "failed",
            Self::NotApplicable => "not_applicable",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "success" => Some(Self::Success),
            "partial" => Some(Self::Partial),
            "failed" => Some(Self::Failed),
            "not_applicable" => Some(Self::NotApplicable),
            _ => None,
        }
    }
}

/// Neutral overview of the submitted research.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResearchOverview {
    pub problem_summary: String,
    pub methodology: String,
    pub contribution: String,
    pub domain: String,
}

/// What appears novel about the submitted research.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoveltyAnalysis {
    pub novel_aspects: Vec<String>,
    pub contrast_with_existing: String,
    pub summary: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assumption {
    pub statement: String,
    pub category: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentifiedAssumptions {
    pub assumptions: Vec<Assumption>,
}

/// Kind of guidance suggestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionKind {
    Positive,
    Citation,
    Rewrite,
}

impl SuggestionKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "positive" => Some(Self::Positive),
            "citation" => Some(Self::Citation),
            "rewrite" => Some(Self::Rewrite),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuidanceSuggestion {
    #[serde(rename = "type")]
    pub kind: SuggestionKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    pub message: String,
}

/// Highlight category of a rendered text segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentKind {
    Unique,
    Referenced,
    Unreferenced,
}

/// Copy of the match details shown alongside a highlighted segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchInfo {
    pub paper_title: String,
    pub paper_source: String,
    pub paper_url: String,
    pub similarity_percentage: f64,
    pub is_referenced: bool,
}

impl From<&SimilarityMatch> for MatchInfo {
    fn from(m: &SimilarityMatch) -> Self {
        Self {
            paper_title: m.paper_title.clone(),
            paper_source: m.paper_source.clone(),
            paper_url: m.paper_url.clone(),
            similarity_percentage: m.similarity_percentage,
            is_referenced: m.is_referenced,
        }
    }
}

/// A contiguous slice of body text tagged for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HighlightedSegment {
    pub text: String,
    #[serde(rename = "type")]
    pub kind: SegmentKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub match_info: Option<MatchInfo>,
}

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("storage error: {0}")]
    Store(#[from] rusqlite::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("validation error: {0}")]
    Validation(String),
    #[error("analysis {0} not found")]
    NotFound(i64),
    #[error("invalid status transition for analysis {id}: {from} -> {to}")]
    InvalidTransition {
        id: i64,
        from: &'static str,
        to: &'static str,
    },
    #[error("pipeline did not finish within {0:?}")]
    Timeout(Duration),
}

/// Configuration for the analysis pipeline.
#[derive(Clone)]
pub struct Config {
    /// API key for the text-understanding gateway. `None` disables every
    /// model-backed stage (they fall back to neutral results).
    pub model_api_key: Option<String>,
    /// Base URL of an OpenAI-compatible chat completions API.
    pub model_base_url: String,
    pub model_name: String,
    pub model_timeout_secs: u64,
    pub s2_api_key: Option<String>,
    pub disabled_indices: Vec<String>,
    pub index_timeout_secs: u64,
    /// Upper bound for a whole pipeline run; exceeding it fails the analysis.
    pub pipeline_timeout_secs: u64,
    pub poll_interval_ms: u64,
    /// Path to the SQLite analysis store. `None` keeps analyses in memory.
    pub store_path: Option<PathBuf>,
    pub rate_limiters: Arc<RateLimiters>,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("model_api_key", &self.model_api_key.as_ref().map(|_| "***"))
            .field("model_base_url", &self.model_base_url)
            .field("model_name", &self.model_name)
            .field("model_timeout_secs", &self.model_timeout_secs)
            .field("s2_api_key", &self.s2_api_key.as_ref().map(|_| "***"))
            .field("disabled_indices", &self.disabled_indices)
            .field("index_timeout_secs", &self.index_timeout_secs)
            .field("pipeline_timeout_secs", &self.pipeline_timeout_secs)
            .field("poll_interval_ms", &self.poll_interval_ms)
            .field("store_path", &self.store_path)
            .finish()
    }
}

pub const DEFAULT_MODEL_BASE_URL: &str = "https://ai.gateway.lovable.dev/v1";
pub const DEFAULT_MODEL_NAME: &str = "google/gemini-3-flash-preview";

impl Default for Config {
    fn default() -> Self {
        Self {
            model_api_key: None,
            model_base_url: DEFAULT_MODEL_BASE_URL.to_string(),
            model_name: DEFAULT_MODEL_NAME.to_string(),
            model_timeout_secs: 60,
            s2_api_key: None,
            disabled_indices: vec![],
            index_timeout_secs: 10,
            pipeline_timeout_secs: 300,
            poll_interval_ms: 2000,
            store_path: None,
            rate_limiters: Arc::new(RateLimiters::default()),
        }
    }
}

impl Config {
    pub fn index_timeout(&self) -> Duration {
        Duration::from_secs(self.index_timeout_secs)
    }

    pub fn model_timeout(&self) -> Duration {
        Duration::from_secs(self.model_timeout_secs)
    }

    pub fn pipeline_timeout(&self) -> Duration {
        Duration::from_secs(self.pipeline_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn is_index_enabled(&self, name: &str) -> bool {
        !self
            .disabled_indices
            .iter()
            .any(|d| d.eq_ignore_ascii_case(name))
    }
}
