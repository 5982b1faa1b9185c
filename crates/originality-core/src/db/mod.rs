//! Literature index trait and implementations for querying academic indices.

pub mod arxiv;
pub mod mock;
pub mod semantic_scholar;

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use crate::CandidatePaper;

pub use arxiv::Arxiv;
pub use semantic_scholar::SemanticScholar;

/// Error type for index queries, distinguishing rate limiting from other errors.
#[derive(Debug, Clone)]
pub enum IndexError {
    /// Server returned 429 Too Many Requests.
    RateLimited { retry_after: Option<Duration> },
    /// Any other error.
    Other(String),
}

impl std::fmt::Display for IndexError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IndexError::RateLimited { retry_after } => match retry_after {
                Some(d) => write!(f, "Rate limited (429), retry after {:?}", d),
                None => write!(f, "Rate limited (429)"),
            },
            IndexError::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for IndexError {}

impl From<reqwest::Error> for IndexError {
    fn from(e: reqwest::Error) -> Self {
        IndexError::Other(e.to_string())
    }
}

/// An external academic index that can be searched for candidate papers.
pub trait LiteratureIndex: Send + Sync {
    /// The canonical name of this index, also used as the paper `source`.
    fn name(&self) -> &str;

    /// Search the index. Only well-formed records (non-empty title and
    /// abstract) are returned.
    fn search<'a>(
        &'a self,
        query: &'a str,
        client: &'a reqwest::Client,
        timeout: Duration,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<CandidatePaper>, IndexError>> + Send + 'a>>;
}

/// Collapse runs of line breaks (and the whitespace around them) into single
/// spaces and trim the ends.
pub(crate) fn collapse_newlines(s: &str) -> String {
    s.split('\n')
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
