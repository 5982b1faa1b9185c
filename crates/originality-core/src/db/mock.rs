//! Mock literature index for testing.

use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use super::{IndexError, LiteratureIndex};
use crate::CandidatePaper;

/// A configurable mock response for [`MockIndex`].
#[derive(Clone, Debug)]
pub enum MockResponse {
    /// Return these papers.
    Papers(Vec<CandidatePaper>),
    /// Simulate a 429 rate-limit response.
    RateLimited { retry_after: Option<Duration> },
    /// Simulate a generic error.
    Error(String),
}

/// A hand-rolled mock implementing [`LiteratureIndex`] for tests.
///
/// Supports a fixed response or a sequence of responses (last one repeated),
/// optional per-call latency, and call counting. The last query seen is
/// recorded.
pub struct MockIndex {
    name: &'static str,
    responses: Mutex<Vec<MockResponse>>,
    fallback: MockResponse,
    delay: Option<Duration>,
    call_count: AtomicUsize,
    last_query: Mutex<Option<String>>,
}

impl MockIndex {
    /// Create a mock that always returns `response`.
    pub fn new(name: &'static str, response: MockResponse) -> Self {
        Self {
            name,
            responses: Mutex::new(Vec::new()),
            fallback: response,
            delay: None,
            call_count: AtomicUsize::new(0),
            last_query: Mutex::new(None),
        }
    }

    /// Create a mock returning `papers` on every call.
    pub fn with_papers(name: &'static str, papers: Vec<CandidatePaper>) -> Self {
        Self::new(name, MockResponse::Papers(papers))
    }

    /// Create a mock that returns responses in order, repeating the last one.
    pub fn with_sequence(name: &'static str, mut responses: Vec<MockResponse>) -> Self {
        let fallback = responses
            .last()
            .cloned()
            .unwrap_or(MockResponse::Papers(vec![]));
        responses.reverse();
        Self {
            name,
            responses: Mutex::new(responses),
            fallback,
            delay: None,
            call_count: AtomicUsize::new(0),
            last_query: Mutex::new(None),
        }
    }

    /// Set simulated network latency per call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// How many times `search()` has been called.
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    pub fn last_query(&self) -> Option<String> {
        self.last_query
            .lock()
            .map(|q| q.clone())
            .unwrap_or_default()
    }

    fn next_response(&self) -> MockResponse {
        match self.responses.lock() {
            Ok(mut seq) => seq.pop().unwrap_or_else(|| self.fallback.clone()),
            Err(_) => self.fallback.clone(),
        }
    }
}

impl LiteratureIndex for MockIndex {
    fn name(&self) -> &str {
        self.name
    }

    fn search<'a>(
        &'a self,
        query: &'a str,
        _client: &'a reqwest::Client,
        _timeout: Duration,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<CandidatePaper>, IndexError>> + Send + 'a>> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut last) = self.last_query.lock() {
            *last = Some(query.to_string());
        }
        let response = self.next_response();
        let delay = self.delay;

        Box::pin(async move {
            if let Some(d) = delay {
                tokio::time::sleep(d).await;
            }

            match response {
                MockResponse::Papers(papers) => Ok(papers),
                MockResponse::RateLimited { retry_after } => {
                    Err(IndexError::RateLimited { retry_after })
                }
                MockResponse::Error(msg) => Err(IndexError::Other(msg)),
            }
        })
    }
}

/// Convenience constructor for test papers.
pub fn paper(title: &str, abstract_text: &str, source: &str) -> CandidatePaper {
    CandidatePaper {
        title: title.to_string(),
        abstract_text: abstract_text.to_string(),
        source: source.to_string(),
        url: format!("https://example.org/{}", title.replace(' ', "-").to_lowercase()),
    }
}
