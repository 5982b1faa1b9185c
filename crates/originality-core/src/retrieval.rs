//! Concurrent literature retrieval across every enabled index.

use std::sync::Arc;
use std::time::{Duration, Instant};

use originality_parsing::build_search_query;

use crate::db::{Arxiv, LiteratureIndex, SemanticScholar};
use crate::{CandidatePaper, Config, RateLimiters};

/// Candidate papers gathered for one analysis.
#[derive(Debug, Clone, Default)]
pub struct RetrievedLiterature {
    /// The query sent to every index; empty when retrieval was skipped.
    pub query: String,
    /// Papers in index order, each index's results in the order it returned them.
    pub papers: Vec<CandidatePaper>,
}

/// Build the default set of indices, skipping any disabled in `config`.
pub fn build_indices(config: &Config) -> Vec<Arc<dyn LiteratureIndex>> {
    let all: Vec<Arc<dyn LiteratureIndex>> = vec![
        Arc::new(SemanticScholar::new(config.s2_api_key.clone())),
        Arc::new(Arxiv::default()),
    ];
    all.into_iter()
        .filter(|idx| config.is_index_enabled(idx.name()))
        .collect()
}

pub struct LiteratureRetriever {
    indices: Vec<Arc<dyn LiteratureIndex>>,
    client: reqwest::Client,
    timeout: Duration,
    rate_limiters: Arc<RateLimiters>,
}

impl LiteratureRetriever {
    pub fn new(
        indices: Vec<Arc<dyn LiteratureIndex>>,
        client: reqwest::Client,
        timeout: Duration,
        rate_limiters: Arc<RateLimiters>,
    ) -> Self {
        Self {
            indices,
            client,
            timeout,
            rate_limiters,
        }
    }

    pub fn index_names(&self) -> Vec<String> {
        self.indices.iter().map(|i| i.name().to_string()).collect()
    }

    /// Query every index concurrently with one query built from the body text.
    ///
    /// Each index is tried once. A failing index is logged and contributes
    /// nothing; retrieval as a whole never fails.
    pub async fn retrieve(&self, body_text: &str) -> RetrievedLiterature {
        let query = build_search_query(body_text);
        if query.is_empty() {
            tracing::info!("empty search query, skipping literature retrieval");
            return RetrievedLiterature::default();
        }

        let mut join_set = tokio::task::JoinSet::new();

        for (position, index) in self.indices.iter().enumerate() {
            let index = Arc::clone(index);
            let query = query.clone();
            let client = self.client.clone();
            let timeout = self.timeout;
            let limiters = Arc::clone(&self.rate_limiters);

            join_set.spawn(async move {
                limiters.acquire(index.name()).await;
                let start = Instant::now();
                let result = index.search(&query, &client, timeout).await;
                (position, index.name().to_string(), result, start.elapsed())
            });
        }

        let mut per_index: Vec<(usize, Vec<CandidatePaper>)> = Vec::new();

        while let Some(joined) = join_set.join_next().await {
            let (position, name, result, elapsed) = match joined {
                Ok(r) => r,
                Err(e) => {
                    tracing::warn!(error = %e, "literature index task failed");
                    continue;
                }
            };

            match result {
                Ok(papers) => {
                    tracing::debug!(
                        index = %name,
                        count = papers.len(),
                        elapsed_ms = elapsed.as_millis() as u64,
                        "index search complete"
                    );
                    per_index.push((position, papers));
                }
                Err(e) => {
                    tracing::warn!(index = %name, error = %e, "index search failed, treating as no results");
                }
            }
        }

        per_index.sort_by_key(|(position, _)| *position);
        let papers: Vec<CandidatePaper> = per_index
            .into_iter()
            .flat_map(|(_, papers)| papers)
            .filter(|p| !p.title.trim().is_empty() && !p.abstract_text.trim().is_empty())
            .collect();

        tracing::info!(query = %query, papers = papers.len(), "literature retrieval complete");

        RetrievedLiterature { query, papers }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::mock::{MockIndex, MockResponse, paper};

    fn retriever(indices: Vec<Arc<dyn LiteratureIndex>>) -> LiteratureRetriever {
        LiteratureRetriever::new(
            indices,
            reqwest::Client::new(),
            Duration::from_secs(5),
            Arc::new(RateLimiters::default()),
        )
    }

    #[tokio::test]
    async fn empty_query_skips_all_indices() {
        let index = Arc::new(MockIndex::with_papers("A", vec![paper("T", "A", "A")]));
        let r = retriever(vec![index.clone()]);
        let out = r.retrieve("a an the of to ... !!").await;
        assert!(out.query.is_empty());
        assert!(out.papers.is_empty());
        assert_eq!(index.call_count(), 0);
    }

    #[tokio::test]
    async fn same_query_sent_to_every_index() {
        let a = Arc::new(MockIndex::with_papers("A", vec![]));
        let b = Arc::new(MockIndex::with_papers("B", vec![]));
        let r = retriever(vec![a.clone(), b.clone()]);
        let out = r.retrieve("Graph neural networks for molecular property prediction").await;
        assert_eq!(out.query, "Graph neural networks molecular property prediction");
        assert_eq!(a.last_query().as_deref(), Some(out.query.as_str()));
        assert_eq!(b.last_query().as_deref(), Some(out.query.as_str()));
    }

    #[tokio::test]
    async fn failing_index_contributes_nothing() {
        let ok = Arc::new(MockIndex::with_papers("A", vec![paper("Kept", "Abs", "A")]));
        let failing = Arc::new(MockIndex::new("B", MockResponse::Error("boom".into())));
        let limited = Arc::new(MockIndex::new(
            "C",
            MockResponse::RateLimited { retry_after: None },
        ));
        let r = retriever(vec![ok, failing.clone(), limited.clone()]);
        let out = r.retrieve("Something meaningful about proteins").await;
        assert_eq!(out.papers.len(), 1);
        assert_eq!(out.papers[0].title, "Kept");
        assert_eq!(failing.call_count(), 1);
        assert_eq!(limited.call_count(), 1);
    }

    #[tokio::test]
    async fn results_keep_index_order_despite_latency() {
        let slow = Arc::new(
            MockIndex::with_papers("Slow", vec![paper("First", "x", "Slow")])
                .with_delay(Duration::from_millis(50)),
        );
        let fast = Arc::new(MockIndex::with_papers("Fast", vec![paper("Second", "y", "Fast")]));
        let r = retriever(vec![slow, fast]);
        let out = r.retrieve("ordering across concurrent indices").await;
        let titles: Vec<_> = out.papers.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, vec!["First", "Second"]);
    }

    #[tokio::test]
    async fn duplicates_across_sources_are_kept() {
        let a = Arc::new(MockIndex::with_papers("A", vec![paper("Same", "x", "A")]));
        let b = Arc::new(MockIndex::with_papers("B", vec![paper("Same", "x", "B")]));
        let out = retriever(vec![a, b]).retrieve("duplicate papers across sources").await;
        assert_eq!(out.papers.len(), 2);
    }

    #[test]
    fn disabled_indices_are_not_built() {
        let config = Config {
            disabled_indices: vec!["semantic scholar".into()],
            ..Config::default()
        };
        let indices = build_indices(&config);
        let names: Vec<_> = indices.iter().map(|i| i.name().to_string()).collect();
        assert_eq!(names, vec!["arXiv"]);
    }
}
