use super::{IndexError, LiteratureIndex};
use crate::CandidatePaper;
use crate::rate_limit::check_rate_limit_response;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

const MAX_RESULTS: usize = 10;

pub struct SemanticScholar {
    pub api_key: Option<String>,
    pub base_url: String,
}

impl Default for SemanticScholar {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.semanticscholar.org".to_string(),
        }
    }
}

impl SemanticScholar {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            api_key,
            ..Self::default()
        }
    }
}

impl LiteratureIndex for SemanticScholar {
    fn name(&self) -> &str {
        "Semantic Scholar"
    }

    fn search<'a>(
        &'a self,
        query: &'a str,
        client: &'a reqwest::Client,
        timeout: Duration,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<CandidatePaper>, IndexError>> + Send + 'a>> {
        Box::pin(async move {
            let url = format!(
                "{}/graph/v1/paper/search?query={}&limit={}&fields=title,abstract,url,authors,year",
                self.base_url,
                urlencoding::encode(query),
                MAX_RESULTS
            );

            let mut req = client
                .get(&url)
                .header("Accept", "application/json")
                .timeout(timeout);

            if let Some(ref key) = self.api_key {
                req = req.header("x-api-key", key);
            }

            let resp = req.send().await?;
            check_rate_limit_response(&resp)?;

            let status = resp.status();
            if !status.is_success() {
                return Err(IndexError::Other(format!("HTTP {}", status)));
            }

            let data: serde_json::Value = resp.json().await?;
            Ok(parse_search_response(&data, self.name()))
        })
    }
}

/// Normalize a graph search response. Items without a title or abstract are
/// dropped.
fn parse_search_response(data: &serde_json::Value, source: &str) -> Vec<CandidatePaper> {
    let Some(items) = data["data"].as_array() else {
        return vec![];
    };

    items
        .iter()
        .take(MAX_RESULTS)
        .filter_map(|item| {
            let title = item["title"].as_str().unwrap_or("").trim();
            let abstract_text = item["abstract"].as_str().unwrap_or("").trim();
            if title.is_empty() || abstract_text.is_empty() {
                return None;
            }

            let url = match item["url"].as_str().filter(|u| !u.is_empty()) {
                Some(u) => u.to_string(),
                None => format!(
                    "https://www.semanticscholar.org/paper/{}",
                    item["paperId"].as_str().unwrap_or("")
                ),
            };

            Some(CandidatePaper {
                title: title.to_string(),
                abstract_text: abstract_text.to_string(),
                source: source.to_string(),
                url,
            })
        })
        .collect()
}
