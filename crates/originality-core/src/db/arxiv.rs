use super::{IndexError, LiteratureIndex, collapse_newlines};
use crate::CandidatePaper;
use crate::rate_limit::check_rate_limit_response;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

const MAX_RESULTS: usize = 8;

pub struct Arxiv {
    pub base_url: String,
}

impl Default for Arxiv {
    fn default() -> Self {
        Self {
            base_url: "http://export.arxiv.org".to_string(),
        }
    }
}

impl LiteratureIndex for Arxiv {
    fn name(&self) -> &str {
        "arXiv"
    }

    fn search<'a>(
        &'a self,
        query: &'a str,
        client: &'a reqwest::Client,
        timeout: Duration,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<CandidatePaper>, IndexError>> + Send + 'a>> {
        Box::pin(async move {
            let url = format!(
                "{}/api/query?search_query=all:{}&max_results={}",
                self.base_url,
                urlencoding::encode(query),
                MAX_RESULTS
            );

            let resp = client.get(&url).timeout(timeout).send().await?;
            check_rate_limit_response(&resp)?;

            if !resp.status().is_success() {
                return Err(IndexError::Other(format!("HTTP {}", resp.status())));
            }

            let body = resp.text().await?;
            Ok(parse_arxiv_feed(&body, self.name()))
        })
    }
}

/// Parse an arXiv Atom feed into candidate papers.
///
/// Entries missing a title or summary are skipped. A missing id leaves the URL
/// empty. Malformed XML ends the parse, keeping the entries read so far.
fn parse_arxiv_feed(xml: &str, source: &str) -> Vec<CandidatePaper> {
    use quick_xml::Reader;
    use quick_xml::events::Event;

    #[derive(Clone, Copy, PartialEq)]
    enum Field {
        None,
        Title,
        Summary,
        Id,
    }

    let mut reader = Reader::from_str(xml);

    let mut in_entry = false;
    let mut field = Field::None;

    let mut title = String::new();
    let mut summary = String::new();
    let mut id = String::new();

    let mut papers = Vec::new();
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => match e.local_name().as_ref() {
                b"entry" => {
                    in_entry = true;
                    title.clear();
                    summary.clear();
                    id.clear();
                }
                b"title" if in_entry => field = Field::Title,
                b"summary" if in_entry => field = Field::Summary,
                b"id" if in_entry => field = Field::Id,
                _ => {}
            },
            Ok(Event::Text(ref e)) => {
                let text = e.unescape().unwrap_or_default();
                match field {
                    Field::Title => title.push_str(&text),
                    Field::Summary => summary.push_str(&text),
                    Field::Id => id.push_str(&text),
                    Field::None => {}
                }
            }
            Ok(Event::End(ref e)) => match e.local_name().as_ref() {
                b"entry" => {
                    let entry_title = collapse_newlines(&title);
                    let entry_summary = collapse_newlines(&summary);
                    let entry_id = id.trim();
                    if !entry_title.is_empty() && !entry_summary.is_empty() {
                        papers.push(CandidatePaper {
                            title: entry_title,
                            abstract_text: entry_summary,
                            source: source.to_string(),
                            url: entry_id.to_string(),
                        });
                    } else {
                        tracing::debug!(source, "skipping incomplete arXiv entry");
                    }
                    in_entry = false;
                    field = Field::None;
                    if papers.len() >= MAX_RESULTS {
                        break;
                    }
                }
                b"title" | b"summary" | b"id" => field = Field::None,
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => {
                tracing::debug!(source, error = %e, kept = papers.len(), "malformed arXiv feed");
                break;
            }
            _ => {}
        }
        buf.clear();
    }

    papers
}
