//! Passage-level similarity classification against candidate papers.

use originality_parsing::truncate_chars;
use serde_json::{Value, json};

use crate::CandidatePaper;
use crate::llm::{JsonShape, ModelError, ModelRequest, TextModel, generate_json};

/// Characters of body text sent for comparison.
pub const BODY_CHARS: usize = 3000;
/// Maximum candidates compared in one request.
pub const MAX_PAPERS: usize = 12;
/// Characters of each abstract sent for comparison.
pub const ABSTRACT_CHARS: usize = 500;
/// Proposals at or below this similarity are not matches.
pub const MATCH_THRESHOLD: f64 = 25.0;

const TEMPERATURE: f32 = 0.2;

const SYSTEM_PROMPT: &str = "You are an academic similarity analyzer. Compare the user's research text against the provided academic papers.

For each paper where you find conceptual or textual similarity:
1. Identify the similar portion from the user's text (quote exactly)
2. Identify the matching concept from the paper abstract
3. Estimate similarity percentage (0-100)
4. Mark the section of the user's text (introduction, methodology, results, discussion)

Return ONLY a valid JSON array of objects containing:
- paperIndex: index of the matched paper (0-based)
- matchedTextUser: exact quote from user text (max 100 chars)
- matchedTextPaper: matching concept from paper (max 100 chars)
- similarityPercentage: number 0-100
- sectionName: string

Only include matches with similarity > 25%. Return an empty array [] if there are no significant matches.";

/// A validated similarity proposal, not yet checked for attribution.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedPassage {
    pub paper: CandidatePaper,
    pub matched_text_user: String,
    pub matched_text_paper: String,
    pub similarity_percentage: f64,
    pub section_name: String,
}

/// Compare the body text with up to [`MAX_PAPERS`] candidates in one request.
///
/// Returns only validated proposals above [`MATCH_THRESHOLD`]. Any failure of
/// the model call yields no passages.
pub async fn classify(
    model: &dyn TextModel,
    body_text: &str,
    papers: &[CandidatePaper],
) -> Vec<ClassifiedPassage> {
    if papers.is_empty() {
        return vec![];
    }
    let supplied = &papers[..papers.len().min(MAX_PAPERS)];

    let payload = json!({
        "userText": truncate_chars(body_text, BODY_CHARS),
        "papers": supplied
            .iter()
            .enumerate()
            .map(|(i, p)| json!({
                "index": i,
                "title": p.title,
                "abstract": truncate_chars(&p.abstract_text, ABSTRACT_CHARS),
            }))
            .collect::<Vec<_>>(),
    });

    let request = ModelRequest::new(SYSTEM_PROMPT, payload.to_string(), TEMPERATURE);

    let proposals = match generate_json(model, &request, JsonShape::Array).await {
        Ok(Value::Array(items)) => items,
        Ok(_) => vec![],
        Err(ModelError::NotConfigured) => {
            tracing::info!("text model not configured, skipping similarity classification");
            return vec![];
        }
        Err(e) => {
            tracing::warn!(stage = "classification", error = %e, "similarity classification failed");
            return vec![];
        }
    };

    let total = proposals.len();
    let passages: Vec<ClassifiedPassage> = proposals
        .iter()
        .filter_map(|p| validate_proposal(p, supplied))
        .collect();

    tracing::info!(
        proposals = total,
        matches = passages.len(),
        "similarity classification complete"
    );
    passages
}

/// Turn one raw proposal into a passage, or reject it.
fn validate_proposal(proposal: &Value, supplied: &[CandidatePaper]) -> Option<ClassifiedPassage> {
    let Some(index) = proposal["paperIndex"].as_u64() else {
        tracing::debug!(?proposal, "rejecting proposal without integer paperIndex");
        return None;
    };
    let Some(paper) = supplied.get(index as usize) else {
        tracing::debug!(index, supplied = supplied.len(), "rejecting out-of-range paperIndex");
        return None;
    };

    let matched_text_user = proposal["matchedTextUser"].as_str().unwrap_or("");
    if matched_text_user.trim().is_empty() {
        tracing::debug!(index, "rejecting proposal without matchedTextUser");
        return None;
    }
    let Some(matched_text_paper) = proposal["matchedTextPaper"].as_str() else {
        tracing::debug!(index, "rejecting proposal without matchedTextPaper");
        return None;
    };
    let Some(similarity) = proposal["similarityPercentage"].as_f64() else {
        tracing::debug!(index, "rejecting proposal without similarityPercentage");
        return None;
    };

    let similarity = similarity.clamp(0.0, 100.0);
    if similarity <= MATCH_THRESHOLD {
        return None;
    }

    let section_name = proposal["sectionName"]
        .as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or("Unknown");

    Some(ClassifiedPassage {
        paper: paper.clone(),
        matched_text_user: matched_text_user.to_string(),
        matched_text_paper: matched_text_paper.to_string(),
        similarity_percentage: similarity,
        section_name: section_name.to_string(),
    })
}
