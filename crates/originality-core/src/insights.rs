//! Research overview, novelty analysis and assumption identification.
//!
//! Each extraction is one independent model call. Failures never propagate:
//! the caller always gets a neutral value that says what went wrong.

use originality_parsing::truncate_chars;
use serde::Deserialize;

use crate::llm::{JsonShape, ModelError, ModelRequest, TextModel, generate_json};
use crate::{Assumption, IdentifiedAssumptions, NoveltyAnalysis, ResearchOverview};

const OVERVIEW_CHARS: usize = 4000;
const NOVELTY_CHARS: usize = 5000;
const ASSUMPTION_CHARS: usize = 5000;
const MAX_NOVEL_ASPECTS: usize = 5;
const MAX_ASSUMPTIONS: usize = 8;
const TEMPERATURE: f32 = 0.3;

/// Assumption categories the model may use; anything else becomes "Other".
pub const ASSUMPTION_CATEGORIES: &[&str] = &[
    "Data Availability",
    "System Reliability",
    "Scalability",
    "Performance",
    "Environmental Conditions",
    "Generalization",
    "Resource Requirements",
    "Other",
];

const OVERVIEW_PROMPT: &str = "You are an academic research analyst. Extract a neutral overview from the provided research text. Return ONLY valid JSON with these exact keys:
- problem_summary: A 1-2 sentence summary of the research problem
- methodology: A brief description of the approach or methods
- contribution: The intended contribution or impact
- domain: The research domain/field classification

Be factual and derive everything from the text. Do not speculate.";

const NOVELTY_PROMPT: &str = "You are an academic research analyst specializing in identifying novel contributions. Analyze the provided research text and identify what appears to be novel or unique about the proposed solution or approach.

Return ONLY valid JSON with these exact keys:
- novel_aspects: An array of strings, each describing a specific novel aspect identified in the work (max 5 items)
- contrast_with_existing: A 1-2 sentence description of how this work differs from commonly existing approaches
- summary: A concise 2-3 sentence summary of the novelty of the proposed solution

Derive everything only from the provided text. Use neutral, academic language. If there is not enough content to identify novelty, return empty arrays and acknowledge the limitation.";

const ASSUMPTIONS_PROMPT: &str = "You are an academic research analyst specializing in identifying assumptions in research work. Analyze the provided text and identify statements that assume conditions, availability of data, or system behavior, such as dataset availability, reliability of external services, scalability or generalization claims, performance expectations, and environmental conditions.

Return ONLY valid JSON with this structure:
{\"assumptions\": [{\"statement\": \"This work assumes...\", \"category\": \"Data Availability\"}]}

Categories must be one of: \"Data Availability\", \"System Reliability\", \"Scalability\", \"Performance\", \"Environmental Conditions\", \"Generalization\", \"Resource Requirements\", \"Other\".

Present assumptions as neutral observations, not criticism. Derive only from the provided text. Return at most 8 assumptions, or an empty array if none are clear.";

pub fn overview_not_configured() -> ResearchOverview {
    ResearchOverview {
        problem_summary: "Unable to generate overview - API key not configured".into(),
        methodology: "N/A".into(),
        contribution: "N/A".into(),
        domain: "Unknown".into(),
    }
}

pub fn overview_unavailable() -> ResearchOverview {
    ResearchOverview {
        problem_summary: "Overview generation unavailable".into(),
        methodology: "Please review the text manually".into(),
        contribution: "Manual assessment required".into(),
        domain: "Unknown".into(),
    }
}

fn novelty_fallback(summary: &str) -> NoveltyAnalysis {
    NoveltyAnalysis {
        novel_aspects: vec![],
        contrast_with_existing: String::new(),
        summary: summary.into(),
    }
}

/// Extract a neutral overview of the research problem, method and contribution.
pub async fn research_overview(model: &dyn TextModel, body_text: &str) -> ResearchOverview {
    let request = ModelRequest::new(
        OVERVIEW_PROMPT,
        truncate_chars(body_text, OVERVIEW_CHARS),
        TEMPERATURE,
    );

    let result = generate_json(model, &request, JsonShape::Object)
        .await
        .and_then(|value| {
            serde_json::from_value::<ResearchOverview>(value)
                .map_err(|e| ModelError::Malformed(e.to_string()))
        });

    match result {
        Ok(overview) => overview,
        Err(ModelError::NotConfigured) => overview_not_configured(),
        Err(e) => {
            tracing::warn!(stage = "overview", error = %e, "overview generation failed");
            overview_unavailable()
        }
    }
}

#[derive(Deserialize)]
struct RawNovelty {
    #[serde(default)]
    novel_aspects: Vec<serde_json::Value>,
    #[serde(default)]
    contrast_with_existing: Option<String>,
    #[serde(default)]
    summary: Option<String>,
}

/// Identify what appears novel about the proposed approach.
pub async fn novelty_analysis(model: &dyn TextModel, body_text: &str) -> NoveltyAnalysis {
    let request = ModelRequest::new(
        NOVELTY_PROMPT,
        truncate_chars(body_text, NOVELTY_CHARS),
        TEMPERATURE,
    );

    let result = generate_json(model, &request, JsonShape::Object)
        .await
        .and_then(|value| {
            serde_json::from_value::<RawNovelty>(value)
                .map_err(|e| ModelError::Malformed(e.to_string()))
        });

    match result {
        Ok(raw) => NoveltyAnalysis {
            novel_aspects: raw
                .novel_aspects
                .iter()
                .filter_map(|v| v.as_str())
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .take(MAX_NOVEL_ASPECTS)
                .map(String::from)
                .collect(),
            contrast_with_existing: raw.contrast_with_existing.unwrap_or_default(),
            summary: raw.summary.unwrap_or_default(),
        },
        Err(ModelError::NotConfigured) => {
            novelty_fallback("Novelty analysis unavailable - API key not configured")
        }
        Err(e) => {
            tracing::warn!(stage = "novelty", error = %e, "novelty analysis failed");
            novelty_fallback("Novelty analysis could not be completed")
        }
    }
}

/// Map a model-supplied category onto the fixed category list.
pub fn normalize_category(category: &str) -> String {
    let trimmed = category.trim();
    ASSUMPTION_CATEGORIES
        .iter()
        .find(|c| c.eq_ignore_ascii_case(trimmed))
        .unwrap_or(&"Other")
        .to_string()
}

/// Identify assumptions the work relies on.
pub async fn identify_assumptions(model: &dyn TextModel, body_text: &str) -> IdentifiedAssumptions {
    let request = ModelRequest::new(
        ASSUMPTIONS_PROMPT,
        truncate_chars(body_text, ASSUMPTION_CHARS),
        TEMPERATURE,
    );

    let value = match generate_json(model, &request, JsonShape::Object).await {
        Ok(v) => v,
        Err(ModelError::NotConfigured) => return IdentifiedAssumptions::default(),
        Err(e) => {
            tracing::warn!(stage = "assumptions", error = %e, "assumption identification failed");
            return IdentifiedAssumptions::default();
        }
    };

    let assumptions = value["assumptions"]
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|item| {
                    let statement = item["statement"].as_str()?.trim();
                    if statement.is_empty() {
                        return None;
                    }
                    Some(Assumption {
                        statement: statement.to_string(),
                        category: normalize_category(item["category"].as_str().unwrap_or("")),
                    })
                })
                .take(MAX_ASSUMPTIONS)
                .collect()
        })
        .unwrap_or_default();

    IdentifiedAssumptions { assumptions }
}
