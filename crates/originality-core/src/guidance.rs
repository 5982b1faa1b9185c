//! Deduplicated, context-specific writing guidance.
//!
//! The model is asked first; when it is unavailable or returns fewer than
//! two usable suggestions, deterministic rules take over.

use std::collections::HashSet;

use originality_parsing::truncate_chars;
use serde_json::{Value, json};

use crate::llm::{JsonShape, ModelError, ModelRequest, TextModel, generate_json};
use crate::{
    GuidanceSuggestion, IdentifiedAssumptions, NoveltyAnalysis, SimilarityMatch, SuggestionKind,
    UniquenessLevel,
};

const SAMPLE_CHARS: usize = 1500;
const MIN_MODEL_SUGGESTIONS: usize = 2;
const MAX_SUGGESTIONS: usize = 6;
const MAX_CITATION_SECTIONS: usize = 2;
const MIN_FALLBACK_SUGGESTIONS: usize = 2;
const REWRITE_SCORE_THRESHOLD: f64 = 40.0;
const TEMPERATURE: f32 = 0.6;

const SYSTEM_PROMPT: &str = "You are an academic writing advisor providing constructive, specific guidance. Based on the analysis context provided, generate 3-6 unique guidance suggestions that are specific to this particular research work.

Return ONLY a valid JSON array of objects containing:
- type: \"positive\" | \"citation\" | \"rewrite\"
- section: (optional) specific section name if applicable
- message: A specific, actionable suggestion (1-2 sentences, max 150 chars)

Guidelines:
1. Each suggestion must be unique, with no duplicates or near-duplicates
2. Be specific to the content: reference affected sections or identified aspects
3. Balance positive observations with constructive advice
4. For high uniqueness, emphasize strengths
5. For low uniqueness, focus on specific areas needing improvement
6. Consider the novel aspects and assumptions when giving advice
7. Never be accusatory; keep a supportive, academic tone
8. Vary the phrasing and avoid repeating sentence structures";

/// Everything guidance depends on.
#[derive(Debug, Clone, Copy)]
pub struct GuidanceInput<'a> {
    pub body_text: &'a str,
    pub matches: &'a [SimilarityMatch],
    pub overall_score: f64,
    pub uniqueness_level: UniquenessLevel,
    pub novelty: &'a NoveltyAnalysis,
    pub assumptions: &'a IdentifiedAssumptions,
}

/// Distinct values in first-seen order.
fn distinct<'a>(values: impl Iterator<Item = &'a str>) -> Vec<&'a str> {
    let mut seen = HashSet::new();
    values.filter(|v| seen.insert(*v)).collect()
}

/// Summary of the analysis sent to the model. Raw passages are not included.
pub fn analysis_context(input: &GuidanceInput<'_>) -> Value {
    let unreferenced: Vec<&SimilarityMatch> =
        input.matches.iter().filter(|m| !m.is_referenced).collect();
    let referenced = input.matches.len() - unreferenced.len();

    json!({
        "overallScore": input.overall_score.round() as i64,
        "uniquenessLevel": input.uniqueness_level.as_str(),
        "unreferencedMatchCount": unreferenced.len(),
        "referencedMatchCount": referenced,
        "affectedSections": distinct(unreferenced.iter().map(|m| m.section_name.as_str())),
        "novelAspects": input.novelty.novel_aspects.iter().take(3).collect::<Vec<_>>(),
        "hasAssumptions": !input.assumptions.assumptions.is_empty(),
        "assumptionCategories": distinct(
            input.assumptions.assumptions.iter().map(|a| a.category.as_str())
        ),
    })
}

/// Produce guidance, preferring the model and falling back to rules.
pub async fn generate(model: &dyn TextModel, input: &GuidanceInput<'_>) -> Vec<GuidanceSuggestion> {
    let user = json!({
        "context": analysis_context(input),
        "textSample": truncate_chars(input.body_text, SAMPLE_CHARS),
    });
    let request = ModelRequest::new(SYSTEM_PROMPT, user.to_string(), TEMPERATURE);

    match generate_json(model, &request, JsonShape::Array).await {
        Ok(value) => {
            let suggestions = validate_suggestions(&value);
            if suggestions.len() >= MIN_MODEL_SUGGESTIONS {
                return suggestions;
            }
            tracing::info!(
                valid = suggestions.len(),
                "too few usable model suggestions, using rule-based guidance"
            );
        }
        Err(ModelError::NotConfigured) => {}
        Err(e) => {
            tracing::warn!(stage = "guidance", error = %e, "guidance generation failed, using rule-based guidance");
        }
    }

    fallback_guidance(input.matches, input.overall_score, input.uniqueness_level)
}

/// Keep well-formed suggestions, dropping case-insensitive duplicate
/// messages (first wins), capped at six.
fn validate_suggestions(value: &Value) -> Vec<GuidanceSuggestion> {
    let Some(items) = value.as_array() else {
        return vec![];
    };

    let mut seen = HashSet::new();
    let mut out = Vec::new();

    for item in items {
        let Some(kind) = item["type"].as_str().and_then(SuggestionKind::parse) else {
            tracing::debug!(?item, "dropping suggestion with invalid type");
            continue;
        };
        let message = item["message"].as_str().unwrap_or("").trim();
        if message.is_empty() {
            continue;
        }
        if !seen.insert(message.to_lowercase()) {
            continue;
        }
        let section = item["section"]
            .as_str()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from);

        out.push(GuidanceSuggestion {
            kind,
            section,
            message: message.to_string(),
        });
        if out.len() == MAX_SUGGESTIONS {
            break;
        }
    }
    out
}

/// Deterministic guidance from the analysis results alone.
pub fn fallback_guidance(
    matches: &[SimilarityMatch],
    overall_score: f64,
    level: UniquenessLevel,
) -> Vec<GuidanceSuggestion> {
    let mut suggestions = Vec::new();
    let unreferenced: Vec<&SimilarityMatch> = matches.iter().filter(|m| !m.is_referenced).collect();
    let referenced_count = matches.len() - unreferenced.len();

    match level {
        UniquenessLevel::High => suggestions.push(positive(
            "Your research demonstrates strong originality with minimal overlap to indexed literature.",
        )),
        UniquenessLevel::Medium => suggestions.push(positive(
            "Your work shows a reasonable level of originality while building on established research.",
        )),
        UniquenessLevel::Low => {}
    }

    // Section counts in first-seen order; the stable sort keeps ties that way.
    let mut section_counts: Vec<(&str, usize)> = Vec::new();
    for m in &unreferenced {
        let section = m.section_name.as_str();
        if section.is_empty() || section == "Unknown" {
            continue;
        }
        match section_counts.iter_mut().find(|(s, _)| *s == section) {
            Some((_, count)) => *count += 1,
            None => section_counts.push((section, 1)),
        }
    }
    section_counts.sort_by(|a, b| b.1.cmp(&a.1));

    for (section, _) in section_counts.into_iter().take(MAX_CITATION_SECTIONS) {
        suggestions.push(GuidanceSuggestion {
            kind: SuggestionKind::Citation,
            section: Some(section.to_string()),
            message: format!(
                "The {} section contains unreferenced similar content. Consider reviewing and adding appropriate citations.",
                section.to_lowercase()
            ),
        });
    }

    if overall_score > REWRITE_SCORE_THRESHOLD && !unreferenced.is_empty() {
        suggestions.push(GuidanceSuggestion {
            kind: SuggestionKind::Rewrite,
            section: None,
            message: "Some passages show notable similarity to existing work. Consider rephrasing to better highlight your unique perspective.".into(),
        });
    }

    if referenced_count > 0 {
        let verb = if referenced_count > 1 { "s are" } else { " is" };
        suggestions.push(positive(&format!(
            "{referenced_count} similar passage{verb} properly attributed, reflecting good citation practice."
        )));
    }

    let mut suggestions = dedupe(suggestions);
    for general in general_guidance() {
        if suggestions.len() >= MIN_FALLBACK_SUGGESTIONS {
            break;
        }
        suggestions.push(general);
    }
    suggestions
}

/// Document-independent advice used to pad a short fallback list.
fn general_guidance() -> [GuidanceSuggestion; 2] {
    [
        GuidanceSuggestion {
            kind: SuggestionKind::Citation,
            section: None,
            message: "Cite the foundational work your approach builds on, even where the wording is entirely your own.".into(),
        },
        positive(
            "State your key contribution explicitly and early, so readers can see how it differs from the closest prior work.",
        ),
    ]
}

fn positive(message: &str) -> GuidanceSuggestion {
    GuidanceSuggestion {
        kind: SuggestionKind::Positive,
        section: None,
        message: message.to_string(),
    }
}

/// Drop case-insensitive duplicate messages, first occurrence wins.
fn dedupe(suggestions: Vec<GuidanceSuggestion>) -> Vec<GuidanceSuggestion> {
    let mut seen = HashSet::new();
    suggestions
        .into_iter()
        .filter(|s| seen.insert(s.message.to_lowercase()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Assumption;
    use crate::llm::mock::MockModel;

    fn m(section: &str, similarity: f64, is_referenced: bool) -> SimilarityMatch {
        SimilarityMatch {
            paper_title: "T".into(),
            paper_source: "arXiv".into(),
            paper_url: "u".into(),
            matched_text_user: "x".into(),
            matched_text_paper: "y".into(),
            similarity_percentage: similarity,
            is_referenced,
            section_name: section.into(),
        }
    }

    fn input<'a>(
        matches: &'a [SimilarityMatch],
        score: f64,
        level: UniquenessLevel,
        novelty: &'a NoveltyAnalysis,
        assumptions: &'a IdentifiedAssumptions,
    ) -> GuidanceInput<'a> {
        GuidanceInput {
            body_text: "Body text of the paper.",
            matches,
            overall_score: score,
            uniqueness_level: level,
            novelty,
            assumptions,
        }
    }

    fn assert_unique(suggestions: &[GuidanceSuggestion]) {
        let mut seen = HashSet::new();
        for s in suggestions {
            assert!(seen.insert(s.message.to_lowercase()), "duplicate: {}", s.message);
        }
    }

    #[tokio::test]
    async fn model_suggestions_are_deduplicated_and_capped() {
        let model = MockModel::text(
            r#"[
                {"type": "positive", "message": "Strong framing."},
                {"type": "positive", "message": "STRONG FRAMING."},
                {"type": "bogus", "message": "Dropped."},
                {"type": "citation", "section": "Methods", "message": "Cite GCN."},
                {"type": "rewrite"},
                {"type": "rewrite", "message": "Rephrase intro."},
                {"type": "positive", "message": "Four."},
                {"type": "positive", "message": "Five."},
                {"type": "positive", "message": "Six."},
                {"type": "positive", "message": "Seven."}
            ]"#,
        );
        let novelty = NoveltyAnalysis::default();
        let assumptions = IdentifiedAssumptions::default();
        let out = generate(
            &model,
            &input(&[], 0.0, UniquenessLevel::High, &novelty, &assumptions),
        )
        .await;
        assert_eq!(out.len(), 6);
        assert_eq!(out[0].message, "Strong framing.");
        assert_eq!(out[1].section.as_deref(), Some("Methods"));
        assert_eq!(out[2].kind, SuggestionKind::Rewrite);
        assert_unique(&out);
    }

    #[tokio::test]
    async fn fewer_than_two_valid_falls_back() {
        let model = MockModel::text(
            r#"[{"type": "positive", "message": "Only one."}, {"type": "positive", "message": "only one."}]"#,
        );
        let novelty = NoveltyAnalysis::default();
        let assumptions = IdentifiedAssumptions::default();
        let out = generate(
            &model,
            &input(&[], 0.0, UniquenessLevel::High, &novelty, &assumptions),
        )
        .await;
        assert_eq!(out.len(), 1);
        assert!(out[0].message.starts_with("Your research demonstrates strong originality"));
    }

    #[tokio::test]
    async fn model_failure_falls_back() {
        let model = MockModel::failing(ModelError::Http("down".into()));
        let matches = [m("Methodology", 80.0, false)];
        let novelty = NoveltyAnalysis::default();
        let assumptions = IdentifiedAssumptions::default();
        let out = generate(
            &model,
            &input(&matches, 80.0, UniquenessLevel::Low, &novelty, &assumptions),
        )
        .await;
        assert_eq!(out, fallback_guidance(&matches, 80.0, UniquenessLevel::Low));
    }

    #[test]
    fn context_summarizes_without_raw_matches() {
        let matches = [
            m("Methods", 60.0, false),
            m("Methods", 40.0, false),
            m("Intro", 30.0, false),
            m("Results", 90.0, true),
        ];
        let novelty = NoveltyAnalysis {
            novel_aspects: vec!["a".into(), "b".into(), "c".into(), "d".into()],
            ..Default::default()
        };
        let assumptions = IdentifiedAssumptions {
            assumptions: vec![
                Assumption { statement: "s1".into(), category: "Scalability".into() },
                Assumption { statement: "s2".into(), category: "Scalability".into() },
            ],
        };
        let ctx = analysis_context(&input(
            &matches,
            43.333,
            UniquenessLevel::Medium,
            &novelty,
            &assumptions,
        ));
        assert_eq!(ctx["overallScore"], 43);
        assert_eq!(ctx["uniquenessLevel"], "medium");
        assert_eq!(ctx["unreferencedMatchCount"], 3);
        assert_eq!(ctx["referencedMatchCount"], 1);
        assert_eq!(ctx["affectedSections"], json!(["Methods", "Intro"]));
        assert_eq!(ctx["novelAspects"], json!(["a", "b", "c"]));
        assert_eq!(ctx["hasAssumptions"], true);
        assert_eq!(ctx["assumptionCategories"], json!(["Scalability"]));
        assert!(ctx.get("matchedPapers").is_none());
    }

    #[test]
    fn fallback_high_with_no_matches() {
        let out = fallback_guidance(&[], 0.0, UniquenessLevel::High);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].kind, SuggestionKind::Positive);
        // Padded with general advice to the minimum of two.
        assert_eq!(out[1].kind, SuggestionKind::Citation);
        assert!(out[1].section.is_none());
        assert_unique(&out);
    }

    #[test]
    fn fallback_never_pads_a_full_list() {
        let matches = [m("Methods", 60.0, false)];
        let out = fallback_guidance(&matches, 60.0, UniquenessLevel::Low);
        assert_eq!(out.len(), 2);
        assert!(out.iter().all(|s| s.section.is_some() || s.kind == SuggestionKind::Rewrite));
    }

    #[test]
    fn fallback_medium_uses_distinct_wording() {
        let high = fallback_guidance(&[], 0.0, UniquenessLevel::High);
        let medium = fallback_guidance(&[], 30.0, UniquenessLevel::Medium);
        assert_ne!(high[0].message, medium[0].message);
    }

    #[test]
    fn fallback_citations_for_top_two_sections() {
        let matches = [
            m("Results", 60.0, false),
            m("Methodology", 60.0, false),
            m("Methodology", 60.0, false),
            m("Introduction", 60.0, false),
            m("Unknown", 60.0, false),
            m("Unknown", 60.0, false),
            m("Unknown", 60.0, false),
            m("Discussion", 60.0, true),
            m("Discussion", 60.0, true),
        ];
        let out = fallback_guidance(&matches, 60.0, UniquenessLevel::Low);
        let citations: Vec<_> = out
            .iter()
            .filter(|s| s.kind == SuggestionKind::Citation)
            .map(|s| s.section.as_deref().unwrap())
            .collect();
        assert_eq!(citations, vec!["Methodology", "Results"]);
        assert_eq!(
            out[0].message,
            "The methodology section contains unreferenced similar content. Consider reviewing and adding appropriate citations."
        );
        assert!(out.iter().any(|s| s.kind == SuggestionKind::Rewrite));
        assert_eq!(
            out.last().unwrap().message,
            "2 similar passages are properly attributed, reflecting good citation practice."
        );
        assert_unique(&out);
    }

    #[test]
    fn fallback_singular_attribution_message() {
        let out = fallback_guidance(&[m("Intro", 90.0, true)], 0.0, UniquenessLevel::High);
        assert_eq!(
            out[1].message,
            "1 similar passage is properly attributed, reflecting good citation practice."
        );
    }

    #[test]
    fn fallback_rewrite_needs_score_above_forty() {
        let matches = [m("Unknown", 40.0, false)];
        let out = fallback_guidance(&matches, 40.0, UniquenessLevel::Medium);
        assert!(out.iter().all(|s| s.kind != SuggestionKind::Rewrite));
    }

    #[test]
    fn fallback_dedupes_sections_differing_only_in_case() {
        let matches = [m("Methods", 60.0, false), m("METHODS", 60.0, false)];
        let out = fallback_guidance(&matches, 60.0, UniquenessLevel::Low);
        let citations = out.iter().filter(|s| s.kind == SuggestionKind::Citation).count();
        assert_eq!(citations, 1);
        assert_unique(&out);
    }
}
