//! End-to-end analysis of one document.
//!
//! Stages run in order and hand each other immutable values:
//! segmentation, literature retrieval, insights, classification,
//! attribution, scoring, guidance. Only retrieval fans out concurrently.
//! External failures degrade their own stage; only persistence failures and
//! the overall timeout fail an analysis.

use std::sync::Arc;
use std::time::{Duration, Instant};

use originality_parsing::{SegmentedDocument, SegmenterConfig, split_references_with_config};
use serde::{Deserialize, Serialize};

use crate::guidance::GuidanceInput;
use crate::llm::{ChatGateway, TextModel};
use crate::retrieval::{LiteratureRetriever, build_indices};
use crate::store::AnalysisStore;
use crate::{
    Config, CoreError, GuidanceSuggestion, IdentifiedAssumptions, NoveltyAnalysis,
    PdfExtractionStatus, ResearchOverview, SimilarityMatch, UniquenessLevel, attribution,
    classifier, guidance, insights, scoring,
};

/// Inbound request to analyze a stored document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisTrigger {
    pub analysis_id: Option<i64>,
    pub text: Option<String>,
    pub pdf_extraction_status: Option<String>,
}

impl AnalysisTrigger {
    pub fn new(analysis_id: i64, text: impl Into<String>, pdf: PdfExtractionStatus) -> Self {
        Self {
            analysis_id: Some(analysis_id),
            text: Some(text.into()),
            pdf_extraction_status: Some(pdf.as_str().to_string()),
        }
    }

    /// Check required fields. An absent PDF status means not applicable.
    pub fn validate(&self) -> Result<(i64, &str, PdfExtractionStatus), CoreError> {
        let (Some(id), Some(text)) = (self.analysis_id, self.text.as_deref()) else {
            return Err(CoreError::Validation("Missing analysisId or text".into()));
        };
        if text.trim().is_empty() {
            return Err(CoreError::Validation("Missing analysisId or text".into()));
        }
        let pdf = match self.pdf_extraction_status.as_deref() {
            None | Some("") => PdfExtractionStatus::NotApplicable,
            Some(raw) => PdfExtractionStatus::parse(raw).ok_or_else(|| {
                CoreError::Validation(format!("unknown pdfExtractionStatus '{raw}'"))
            })?,
        };
        Ok((id, text, pdf))
    }
}

/// Everything an analysis produces.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisOutcome {
    pub segmented: SegmentedDocument,
    pub pdf_extraction_status: PdfExtractionStatus,
    /// Query sent to the literature indices; empty if retrieval was skipped.
    pub search_query: String,
    pub papers_considered: usize,
    pub research_overview: ResearchOverview,
    pub novelty_analysis: NoveltyAnalysis,
    pub identified_assumptions: IdentifiedAssumptions,
    pub matches: Vec<SimilarityMatch>,
    pub overall_score: f64,
    pub uniqueness_level: UniquenessLevel,
    pub guidance: Vec<GuidanceSuggestion>,
}

pub struct Pipeline {
    retriever: LiteratureRetriever,
    model: Arc<dyn TextModel>,
    segmenter: SegmenterConfig,
}

impl Pipeline {
    pub fn new(retriever: LiteratureRetriever, model: Arc<dyn TextModel>) -> Self {
        Self {
            retriever,
            model,
            segmenter: SegmenterConfig::default(),
        }
    }

    /// Build the production pipeline: remote indices and the chat gateway.
    pub fn from_config(config: &Config) -> Self {
        let client = reqwest::Client::new();
        let retriever = LiteratureRetriever::new(
            build_indices(config),
            client.clone(),
            config.index_timeout(),
            Arc::clone(&config.rate_limiters),
        );
        let model = ChatGateway::from_config(config, client);
        if !model.is_configured() {
            tracing::warn!("no text model API key configured; model-backed stages will use fallbacks");
        }
        Self::new(retriever, Arc::new(model))
    }

    pub fn with_segmenter_config(mut self, segmenter: SegmenterConfig) -> Self {
        self.segmenter = segmenter;
        self
    }

    pub fn segment(&self, text: &str) -> SegmentedDocument {
        split_references_with_config(text, &self.segmenter)
    }

    /// Run every stage on `text`. Never fails: degraded stages contribute
    /// neutral output.
    pub async fn run(&self, text: &str, pdf_extraction_status: PdfExtractionStatus) -> AnalysisOutcome {
        let start = Instant::now();
        let model = self.model.as_ref();

        let segmented = self.segment(text);
        tracing::info!(
            status = segmented.detection_status.as_str(),
            body_chars = segmented.body_text.len(),
            references_chars = segmented.references_text.len(),
            "reference detection complete"
        );

        let literature = self.retriever.retrieve(&segmented.body_text).await;

        let research_overview = insights::research_overview(model, &segmented.body_text).await;
        let novelty_analysis = insights::novelty_analysis(model, &segmented.body_text).await;
        let identified_assumptions =
            insights::identify_assumptions(model, &segmented.body_text).await;

        let passages = classifier::classify(model, &segmented.body_text, &literature.papers).await;
        let matches = attribution::attribute(passages, &segmented.references_text);
        let (overall_score, uniqueness_level) = scoring::aggregate(&matches);

        let guidance = guidance::generate(
            model,
            &GuidanceInput {
                body_text: &segmented.body_text,
                matches: &matches,
                overall_score,
                uniqueness_level,
                novelty: &novelty_analysis,
                assumptions: &identified_assumptions,
            },
        )
        .await;

        tracing::info!(
            papers = literature.papers.len(),
            matches = matches.len(),
            score = overall_score,
            level = uniqueness_level.as_str(),
            suggestions = guidance.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "analysis pipeline complete"
        );

        AnalysisOutcome {
            segmented,
            pdf_extraction_status,
            search_query: literature.query,
            papers_considered: literature.papers.len(),
            research_overview,
            novelty_analysis,
            identified_assumptions,
            matches,
            overall_score,
            uniqueness_level,
            guidance,
        }
    }
}

/// Validate a trigger, run the pipeline and persist the result.
///
/// Input errors are returned before the analysis leaves `pending`. Once it
/// is `processing`, a timeout, a failed write or dropping the returned
/// future marks it `failed` (best effort).
pub async fn process_trigger(
    store: &dyn AnalysisStore,
    pipeline: &Pipeline,
    trigger: &AnalysisTrigger,
    timeout: Duration,
) -> Result<AnalysisOutcome, CoreError> {
    let (id, text, pdf_status) = trigger.validate()?;

    store.mark_processing(id)?;
    tracing::info!(id, "analysis processing");
    let guard = FailOnDrop::new(store, id);

    let outcome = match tokio::time::timeout(timeout, pipeline.run(text, pdf_status)).await {
        Ok(outcome) => outcome,
        Err(_) => {
            tracing::warn!(id, timeout_secs = timeout.as_secs(), "analysis timed out");
            return Err(CoreError::Timeout(timeout));
        }
    };

    if let Err(e) = store.complete(id, &outcome) {
        tracing::warn!(id, error = %e, "failed to persist analysis result");
        return Err(e);
    }

    guard.disarm();
    tracing::info!(id, "analysis completed");
    Ok(outcome)
}

/// Marks a `processing` analysis `failed` unless disarmed, so an early
/// return or a cancelled caller never leaves it stuck.
struct FailOnDrop<'a> {
    store: &'a dyn AnalysisStore,
    id: i64,
    armed: bool,
}

impl<'a> FailOnDrop<'a> {
    fn new(store: &'a dyn AnalysisStore, id: i64) -> Self {
        Self {
            store,
            id,
            armed: true,
        }
    }

    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for FailOnDrop<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        tracing::warn!(id = self.id, "analysis did not complete; marking failed");
        if let Err(e) = self.store.mark_failed(self.id) {
            tracing::warn!(id = self.id, error = %e, "could not mark analysis as failed");
        }
    }
}
