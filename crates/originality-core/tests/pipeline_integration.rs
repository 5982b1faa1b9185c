//! End-to-end pipeline tests with mock indices and a mock text model.

use std::sync::Arc;
use std::time::Duration;

use originality_core::db::LiteratureIndex;
use originality_core::db::mock::{MockIndex, MockResponse, paper};
use originality_core::highlight::highlight_segments;
use originality_core::llm::mock::{MockModel, MockReply};
use originality_core::llm::{ModelError, TextModel};
use originality_core::retrieval::LiteratureRetriever;
use originality_core::store::{AnalysisRecord, AnalysisStore, NewDocument, SqliteStore};
use originality_core::{
    AnalysisOutcome, AnalysisStatus, AnalysisTrigger, CoreError, DetectionStatus, InputType,
    PdfExtractionStatus, Pipeline, RateLimiters, SegmentKind, SuggestionKind, UniquenessLevel,
    process_trigger,
};

const DOCUMENT: &str = "Graph neural networks learn node representations by message passing. \
We propose a spectral method for molecular property prediction that scales linearly.

References
[1] Kipf, T. and Welling, M. Semi-Supervised Classification with Graph Convolutional Networks. ICLR 2017.";

const TIMEOUT: Duration = Duration::from_secs(30);

fn kipf() -> originality_core::CandidatePaper {
    paper(
        "Semi-Supervised Classification with Graph Convolutional Networks",
        "We present a scalable approach for semi-supervised learning on graphs.",
        "Semantic Scholar",
    )
}

fn gilmer() -> originality_core::CandidatePaper {
    paper(
        "Neural Message Passing for Quantum Chemistry",
        "Supervised learning on molecules has incredible potential.",
        "arXiv",
    )
}

/// A model that answers each prompt kind with a canned payload.
fn scripted_model() -> MockModel {
    MockModel::routed(|req| {
        let s = req.system.as_str();
        let text = if s.contains("neutral overview") {
            r#"{"problem_summary": "Predicting molecular properties.", "methodology": "Spectral GNN.", "contribution": "Linear scaling.", "domain": "Machine Learning"}"#
        } else if s.contains("novel contributions") {
            r#"Here you go: {"novel_aspects": ["Linear-time spectral filters"], "contrast_with_existing": "Avoids eigendecomposition.", "summary": "A faster spectral method."}"#
        } else if s.contains("identifying assumptions") {
            r#"{"assumptions": [{"statement": "Assumes molecular graphs are small.", "category": "Scalability"}]}"#
        } else if s.contains("similarity analyzer") {
            r#"```json
[
  {"paperIndex": 0, "matchedTextUser": "Graph neural networks learn node representations", "matchedTextPaper": "semi-supervised learning on graphs", "similarityPercentage": 70, "sectionName": "Introduction"},
  {"paperIndex": 1, "matchedTextUser": "spectral method for molecular property prediction", "matchedTextPaper": "learning on molecules", "similarityPercentage": 60, "sectionName": "Methodology"},
  {"paperIndex": 1, "matchedTextUser": "weak overlap", "matchedTextPaper": "x", "similarityPercentage": 10, "sectionName": "Results"}
]
```"#
        } else if s.contains("writing advisor") {
            r#"[
  {"type": "citation", "section": "Methodology", "message": "Cite prior message passing work in the methodology."},
  {"type": "positive", "message": "The linear-time filter is a clear contribution."},
  {"type": "positive", "message": "the linear-time filter is a clear contribution."}
]"#
        } else {
            return MockReply::Error(ModelError::Malformed("unexpected prompt".into()));
        };
        MockReply::Text(text.to_string())
    })
}

fn pipeline_with(indices: Vec<Arc<dyn LiteratureIndex>>, model: Arc<dyn TextModel>) -> Pipeline {
    let retriever = LiteratureRetriever::new(
        indices,
        reqwest::Client::new(),
        Duration::from_secs(5),
        Arc::new(RateLimiters::default()),
    );
    Pipeline::new(retriever, model)
}

fn default_indices() -> (Arc<MockIndex>, Arc<MockIndex>) {
    (
        Arc::new(MockIndex::with_papers("Semantic Scholar", vec![kipf()])),
        Arc::new(MockIndex::with_papers("arXiv", vec![gilmer()])),
    )
}

fn create(store: &dyn AnalysisStore, text: &str) -> i64 {
    store
        .create(&NewDocument {
            title: "Spectral GNNs".into(),
            input_type: InputType::Pdf,
            text: text.into(),
            pdf_extraction_status: PdfExtractionStatus::Partial,
        })
        .unwrap()
}

fn trigger(id: i64, text: &str) -> AnalysisTrigger {
    AnalysisTrigger::new(id, text, PdfExtractionStatus::Partial)
}

#[tokio::test]
async fn full_analysis_is_persisted() {
    let store = SqliteStore::open_in_memory().unwrap();
    let (s2, arxiv) = default_indices();
    let model = Arc::new(scripted_model());
    let pipeline = pipeline_with(vec![s2.clone(), arxiv.clone()], model.clone());

    let id = create(&store, DOCUMENT);
    let outcome = process_trigger(&store, &pipeline, &trigger(id, DOCUMENT), TIMEOUT)
        .await
        .unwrap();

    // One query, shared by both indices, each queried once.
    assert_eq!(s2.call_count(), 1);
    assert_eq!(arxiv.call_count(), 1);
    assert_eq!(s2.last_query().as_deref(), Some(outcome.search_query.as_str()));
    assert_eq!(outcome.papers_considered, 2);
    // Five model calls: overview, novelty, assumptions, classification, guidance.
    assert_eq!(model.call_count(), 5);

    let record = store.get(id).unwrap();
    assert_eq!(record.status, AnalysisStatus::Completed);
    assert_eq!(record.reference_detection_status, Some(DetectionStatus::Success));
    assert!(record.references_text.as_deref().unwrap().starts_with("References"));
    assert_eq!(record.pdf_extraction_status, PdfExtractionStatus::Partial);

    // Kipf is cited in the references, the message passing paper is not.
    assert_eq!(record.matches.len(), 2);
    assert!(record.matches[0].is_referenced);
    assert!(!record.matches[1].is_referenced);
    assert_eq!(record.overall_similarity_score, Some(60.0));
    assert_eq!(record.uniqueness_level, Some(UniquenessLevel::Low));

    let overview = record.research_overview.as_ref().unwrap();
    assert_eq!(overview.domain, "Machine Learning");
    assert_eq!(
        record.novelty_analysis.as_ref().unwrap().novel_aspects,
        vec!["Linear-time spectral filters"]
    );
    assert_eq!(
        record.identified_assumptions.as_ref().unwrap().assumptions[0].category,
        "Scalability"
    );

    // Duplicate guidance collapsed, leaving exactly two model suggestions.
    assert_eq!(record.guidance_suggestions.len(), 2);
    assert_eq!(record.guidance_suggestions[0].kind, SuggestionKind::Citation);
    assert_eq!(record.guidance_suggestions, outcome.guidance);
}

#[tokio::test]
async fn highlights_rebuild_stored_body() {
    let store = SqliteStore::open_in_memory().unwrap();
    let (s2, arxiv) = default_indices();
    let pipeline = pipeline_with(vec![s2, arxiv], Arc::new(scripted_model()));

    let id = create(&store, DOCUMENT);
    process_trigger(&store, &pipeline, &trigger(id, DOCUMENT), TIMEOUT)
        .await
        .unwrap();

    let record: AnalysisRecord = store.get(id).unwrap();
    let body = record.display_text();
    let segments = highlight_segments(body, &record.matches);

    let rebuilt: String = segments.iter().map(|s| s.text.as_str()).collect();
    assert_eq!(rebuilt, body);

    let kinds: Vec<SegmentKind> = segments.iter().map(|s| s.kind).collect();
    assert_eq!(
        kinds,
        vec![
            SegmentKind::Referenced,
            SegmentKind::Unique,
            SegmentKind::Unreferenced,
            SegmentKind::Unique,
        ]
    );
    assert_eq!(
        segments[2].match_info.as_ref().unwrap().paper_title,
        "Neural Message Passing for Quantum Chemistry"
    );
}

#[tokio::test]
async fn unconfigured_model_completes_with_neutral_results() {
    let store = SqliteStore::open_in_memory().unwrap();
    let (s2, arxiv) = default_indices();
    let pipeline = pipeline_with(
        vec![s2, arxiv],
        Arc::new(MockModel::failing(ModelError::NotConfigured)),
    );

    let id = create(&store, DOCUMENT);
    let outcome: AnalysisOutcome =
        process_trigger(&store, &pipeline, &trigger(id, DOCUMENT), TIMEOUT)
            .await
            .unwrap();

    assert!(outcome.matches.is_empty());
    assert_eq!(outcome.overall_score, 0.0);
    assert_eq!(outcome.uniqueness_level, UniquenessLevel::High);
    assert_eq!(
        outcome.research_overview.problem_summary,
        "Unable to generate overview - API key not configured"
    );
    assert_eq!(outcome.guidance.len(), 2);
    assert_eq!(outcome.guidance[0].kind, SuggestionKind::Positive);
    assert_eq!(store.status(id).unwrap(), AnalysisStatus::Completed);
}

#[tokio::test]
async fn failing_indices_degrade_to_nothing_found() {
    let store = SqliteStore::open_in_memory().unwrap();
    let failing: Arc<dyn LiteratureIndex> =
        Arc::new(MockIndex::new("Semantic Scholar", MockResponse::Error("HTTP 500".into())));
    let limited: Arc<dyn LiteratureIndex> = Arc::new(MockIndex::new(
        "arXiv",
        MockResponse::RateLimited { retry_after: None },
    ));
    let model = Arc::new(scripted_model());
    let pipeline = pipeline_with(vec![failing, limited], model.clone());

    let id = create(&store, DOCUMENT);
    let outcome = process_trigger(&store, &pipeline, &trigger(id, DOCUMENT), TIMEOUT)
        .await
        .unwrap();

    assert_eq!(outcome.papers_considered, 0);
    assert!(outcome.matches.is_empty());
    // No candidates: classification is skipped, the other four calls still run.
    assert_eq!(model.call_count(), 4);
    assert_eq!(store.status(id).unwrap(), AnalysisStatus::Completed);
}

#[tokio::test]
async fn text_without_references_still_completes() {
    let store = SqliteStore::open_in_memory().unwrap();
    let (s2, arxiv) = default_indices();
    let pipeline = pipeline_with(vec![s2, arxiv], Arc::new(scripted_model()));

    let text = "Graph neural networks learn node representations by message passing.";
    let id = create(&store, text);
    process_trigger(&store, &pipeline, &trigger(id, text), TIMEOUT)
        .await
        .unwrap();

    let record = store.get(id).unwrap();
    assert_eq!(record.reference_detection_status, Some(DetectionStatus::Failed));
    assert_eq!(record.references_text.as_deref(), Some(""));
    // Nothing can be cited without references.
    assert!(record.matches.iter().all(|m| !m.is_referenced));
}

#[tokio::test]
async fn invalid_trigger_never_starts_processing() {
    let store = SqliteStore::open_in_memory().unwrap();
    let (s2, arxiv) = default_indices();
    let model = Arc::new(scripted_model());
    let pipeline = pipeline_with(vec![s2.clone(), arxiv], model.clone());

    let id = create(&store, DOCUMENT);
    let bad = AnalysisTrigger {
        analysis_id: Some(id),
        text: Some(String::new()),
        pdf_extraction_status: None,
    };
    let err = process_trigger(&store, &pipeline, &bad, TIMEOUT)
        .await
        .unwrap_err();

    assert!(matches!(err, CoreError::Validation(_)));
    assert_eq!(store.status(id).unwrap(), AnalysisStatus::Pending);
    assert_eq!(s2.call_count(), 0);
    assert_eq!(model.call_count(), 0);
}

#[tokio::test]
async fn unknown_analysis_is_not_found() {
    let store = SqliteStore::open_in_memory().unwrap();
    let (s2, arxiv) = default_indices();
    let pipeline = pipeline_with(vec![s2, arxiv], Arc::new(scripted_model()));

    let err = process_trigger(&store, &pipeline, &trigger(404, DOCUMENT), TIMEOUT)
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::NotFound(404)));
}

#[tokio::test]
async fn completed_analysis_cannot_be_rerun() {
    let store = SqliteStore::open_in_memory().unwrap();
    let (s2, arxiv) = default_indices();
    let pipeline = pipeline_with(vec![s2, arxiv], Arc::new(scripted_model()));

    let id = create(&store, DOCUMENT);
    process_trigger(&store, &pipeline, &trigger(id, DOCUMENT), TIMEOUT)
        .await
        .unwrap();
    let err = process_trigger(&store, &pipeline, &trigger(id, DOCUMENT), TIMEOUT)
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::InvalidTransition { .. }));
    assert_eq!(store.get(id).unwrap().matches.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn timeout_marks_analysis_failed() {
    let store = SqliteStore::open_in_memory().unwrap();
    let (s2, arxiv) = default_indices();
    let slow = Arc::new(scripted_model().with_delay(Duration::from_secs(120)));
    let pipeline = pipeline_with(vec![s2, arxiv], slow);

    let id = create(&store, DOCUMENT);
    let err = process_trigger(
        &store,
        &pipeline,
        &trigger(id, DOCUMENT),
        Duration::from_secs(60),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, CoreError::Timeout(_)));
    let record = store.get(id).unwrap();
    assert_eq!(record.status, AnalysisStatus::Failed);
    // Failure writes the status only.
    assert!(record.body_text.is_none());
    assert!(record.matches.is_empty());
}

#[tokio::test(start_paused = true)]
async fn abandoned_trigger_marks_analysis_failed() {
    let store = SqliteStore::open_in_memory().unwrap();
    let (s2, arxiv) = default_indices();
    let slow = Arc::new(scripted_model().with_delay(Duration::from_secs(60)));
    let pipeline = pipeline_with(vec![s2, arxiv], slow);

    let id = create(&store, DOCUMENT);
    let caller_gave_up = tokio::time::timeout(
        Duration::from_secs(1),
        process_trigger(&store, &pipeline, &trigger(id, DOCUMENT), TIMEOUT),
    )
    .await;

    assert!(caller_gave_up.is_err());
    assert_eq!(store.status(id).unwrap(), AnalysisStatus::Failed);
}

/// Delegates to SQLite but refuses to store results.
struct ReadOnlyResults(SqliteStore);

impl AnalysisStore for ReadOnlyResults {
    fn create(&self, doc: &NewDocument) -> Result<i64, CoreError> {
        self.0.create(doc)
    }
    fn get(&self, id: i64) -> Result<AnalysisRecord, CoreError> {
        self.0.get(id)
    }
    fn status(&self, id: i64) -> Result<AnalysisStatus, CoreError> {
        self.0.status(id)
    }
    fn mark_processing(&self, id: i64) -> Result<(), CoreError> {
        self.0.mark_processing(id)
    }
    fn complete(&self, _id: i64, _outcome: &AnalysisOutcome) -> Result<(), CoreError> {
        Err(CoreError::Validation("disk full".into()))
    }
    fn mark_failed(&self, id: i64) -> Result<(), CoreError> {
        self.0.mark_failed(id)
    }
    fn delete(&self, id: i64) -> Result<(), CoreError> {
        self.0.delete(id)
    }
}

#[tokio::test]
async fn persistence_failure_marks_analysis_failed() {
    let store = ReadOnlyResults(SqliteStore::open_in_memory().unwrap());
    let (s2, arxiv) = default_indices();
    let pipeline = pipeline_with(vec![s2, arxiv], Arc::new(scripted_model()));

    let id = create(&store, DOCUMENT);
    let err = process_trigger(&store, &pipeline, &trigger(id, DOCUMENT), TIMEOUT)
        .await
        .unwrap_err();

    assert!(matches!(err, CoreError::Validation(ref m) if m == "disk full"));
    assert_eq!(store.status(id).unwrap(), AnalysisStatus::Failed);
}
