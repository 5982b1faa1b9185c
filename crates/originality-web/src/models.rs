use originality_core::{AnalysisRecord, AnalysisStatus, HighlightedSegment};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct CreatedResponse {
    pub id: i64,
}

#[derive(Debug, Serialize)]
pub struct TriggerResponse {
    pub success: bool,
}

/// A stored analysis with its matches and the segments rebuilt from them.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResponse {
    #[serde(flatten)]
    pub analysis: AnalysisRecord,
    pub highlighted_segments: Vec<HighlightedSegment>,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub id: i64,
    pub status: AnalysisStatus,
}
