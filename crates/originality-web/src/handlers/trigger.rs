use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use originality_core::{AnalysisTrigger, process_trigger};

use crate::error::ApiError;
use crate::models::TriggerResponse;
use crate::state::AppState;

/// `POST /analyze-research`: run the full analysis for a stored document and
/// persist the result before responding.
///
/// The run is spawned so it outlives a disconnected client.
pub async fn analyze_research(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<AnalysisTrigger>, JsonRejection>,
) -> Result<Json<TriggerResponse>, ApiError> {
    let Json(trigger) = payload.map_err(|e| ApiError::bad_request(e.body_text()))?;
    tracing::info!(id = ?trigger.analysis_id, "analysis requested");

    let job = tokio::spawn(async move {
        process_trigger(
            state.store.as_ref(),
            &state.pipeline,
            &trigger,
            state.config.pipeline_timeout(),
        )
        .await
    });

    job.await
        .map_err(|e| ApiError::internal(format!("analysis task failed: {e}")))??;

    Ok(Json(TriggerResponse { success: true }))
}
