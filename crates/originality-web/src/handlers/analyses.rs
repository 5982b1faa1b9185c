use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use originality_core::NewDocument;
use originality_core::highlight::highlight_segments;

use crate::error::ApiError;
use crate::models::{AnalysisResponse, CreatedResponse, StatusResponse};
use crate::state::AppState;

/// `POST /analyses`: store a document; its analysis starts `pending`.
pub async fn create(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<NewDocument>, JsonRejection>,
) -> Result<(StatusCode, Json<CreatedResponse>), ApiError> {
    let Json(doc) = payload.map_err(|e| ApiError::bad_request(e.body_text()))?;
    if doc.title.trim().is_empty() || doc.text.trim().is_empty() {
        return Err(ApiError::bad_request("Missing title or text"));
    }

    let id = state.store.create(&doc)?;
    tracing::info!(
        id,
        input_type = doc.input_type.as_str(),
        chars = doc.text.len(),
        "analysis created"
    );
    Ok((StatusCode::CREATED, Json(CreatedResponse { id })))
}

/// `GET /analyses/{id}`: the record, its matches and highlighted segments.
pub async fn show(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<AnalysisResponse>, ApiError> {
    let analysis = state.store.get(id)?;
    let highlighted_segments = highlight_segments(analysis.display_text(), &analysis.matches);
    Ok(Json(AnalysisResponse {
        analysis,
        highlighted_segments,
    }))
}

/// `GET /analyses/{id}/status`.
pub async fn status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<StatusResponse>, ApiError> {
    let status = state.store.status(id)?;
    Ok(Json(StatusResponse { id, status }))
}

/// `DELETE /analyses/{id}`: remove the record and its matches.
pub async fn delete(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.store.delete(id)?;
    Ok(StatusCode::NO_CONTENT)
}
