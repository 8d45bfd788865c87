use axum::{
    Json,
    body::Bytes,
    extract::{Query, State, rejection::QueryRejection},
};
use sage_rag::IngestReport;
use serde::Deserialize;
use tracing::info;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Clone, Deserialize)]
pub struct IngestQuery {
    pub filename: String,
}

/// Store an uploaded file in the collection. The body is the raw file.
pub async fn ingest(
    State(state): State<AppState>,
    query: Result<Query<IngestQuery>, QueryRejection>,
    body: Bytes,
) -> Result<Json<IngestReport>, ApiError> {
    let Query(query) = query?;
    let filename = query.filename.trim();
    if filename.is_empty() {
        return Err(ApiError::BadRequest("filename must not be empty".to_string()));
    }
    if body.is_empty() {
        return Err(ApiError::BadRequest("upload body is empty".to_string()));
    }

    let report = state.pipeline.ingest_bytes(&state.collection, filename, &body).await?;
    info!(
        collection = %state.collection,
        filename,
        document_count = report.documents,
        chunk_count = report.chunks,
        "upload ingested"
    );
    Ok(Json(report))
}
