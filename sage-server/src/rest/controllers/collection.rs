use axum::{Json, extract::State};
use serde::Serialize;
use serde_json::{Value, json};

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Clone, Serialize)]
pub struct CollectionInfo {
    pub name: String,
    pub exists: bool,
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub async fn collection_info(
    State(state): State<AppState>,
) -> Result<Json<CollectionInfo>, ApiError> {
    let exists = state.pipeline.vector_store().collection_exists(&state.collection).await?;
    Ok(Json(CollectionInfo { name: state.collection.clone(), exists }))
}
