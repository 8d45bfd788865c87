use axum::{Json, extract::State, extract::rejection::JsonRejection};
use sage_rag::{META_PAGE, META_SOURCE, SearchResult};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    pub question: String,
    #[serde(default)]
    pub top_k: Option<usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SourceView {
    pub chunk_id: String,
    pub document_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    pub score: f32,
    pub text: String,
}

impl From<SearchResult> for SourceView {
    fn from(result: SearchResult) -> Self {
        let chunk = result.chunk;
        Self {
            source: chunk.metadata.get(META_SOURCE).cloned(),
            page: chunk.metadata.get(META_PAGE).and_then(|p| p.parse().ok()),
            chunk_id: chunk.id,
            document_id: chunk.document_id,
            score: result.score,
            text: chunk.text,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatResponse {
    pub answer: String,
    pub context_used: bool,
    pub sources: Vec<SourceView>,
}

pub async fn chat(
    State(state): State<AppState>,
    request: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, ApiError> {
    let Json(request) = request?;
    let question = request.question.trim();
    if question.is_empty() {
        return Err(ApiError::BadRequest("question must not be empty".to_string()));
    }

    let top_k = request.top_k.unwrap_or(state.pipeline.config().top_k);
    let answer = state.pipeline.answer_with_top_k(&state.collection, question, top_k).await?;
    info!(collection = %state.collection, source_count = answer.sources.len(), "chat answered");

    Ok(Json(ChatResponse {
        context_used: answer.has_context(),
        answer: answer.text,
        sources: answer.sources.into_iter().map(SourceView::from).collect(),
    }))
}
