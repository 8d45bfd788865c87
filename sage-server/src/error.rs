use axum::{
    Json,
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use sage_rag::RagError;
use serde::Serialize;

/// Error body returned by every failing route.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub kind: String,
}

/// A failure turned into a JSON response.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Rag(RagError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Rag(err) => match err {
                RagError::ConfigError(_)
                | RagError::LoaderError { .. }
                | RagError::ChunkingError(_) => StatusCode::BAD_REQUEST,
                RagError::IngestionError { .. } => StatusCode::BAD_GATEWAY,
                err if err.is_provider_failure() => StatusCode::BAD_GATEWAY,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    pub fn body(&self) -> ErrorBody {
        match self {
            Self::BadRequest(message) => {
                ErrorBody { error: message.clone(), kind: "bad_request".to_string() }
            }
            Self::Rag(err) => ErrorBody { error: err.to_string(), kind: err.kind().to_string() },
        }
    }
}

impl From<RagError> for ApiError {
    fn from(err: RagError) -> Self {
        Self::Rag(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = %self.body().error, "request failed");
        }
        (status, Json(self.body())).into_response()
    }
}
