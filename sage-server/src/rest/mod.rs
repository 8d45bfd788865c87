pub mod controllers;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};

use crate::state::AppState;
use controllers::{chat, collection, ingest};

/// Largest accepted upload.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 32 * 1024 * 1024;

/// Build the API router with the default upload limit.
pub fn router(state: AppState) -> Router {
    router_with_limit(state, DEFAULT_MAX_UPLOAD_BYTES)
}

/// Build the API router, rejecting request bodies over `max_upload_bytes`.
pub fn router_with_limit(state: AppState, max_upload_bytes: usize) -> Router {
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);

    Router::new()
        .route("/api/health", get(collection::health))
        .route("/api/collection", get(collection::collection_info))
        .route("/api/chat", post(chat::chat))
        .route("/api/ingest", post(ingest::ingest))
        .with_state(state)
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
