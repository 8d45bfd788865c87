use std::sync::Arc;

use sage_rag::RagPipeline;

/// Shared handler state: one pipeline and the collection it serves.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<RagPipeline>,
    pub collection: String,
}

impl AppState {
    pub fn new(pipeline: Arc<RagPipeline>, collection: impl Into<String>) -> Self {
        Self { pipeline, collection: collection.into() }
    }
}
