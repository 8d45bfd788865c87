use std::sync::Arc;

use anyhow::Context;
use sage_rag::{
    GeminiEmbeddingProvider, GeminiGenerationProvider, RagConfig, RagError, RagPipeline,
    StoreTarget,
};
use tracing::info;

use crate::cli::GlobalArgs;

/// Secondary variable checked when `GOOGLE_API_KEY` is unset.
pub const FALLBACK_API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Pick the first non-blank key, trimmed.
pub fn resolve_api_key(flag: Option<&str>, fallback: Option<&str>) -> sage_rag::Result<String> {
    flag.into_iter()
        .chain(fallback)
        .map(str::trim)
        .find(|key| !key.is_empty())
        .map(str::to_string)
        .ok_or_else(|| {
            RagError::ConfigError(
                "GOOGLE_API_KEY is not set (use --google-api-key, GOOGLE_API_KEY or GEMINI_API_KEY)"
                    .to_string(),
            )
        })
}

/// The error worth reporting from a `.env` load; a missing file is not one.
pub fn env_file_problem<T>(loaded: Result<T, dotenvy::Error>) -> Option<dotenvy::Error> {
    match loaded {
        Ok(_) => None,
        Err(dotenvy::Error::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => None,
        Err(e) => Some(e),
    }
}

/// Everything a command needs, resolved once at startup.
#[derive(Debug, Clone)]
pub struct Settings {
    pub google_api_key: String,
    pub store: StoreTarget,
    pub collection: String,
    pub top_k: usize,
}

impl Settings {
    /// Resolve settings for commands that read an existing store.
    pub fn from_args(args: &GlobalArgs) -> sage_rag::Result<Self> {
        let fallback = std::env::var(FALLBACK_API_KEY_ENV).ok();
        let google_api_key =
            resolve_api_key(args.google_api_key.as_deref(), fallback.as_deref())?;
        let store = StoreTarget::resolve(
            Some(args.local_path.as_path()),
            args.qdrant_url.as_deref(),
            args.qdrant_api_key.as_deref(),
        )?;
        Ok(Self { google_api_key, store, collection: args.collection.clone(), top_k: args.top_k })
    }

    /// Resolve settings for ingestion, creating the local store directory
    /// when no remote URL is configured.
    pub async fn for_ingest(args: &GlobalArgs) -> sage_rag::Result<Self> {
        let remote = args.qdrant_url.as_deref().is_some_and(|url| !url.trim().is_empty());
        if !remote && !args.local_path.is_dir() {
            tokio::fs::create_dir_all(&args.local_path).await.map_err(|e| {
                RagError::ConfigError(format!(
                    "cannot create local store directory {}: {e}",
                    args.local_path.display()
                ))
            })?;
            info!(path = %args.local_path.display(), "created local store directory");
        }
        Self::from_args(args)
    }

    /// Construct the Gemini adapters and the store, then the pipeline.
    pub async fn build_pipeline(&self) -> anyhow::Result<RagPipeline> {
        let config = RagConfig::builder().top_k(self.top_k).build()?;
        let embedder = GeminiEmbeddingProvider::new(&self.google_api_key)?;
        let generator = GeminiGenerationProvider::new(&self.google_api_key)?;
        let store = self
            .store
            .connect()
            .await
            .with_context(|| format!("failed to open {}", self.store))?;

        let pipeline = RagPipeline::builder()
            .config(config)
            .embedding_provider(Arc::new(embedder))
            .generation_provider(Arc::new(generator))
            .vector_store(store)
            .build()?;
        Ok(pipeline)
    }
}
