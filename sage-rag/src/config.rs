//! Configuration for the RAG pipeline and vector store selection.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{RagError, Result};
use crate::local::LocalVectorStore;
use crate::vectorstore::VectorStore;

/// Configuration parameters for the RAG pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RagConfig {
    /// Maximum chunk size in characters.
    pub chunk_size: usize,
    /// Number of overlapping characters between consecutive chunks.
    pub chunk_overlap: usize,
    /// Number of top results to return from vector search.
    pub top_k: usize,
    /// Minimum similarity score for results. `None` keeps the `top_k`
    /// nearest records whatever their score.
    pub similarity_threshold: Option<f32>,
    /// Sampling temperature sent with every generation request.
    pub temperature: f32,
    /// Number of chunks sent per embedding call during ingestion.
    pub embed_batch_size: usize,
    /// Number of embedding batches in flight during ingestion.
    pub ingest_concurrency: usize,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            chunk_size: 500,
            chunk_overlap: 50,
            top_k: 3,
            similarity_threshold: None,
            temperature: 0.3,
            embed_batch_size: 100,
            ingest_concurrency: 1,
        }
    }
}

impl RagConfig {
    /// Create a new builder for constructing a [`RagConfig`].
    pub fn builder() -> RagConfigBuilder {
        RagConfigBuilder::default()
    }
}

/// Builder for constructing a validated [`RagConfig`].
#[derive(Debug, Clone, Default)]
pub struct RagConfigBuilder {
    config: RagConfig,
}

impl RagConfigBuilder {
    /// Set the maximum chunk size in characters.
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.config.chunk_size = size;
        self
    }

    /// Set the overlap between consecutive chunks in characters.
    pub fn chunk_overlap(mut self, overlap: usize) -> Self {
        self.config.chunk_overlap = overlap;
        self
    }

    /// Set the number of top results to return from vector search.
    pub fn top_k(mut self, k: usize) -> Self {
        self.config.top_k = k;
        self
    }

    /// Drop search results scoring below `threshold`.
    pub fn similarity_threshold(mut self, threshold: f32) -> Self {
        self.config.similarity_threshold = Some(threshold);
        self
    }

    /// Set the generation temperature.
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.config.temperature = temperature;
        self
    }

    /// Set the number of chunks per embedding call.
    pub fn embed_batch_size(mut self, size: usize) -> Self {
        self.config.embed_batch_size = size;
        self
    }

    /// Set the number of embedding batches in flight during ingestion.
    pub fn ingest_concurrency(mut self, concurrency: usize) -> Self {
        self.config.ingest_concurrency = concurrency;
        self
    }

    /// Build the [`RagConfig`], validating that parameters are consistent.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if:
    /// - `chunk_overlap >= chunk_size`
    /// - `top_k == 0`
    /// - `embed_batch_size == 0` or `ingest_concurrency == 0`
    /// - `temperature` is outside `0.0..=2.0`
    pub fn build(self) -> Result<RagConfig> {
        if self.config.chunk_overlap >= self.config.chunk_size {
            return Err(RagError::ConfigError(format!(
                "chunk_overlap ({}) must be less than chunk_size ({})",
                self.config.chunk_overlap, self.config.chunk_size
            )));
        }
        if self.config.top_k == 0 {
            return Err(RagError::ConfigError("top_k must be greater than zero".to_string()));
        }
        if self.config.embed_batch_size == 0 {
            return Err(RagError::ConfigError(
                "embed_batch_size must be greater than zero".to_string(),
            ));
        }
        if self.config.ingest_concurrency == 0 {
            return Err(RagError::ConfigError(
                "ingest_concurrency must be greater than zero".to_string(),
            ));
        }
        if !(0.0..=2.0).contains(&self.config.temperature) {
            return Err(RagError::ConfigError(format!(
                "temperature ({}) must be between 0.0 and 2.0",
                self.config.temperature
            )));
        }
        Ok(self.config)
    }
}

/// Where the vector store lives, resolved once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreTarget {
    /// A local directory of collection files.
    Local(PathBuf),
    /// A remote Qdrant server.
    Remote {
        /// gRPC URL of the server.
        url: String,
        /// Optional API key (Qdrant Cloud).
        api_key: Option<String>,
    },
}

impl StoreTarget {
    /// Pick the store target.
    ///
    /// An existing local directory wins; otherwise the remote URL is used.
    /// Values are trimmed, and blank values count as absent.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if there is neither a local directory
    /// nor a remote URL.
    pub fn resolve(
        local_path: Option<&Path>,
        remote_url: Option<&str>,
        api_key: Option<&str>,
    ) -> Result<Self> {
        if let Some(path) = local_path.filter(|p| p.is_dir()) {
            return Ok(Self::Local(path.to_path_buf()));
        }

        let url = remote_url.map(str::trim).filter(|u| !u.is_empty());
        let api_key = api_key.map(str::trim).filter(|k| !k.is_empty()).map(str::to_string);
        match url {
            Some(url) => Ok(Self::Remote { url: url.to_string(), api_key }),
            None => Err(RagError::ConfigError(
                "no local store directory found and no remote store URL provided".to_string(),
            )),
        }
    }

    /// Open the store this target points at.
    pub async fn connect(&self) -> Result<Arc<dyn VectorStore>> {
        info!(store = %self, "connecting to vector store");
        match self {
            Self::Local(path) => Ok(Arc::new(LocalVectorStore::open(path).await?)),
            #[cfg(feature = "qdrant")]
            Self::Remote { url, api_key } => Ok(Arc::new(
                crate::qdrant::QdrantVectorStore::with_api_key(url, api_key.as_deref())?,
            )),
            #[cfg(not(feature = "qdrant"))]
            Self::Remote { .. } => Err(RagError::ConfigError(
                "remote store configured but sage-rag was built without the `qdrant` feature"
                    .to_string(),
            )),
        }
    }
}

impl fmt::Display for StoreTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local(path) => write!(f, "Local Database ({})", path.display()),
            Self::Remote { url, .. } => write!(f, "Cloud Database ({url})"),
        }
    }
}
