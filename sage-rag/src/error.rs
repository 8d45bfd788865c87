//! Error types for the `sage-rag` crate.

use thiserror::Error;

/// Errors that can occur in RAG operations.
///
/// Provider failures keep their own variants all the way up to the front
/// ends so that a credential problem reads differently from a store outage.
/// An empty retrieval is never reported through this type.
#[derive(Debug, Error)]
pub enum RagError {
    /// A required setting is missing or inconsistent.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// A source document could not be read or decoded.
    #[error("Loader error ({path}): {message}")]
    LoaderError {
        /// The path or upload name that failed to load.
        path: String,
        /// A description of the failure.
        message: String,
    },

    /// An error occurred during document chunking.
    #[error("Chunking error: {0}")]
    ChunkingError(String),

    /// Ingestion failed while reading, embedding or storing a source.
    ///
    /// Batches stored before the failure are not rolled back.
    #[error("Ingestion error ({document}): {message}")]
    IngestionError {
        /// The document id or path being ingested.
        document: String,
        /// A description of the failure.
        message: String,
    },

    /// An error occurred during embedding generation.
    #[error("Embedding error ({provider}): {message}")]
    EmbeddingError {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// An error occurred during answer generation.
    #[error("Generation error ({provider}): {message}")]
    GenerationError {
        /// The generation provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// An error occurred in the vector store backend.
    #[error("Vector store error ({backend}): {message}")]
    VectorStoreError {
        /// The vector store backend that produced the error.
        backend: String,
        /// A description of the failure.
        message: String,
    },
}

impl RagError {
    /// A short, stable label for the error variant.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ConfigError(_) => "configuration",
            Self::LoaderError { .. } => "loader",
            Self::ChunkingError(_) => "chunking",
            Self::IngestionError { .. } => "ingestion",
            Self::EmbeddingError { .. } => "embedding",
            Self::GenerationError { .. } => "generation",
            Self::VectorStoreError { .. } => "vector_store",
        }
    }

    /// Whether the failure came from an external provider call.
    pub fn is_provider_failure(&self) -> bool {
        matches!(
            self,
            Self::EmbeddingError { .. } | Self::GenerationError { .. } | Self::VectorStoreError { .. }
        )
    }
}

/// A convenience result type for RAG operations.
pub type Result<T> = std::result::Result<T, RagError>;
