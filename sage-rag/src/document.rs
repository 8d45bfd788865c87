//! Data types for documents, chunks, search results and answers.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Metadata key holding the file path or upload name a document came from.
pub const META_SOURCE: &str = "source";
/// Metadata key holding the source type (`pdf` or `text`).
pub const META_SOURCE_TYPE: &str = "source_type";
/// Metadata key holding the 1-based page number of a PDF page.
pub const META_PAGE: &str = "page";
/// Metadata key holding a chunk's position within its document.
pub const META_CHUNK_INDEX: &str = "chunk_index";
/// Metadata key holding a chunk's character offset within its document.
pub const META_START_INDEX: &str = "start_index";

/// A source document containing text content and metadata.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    /// Unique identifier for the document.
    pub id: String,
    /// The text content of the document.
    pub text: String,
    /// Key-value metadata associated with the document.
    pub metadata: HashMap<String, String>,
    /// Optional URI pointing to the original source.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_uri: Option<String>,
}

impl Document {
    /// Create a document with no metadata.
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self { id: id.into(), text: text.into(), metadata: HashMap::new(), source_uri: None }
    }

    /// Add a metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Set the source URI.
    pub fn with_source_uri(mut self, uri: impl Into<String>) -> Self {
        self.source_uri = Some(uri.into());
        self
    }
}

/// A segment of a [`Document`] with its vector embedding.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chunk {
    /// Unique identifier for the chunk.
    pub id: String,
    /// The text content of the chunk.
    pub text: String,
    /// The vector embedding for this chunk's text.
    pub embedding: Vec<f32>,
    /// Key-value metadata inherited from the parent document plus chunk-specific fields.
    pub metadata: HashMap<String, String>,
    /// The ID of the parent [`Document`].
    pub document_id: String,
}

/// A retrieved [`Chunk`] paired with a relevance score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    /// The retrieved chunk.
    pub chunk: Chunk,
    /// The similarity score (higher is more relevant).
    pub score: f32,
}

/// A generated answer together with the retrieval it was grounded on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
    /// The generated text.
    pub text: String,
    /// The retrieved chunks used as context, in descending score order.
    pub sources: Vec<SearchResult>,
}

impl Answer {
    /// Whether any retrieved context was supplied to the generator.
    pub fn has_context(&self) -> bool {
        !self.sources.is_empty()
    }
}

/// Counts reported after ingesting a file or upload.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestReport {
    /// Number of documents loaded (one per PDF page).
    pub documents: usize,
    /// Number of chunks stored.
    pub chunks: usize,
    /// Number of PDF pages whose text could not be extracted.
    #[serde(default)]
    pub skipped_pages: usize,
}
