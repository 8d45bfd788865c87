//! RAG pipeline orchestrator.
//!
//! The [`RagPipeline`] coordinates the full ingest-and-answer workflow by
//! composing an [`EmbeddingProvider`], a [`VectorStore`], a [`Chunker`] and
//! a [`GenerationProvider`].
//!
//! # Example
//!
//! ```rust,ignore
//! use sage_rag::{RagPipeline, RagConfig, InMemoryVectorStore};
//!
//! let pipeline = RagPipeline::builder()
//!     .config(RagConfig::default())
//!     .embedding_provider(Arc::new(embedder))
//!     .vector_store(Arc::new(InMemoryVectorStore::new()))
//!     .generation_provider(Arc::new(generator))
//!     .build()?;
//!
//! pipeline.ingest_path("oracle_knowledge_base", "data/ap_setup.pdf").await?;
//! let answer = pipeline.answer("oracle_knowledge_base", "How do I fix APP-SQLAP-10000?").await?;
//! ```

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use futures::{StreamExt, TryStreamExt, stream};
use tracing::{error, info};

use crate::chunking::{Chunker, RecursiveChunker};
use crate::config::RagConfig;
use crate::document::{Answer, Chunk, Document, IngestReport, SearchResult};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::generation::GenerationProvider;
use crate::loader::{self, LoadedSource, SourceType};
use crate::prompt::PromptTemplate;
use crate::vectorstore::VectorStore;

/// The RAG pipeline orchestrator.
///
/// Coordinates document ingestion (chunk → embed → store) and answering
/// (embed → search → filter → prompt → generate). Construct one via
/// [`RagPipeline::builder()`].
pub struct RagPipeline {
    config: RagConfig,
    embedding_provider: Arc<dyn EmbeddingProvider>,
    vector_store: Arc<dyn VectorStore>,
    generation_provider: Option<Arc<dyn GenerationProvider>>,
    chunker: Arc<dyn Chunker>,
    prompt: PromptTemplate,
}

impl RagPipeline {
    /// Create a new [`RagPipelineBuilder`].
    pub fn builder() -> RagPipelineBuilder {
        RagPipelineBuilder::default()
    }

    /// Return a reference to the pipeline configuration.
    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    /// Return a reference to the embedding provider.
    pub fn embedding_provider(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.embedding_provider
    }

    /// Return a reference to the vector store.
    pub fn vector_store(&self) -> &Arc<dyn VectorStore> {
        &self.vector_store
    }

    /// Return the generation provider, if one is configured.
    pub fn generation_provider(&self) -> Option<&Arc<dyn GenerationProvider>> {
        self.generation_provider.as_ref()
    }

    /// Return the prompt template used for answers.
    pub fn prompt(&self) -> &PromptTemplate {
        &self.prompt
    }

    /// Create a named collection in the vector store.
    ///
    /// The collection is created with the dimensionality reported by the
    /// configured [`EmbeddingProvider`]. No-op if it already exists.
    pub async fn create_collection(&self, name: &str) -> Result<()> {
        let dimensions = self.embedding_provider.dimensions();
        self.vector_store.create_collection(name, dimensions).await.inspect_err(|e| {
            error!(collection = name, error = %e, "failed to create collection");
        })
    }

    /// Delete a named collection from the vector store.
    pub async fn delete_collection(&self, name: &str) -> Result<()> {
        self.vector_store.delete_collection(name).await.inspect_err(|e| {
            error!(collection = name, error = %e, "failed to delete collection");
        })
    }

    /// Drop a collection and create it again, empty.
    pub async fn recreate_collection(&self, name: &str) -> Result<()> {
        self.delete_collection(name).await?;
        self.create_collection(name).await?;
        info!(collection = name, "recreated collection");
        Ok(())
    }

    /// Ingest a single document: chunk → embed → store.
    ///
    /// Returns the chunks that were stored (with embeddings attached). The
    /// collection is created if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::IngestionError`] if embedding or storage fails.
    /// Batches stored before the failure are kept.
    pub async fn ingest(&self, collection: &str, document: &Document) -> Result<Vec<Chunk>> {
        let chunks = self.chunker.chunk(document);
        if chunks.is_empty() {
            info!(document.id = %document.id, chunk_count = 0, "ingested document (empty)");
            return Ok(chunks);
        }

        self.ensure_collection(collection, &document.id).await?;
        let stored = self.store_chunks(collection, chunks).await?;
        info!(document.id = %document.id, chunk_count = stored.len(), "ingested document");
        Ok(stored)
    }

    /// Ingest multiple documents.
    ///
    /// Chunks from all documents share embedding batches, so many short
    /// documents cost few provider calls.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::IngestionError`] naming the document of the first
    /// batch that fails.
    pub async fn ingest_batch(
        &self,
        collection: &str,
        documents: &[Document],
    ) -> Result<Vec<Chunk>> {
        let label = documents.first().map_or(collection, |d| d.id.as_str());
        let chunks: Vec<Chunk> = documents.iter().flat_map(|d| self.chunker.chunk(d)).collect();
        let stored = self.ingest_chunks(collection, label, chunks).await?;
        info!(
            collection,
            document_count = documents.len(),
            chunk_count = stored.len(),
            "ingested documents"
        );
        Ok(stored)
    }

    /// Load, chunk, embed and store the file at `path`.
    ///
    /// Chunk settings follow the file's [`SourceType`] rather than the
    /// pipeline's chunker. Documents are named after the path, so files that
    /// share a name in different directories are kept apart. Chunks left over
    /// from an earlier, longer version of the same file are removed.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::IngestionError`] if the file cannot be read or any
    /// batch fails.
    pub async fn ingest_path(
        &self,
        collection: &str,
        path: impl AsRef<Path>,
    ) -> Result<IngestReport> {
        let path = path.as_ref();
        let loaded = loader::load_path(path).await.map_err(|e| {
            error!(path = %path.display(), error = %e, "failed to load source");
            ingestion_error(&loader::source_name(path), e)
        })?;
        self.ingest_source(collection, loaded).await
    }

    /// Load, chunk, embed and store an uploaded file.
    ///
    /// Re-uploading a file with the same name replaces its earlier chunks.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::LoaderError`] if the bytes cannot be decoded and
    /// [`RagError::IngestionError`] if any batch fails.
    pub async fn ingest_bytes(
        &self,
        collection: &str,
        name: &str,
        bytes: &[u8],
    ) -> Result<IngestReport> {
        let loaded = loader::load_bytes(name, bytes)?;
        self.ingest_source(collection, loaded).await
    }

    async fn ingest_source(&self, collection: &str, loaded: LoadedSource) -> Result<IngestReport> {
        let source = loaded.source.as_str();
        let source_type = SourceType::from_name(source);
        let chunker = source_type.chunker();
        let chunks: Vec<Chunk> = loaded.documents.iter().flat_map(|d| chunker.chunk(d)).collect();
        let stored = self.ingest_chunks(collection, source, chunks).await?;
        let removed = self.remove_stale_chunks(collection, source, &stored).await?;

        let report = IngestReport {
            documents: loaded.documents.len(),
            chunks: stored.len(),
            skipped_pages: loaded.skipped_pages.len(),
        };
        info!(
            source,
            %source_type,
            document_count = report.documents,
            chunk_count = report.chunks,
            skipped_pages = report.skipped_pages,
            removed_chunks = removed,
            "ingested source"
        );
        Ok(report)
    }

    /// Delete chunks of `source` that are not part of `current`. Returns how
    /// many were deleted.
    async fn remove_stale_chunks(
        &self,
        collection: &str,
        source: &str,
        current: &[Chunk],
    ) -> Result<usize> {
        let exists = self
            .vector_store
            .collection_exists(collection)
            .await
            .map_err(|e| ingestion_error(source, format!("storage failed: {e}")))?;
        if !exists {
            return Ok(0);
        }

        let keep: HashSet<&str> = current.iter().map(|c| c.id.as_str()).collect();
        let stale: Vec<String> = self
            .vector_store
            .source_chunk_ids(collection, source)
            .await
            .map_err(|e| ingestion_error(source, format!("storage failed: {e}")))?
            .into_iter()
            .filter(|id| !keep.contains(id.as_str()))
            .collect();
        if stale.is_empty() {
            return Ok(0);
        }

        let ids: Vec<&str> = stale.iter().map(String::as_str).collect();
        self.vector_store.delete(collection, &ids).await.map_err(|e| {
            error!(collection, source, error = %e, "failed to remove stale chunks");
            ingestion_error(source, format!("removing stale chunks failed: {e}"))
        })?;
        Ok(ids.len())
    }

    async fn ingest_chunks(
        &self,
        collection: &str,
        label: &str,
        chunks: Vec<Chunk>,
    ) -> Result<Vec<Chunk>> {
        if chunks.is_empty() {
            return Ok(chunks);
        }
        self.ensure_collection(collection, label).await?;
        self.store_chunks(collection, chunks).await
    }

    async fn ensure_collection(&self, collection: &str, label: &str) -> Result<()> {
        self.create_collection(collection).await.map_err(|e| ingestion_error(label, e))
    }

    /// Embed and upsert `chunks` in batches of `embed_batch_size`, with up to
    /// `ingest_concurrency` batches in flight. Returns chunks in input order.
    async fn store_chunks(&self, collection: &str, chunks: Vec<Chunk>) -> Result<Vec<Chunk>> {
        let batch_size = self.config.embed_batch_size.max(1);
        let mut batches: Vec<Vec<Chunk>> = Vec::new();
        let mut remaining = chunks.into_iter().peekable();
        while remaining.peek().is_some() {
            batches.push(remaining.by_ref().take(batch_size).collect());
        }

        let mut stored: Vec<(usize, Vec<Chunk>)> = stream::iter(batches.into_iter().enumerate())
            .map(|(index, batch)| async move {
                self.embed_and_upsert(collection, batch).await.map(|batch| (index, batch))
            })
            .buffer_unordered(self.config.ingest_concurrency.max(1))
            .try_collect()
            .await?;

        stored.sort_by_key(|(index, _)| *index);
        Ok(stored.into_iter().flat_map(|(_, batch)| batch).collect())
    }

    async fn embed_and_upsert(&self, collection: &str, mut batch: Vec<Chunk>) -> Result<Vec<Chunk>> {
        let document = batch.first().map(|c| c.document_id.clone()).unwrap_or_default();

        let texts: Vec<&str> = batch.iter().map(|c| c.text.as_str()).collect();
        let embeddings = self.embedding_provider.embed_batch(&texts).await.map_err(|e| {
            error!(document.id = %document, error = %e, "embedding failed during ingestion");
            ingestion_error(&document, format!("embedding failed: {e}"))
        })?;

        if embeddings.len() != batch.len() {
            error!(
                document.id = %document,
                expected = batch.len(),
                actual = embeddings.len(),
                "embedding count mismatch"
            );
            return Err(ingestion_error(
                &document,
                format!("expected {} embeddings, got {}", batch.len(), embeddings.len()),
            ));
        }

        for (chunk, embedding) in batch.iter_mut().zip(embeddings) {
            chunk.embedding = embedding;
        }

        self.vector_store.upsert(collection, &batch).await.map_err(|e| {
            error!(collection, document.id = %document, error = %e, "vector store upsert failed");
            ingestion_error(&document, format!("storage failed: {e}"))
        })?;

        Ok(batch)
    }

    /// Retrieve the `top_k` chunks most similar to `query`.
    ///
    /// Returns search results ordered by descending score. When a
    /// `similarity_threshold` is configured, results below it are filtered
    /// out. A collection that does not exist yields no results.
    pub async fn query(&self, collection: &str, query: &str) -> Result<Vec<SearchResult>> {
        self.query_with_top_k(collection, query, self.config.top_k).await
    }

    /// Like [`query`](Self::query) with an explicit `top_k`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if `top_k` is zero. Embedding and
    /// vector store failures are returned as reported by the provider.
    pub async fn query_with_top_k(
        &self,
        collection: &str,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<SearchResult>> {
        if top_k == 0 {
            return Err(RagError::ConfigError("top_k must be greater than zero".to_string()));
        }

        let query_embedding = self.embedding_provider.embed(query).await.inspect_err(|e| {
            error!(error = %e, "embedding failed during query");
        })?;

        let exists = self.vector_store.collection_exists(collection).await.inspect_err(|e| {
            error!(collection, error = %e, "vector store lookup failed");
        })?;
        if !exists {
            info!(collection, "collection does not exist, answering without context");
            return Ok(Vec::new());
        }

        let results =
            self.vector_store.search(collection, &query_embedding, top_k).await.inspect_err(
                |e| error!(collection, error = %e, "vector store search failed"),
            )?;

        let filtered: Vec<SearchResult> = match self.config.similarity_threshold {
            Some(threshold) => results.into_iter().filter(|r| r.score >= threshold).collect(),
            None => results,
        };

        info!(collection, result_count = filtered.len(), "query completed");
        Ok(filtered)
    }

    /// Answer `question` grounded on the collection, using the configured
    /// `top_k`.
    pub async fn answer(&self, collection: &str, question: &str) -> Result<Answer> {
        self.answer_with_top_k(collection, question, self.config.top_k).await
    }

    /// Answer `question` grounded on the `top_k` most similar chunks.
    ///
    /// An empty or missing collection still produces an answer, generated
    /// with an empty context block.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if no generation provider is
    /// configured or `top_k` is zero. Embedding, vector store and generation
    /// failures are propagated unchanged.
    pub async fn answer_with_top_k(
        &self,
        collection: &str,
        question: &str,
        top_k: usize,
    ) -> Result<Answer> {
        let generator = self.generation_provider.as_ref().ok_or_else(|| {
            RagError::ConfigError("a generation provider is required to answer".to_string())
        })?;

        let sources = self.query_with_top_k(collection, question, top_k).await?;
        let request = self.prompt.render(question, &sources, self.config.temperature);

        let text = generator.generate(&request).await.inspect_err(|e| {
            error!(provider = generator.name(), error = %e, "generation failed");
        })?;

        info!(
            collection,
            provider = generator.name(),
            source_count = sources.len(),
            "answered question"
        );
        Ok(Answer { text, sources })
    }
}

fn ingestion_error(document: &str, message: impl std::fmt::Display) -> RagError {
    RagError::IngestionError { document: document.to_string(), message: message.to_string() }
}

/// Builder for constructing a [`RagPipeline`].
///
/// `config`, `embedding_provider` and `vector_store` are required. Without a
/// `chunker` the pipeline splits with a [`RecursiveChunker`] sized from the
/// config. Without a `generation_provider` the pipeline can ingest and query
/// but not answer.
///
/// # Example
///
/// ```rust,ignore
/// let pipeline = RagPipeline::builder()
///     .config(RagConfig::default())
///     .embedding_provider(Arc::new(embedder))
///     .vector_store(Arc::new(store))
///     .generation_provider(Arc::new(generator))
///     .prompt(PromptTemplate::new("You answer payroll questions."))  // optional
///     .build()?;
/// ```
#[derive(Default)]
pub struct RagPipelineBuilder {
    config: Option<RagConfig>,
    embedding_provider: Option<Arc<dyn EmbeddingProvider>>,
    vector_store: Option<Arc<dyn VectorStore>>,
    generation_provider: Option<Arc<dyn GenerationProvider>>,
    chunker: Option<Arc<dyn Chunker>>,
    prompt: Option<PromptTemplate>,
}

impl RagPipelineBuilder {
    /// Set the pipeline configuration.
    pub fn config(mut self, config: RagConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the embedding provider.
    pub fn embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedding_provider = Some(provider);
        self
    }

    /// Set the vector store backend.
    pub fn vector_store(mut self, store: Arc<dyn VectorStore>) -> Self {
        self.vector_store = Some(store);
        self
    }

    /// Set the generation provider used by [`RagPipeline::answer`].
    pub fn generation_provider(mut self, provider: Arc<dyn GenerationProvider>) -> Self {
        self.generation_provider = Some(provider);
        self
    }

    /// Set the document chunker used by `ingest` and `ingest_batch`.
    pub fn chunker(mut self, chunker: Arc<dyn Chunker>) -> Self {
        self.chunker = Some(chunker);
        self
    }

    /// Set the prompt template.
    pub fn prompt(mut self, prompt: PromptTemplate) -> Self {
        self.prompt = Some(prompt);
        self
    }

    /// Build the [`RagPipeline`], validating that all required fields are set.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if any required field is missing.
    pub fn build(self) -> Result<RagPipeline> {
        let config =
            self.config.ok_or_else(|| RagError::ConfigError("config is required".to_string()))?;
        let embedding_provider = self
            .embedding_provider
            .ok_or_else(|| RagError::ConfigError("embedding_provider is required".to_string()))?;
        let vector_store = self
            .vector_store
            .ok_or_else(|| RagError::ConfigError("vector_store is required".to_string()))?;
        let chunker = match self.chunker {
            Some(chunker) => chunker,
            None => Arc::new(RecursiveChunker::try_new(config.chunk_size, config.chunk_overlap)?),
        };

        Ok(RagPipeline {
            config,
            embedding_provider,
            vector_store,
            generation_provider: self.generation_provider,
            chunker,
            prompt: self.prompt.unwrap_or_default(),
        })
    }
}
