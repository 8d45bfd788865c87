//! # sage-rag
//!
//! Retrieval-augmented answering for the Oracle Sage support assistant.
//!
//! ## Overview
//!
//! Oracle manuals and support notes are loaded, split into overlapping
//! chunks, embedded and stored in a vector store. A question is embedded,
//! the nearest chunks are retrieved, and a generation model answers with the
//! chunks supplied as context.
//!
//! - [`RagPipeline`] - ingestion and answering, built from injected adapters
//! - [`RecursiveChunker`] - separator-aware splitting with overlap
//! - [`InMemoryVectorStore`] / [`LocalVectorStore`] - built-in stores
//! - [`PromptTemplate`] - grounded prompt assembly
//!
//! ## Features
//!
//! | Feature | Adds |
//! |---------|------|
//! | `gemini` | [`GeminiEmbeddingProvider`] and [`GeminiGenerationProvider`] over REST |
//! | `qdrant` | [`QdrantVectorStore`] over gRPC |
//! | `pdf` | page-by-page PDF loading |
//! | `full` | all of the above |
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use sage_rag::{GeminiEmbeddingProvider, GeminiGenerationProvider, RagConfig, RagPipeline, StoreTarget};
//!
//! let key = std::env::var("GOOGLE_API_KEY")?;
//! let store = StoreTarget::resolve(Some("./qdrant_data".as_ref()), None, None)?.connect().await?;
//! let pipeline = RagPipeline::builder()
//!     .config(RagConfig::default())
//!     .embedding_provider(Arc::new(GeminiEmbeddingProvider::new(&key)?))
//!     .generation_provider(Arc::new(GeminiGenerationProvider::new(&key)?))
//!     .vector_store(store)
//!     .build()?;
//!
//! let answer = pipeline.answer("oracle_knowledge_base", "What does FND_GLOBAL.APPS_INITIALIZE do?").await?;
//! println!("{}", answer.text);
//! ```

pub mod chunking;
pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod generation;
pub mod inmemory;
pub mod loader;
pub mod local;
pub mod pipeline;
pub mod prompt;
pub mod vectorstore;

#[cfg(feature = "gemini")]
pub mod gemini;
#[cfg(feature = "qdrant")]
pub mod qdrant;

pub use chunking::{Chunker, DEFAULT_SEPARATORS, RecursiveChunker};
pub use config::{RagConfig, RagConfigBuilder, StoreTarget};
pub use document::{
    Answer, Chunk, Document, IngestReport, META_CHUNK_INDEX, META_PAGE, META_SOURCE,
    META_SOURCE_TYPE, META_START_INDEX, SearchResult,
};
pub use embedding::EmbeddingProvider;
pub use error::{RagError, Result};
pub use generation::{GenerationProvider, GenerationRequest};
pub use inmemory::InMemoryVectorStore;
pub use loader::{LoadedSource, SourceType, load_bytes, load_path, source_name};
pub use local::LocalVectorStore;
pub use pipeline::{RagPipeline, RagPipelineBuilder};
pub use prompt::{DEFAULT_PREAMBLE, PromptTemplate};
pub use vectorstore::VectorStore;

#[cfg(feature = "gemini")]
pub use gemini::{GeminiClient, GeminiEmbeddingProvider, GeminiGenerationProvider, TaskType};
#[cfg(feature = "qdrant")]
pub use qdrant::QdrantVectorStore;
