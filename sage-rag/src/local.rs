//! On-disk vector store.
//!
//! [`LocalVectorStore`] keeps each collection in `<root>/<collection>.json`
//! and answers searches with the same cosine ranking as
//! [`InMemoryVectorStore`](crate::InMemoryVectorStore). Collections are
//! loaded lazily and cached; every mutation is written to a copy of the
//! collection, saved through a temporary file and a rename, and only then
//! replaces the cached collection.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::debug;

use crate::document::{Chunk, SearchResult};
use crate::error::{RagError, Result};
use crate::inmemory::{ids_from_source, missing_collection, rank};
use crate::vectorstore::VectorStore;

const BACKEND: &str = "local";
const EXTENSION: &str = "json";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct CollectionFile {
    dimensions: usize,
    records: BTreeMap<String, Chunk>,
}

/// A [`VectorStore`] persisted as JSON files under a local directory.
///
/// # Example
///
/// ```rust,ignore
/// use sage_rag::LocalVectorStore;
///
/// let store = LocalVectorStore::open("./qdrant_data").await?;
/// store.create_collection("oracle_knowledge_base", 768).await?;
/// ```
#[derive(Debug)]
pub struct LocalVectorStore {
    root: PathBuf,
    cache: RwLock<BTreeMap<String, CollectionFile>>,
}

impl LocalVectorStore {
    /// Open (and create if needed) a store rooted at `root`.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await.map_err(|e| io_error(&root, e))?;
        debug!(root = %root.display(), "opened local vector store");
        Ok(Self { root, cache: RwLock::new(BTreeMap::new()) })
    }

    /// The directory holding the collection files.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn collection_path(&self, name: &str) -> Result<PathBuf> {
        let valid = !name.is_empty()
            && name.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
            && !name.starts_with('.');
        if !valid {
            return Err(RagError::VectorStoreError {
                backend: BACKEND.to_string(),
                message: format!("invalid collection name '{name}'"),
            });
        }
        Ok(self.root.join(format!("{name}.{EXTENSION}")))
    }

    async fn read_collection(&self, name: &str) -> Result<Option<CollectionFile>> {
        let path = self.collection_path(name)?;
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(io_error(&path, e)),
        };
        let file = serde_json::from_slice(&bytes).map_err(|e| RagError::VectorStoreError {
            backend: BACKEND.to_string(),
            message: format!("corrupt collection file {}: {e}", path.display()),
        })?;
        Ok(Some(file))
    }

    async fn write_collection(&self, name: &str, file: &CollectionFile) -> Result<()> {
        let path = self.collection_path(name)?;
        let tmp = path.with_extension(format!("{EXTENSION}.tmp"));
        let bytes = serde_json::to_vec(file).map_err(|e| RagError::VectorStoreError {
            backend: BACKEND.to_string(),
            message: format!("failed to serialize collection '{name}': {e}"),
        })?;
        tokio::fs::write(&tmp, bytes).await.map_err(|e| io_error(&tmp, e))?;
        tokio::fs::rename(&tmp, &path).await.map_err(|e| io_error(&path, e))?;
        Ok(())
    }

    /// Make sure `name` is in the cache if it exists on disk.
    async fn ensure_loaded<'a>(
        &self,
        cache: &'a mut BTreeMap<String, CollectionFile>,
        name: &str,
    ) -> Result<Option<&'a mut CollectionFile>> {
        if !cache.contains_key(name) {
            if let Some(file) = self.read_collection(name).await? {
                cache.insert(name.to_string(), file);
            }
        }
        Ok(cache.get_mut(name))
    }

    /// Apply `change` to a copy of the collection, persist the copy and
    /// only then swap it into the cache.
    async fn modify<F>(&self, collection: &str, change: F) -> Result<()>
    where
        F: FnOnce(&mut CollectionFile) + Send,
    {
        let mut cache = self.cache.write().await;
        let file = self
            .ensure_loaded(&mut cache, collection)
            .await?
            .ok_or_else(|| missing_collection(BACKEND, collection))?;
        let mut updated = file.clone();
        change(&mut updated);
        self.write_collection(collection, &updated).await?;
        *file = updated;
        Ok(())
    }

    /// Run `read` against the collection, loading it on first use.
    async fn with_collection<T>(
        &self,
        collection: &str,
        read: impl FnOnce(&CollectionFile) -> T + Send,
    ) -> Result<T> {
        {
            let cache = self.cache.read().await;
            if let Some(file) = cache.get(collection) {
                return Ok(read(file));
            }
        }

        let mut cache = self.cache.write().await;
        let file = self
            .ensure_loaded(&mut cache, collection)
            .await?
            .ok_or_else(|| missing_collection(BACKEND, collection))?;
        Ok(read(file))
    }
}

fn io_error(path: &Path, e: std::io::Error) -> RagError {
    RagError::VectorStoreError {
        backend: BACKEND.to_string(),
        message: format!("{}: {e}", path.display()),
    }
}

#[async_trait]
impl VectorStore for LocalVectorStore {
    async fn create_collection(&self, name: &str, dimensions: usize) -> Result<()> {
        let mut cache = self.cache.write().await;
        if self.ensure_loaded(&mut cache, name).await?.is_some() {
            return Ok(());
        }

        let file = CollectionFile { dimensions, records: BTreeMap::new() };
        self.write_collection(name, &file).await?;
        cache.insert(name.to_string(), file);
        debug!(collection = name, dimensions, "created local collection");
        Ok(())
    }

    async fn delete_collection(&self, name: &str) -> Result<()> {
        let path = self.collection_path(name)?;
        let mut cache = self.cache.write().await;
        cache.remove(name);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                debug!(collection = name, "deleted local collection");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_error(&path, e)),
        }
    }

    async fn collection_exists(&self, name: &str) -> Result<bool> {
        if self.cache.read().await.contains_key(name) {
            return Ok(true);
        }
        let path = self.collection_path(name)?;
        tokio::fs::try_exists(&path).await.map_err(|e| io_error(&path, e))
    }

    async fn list_collections(&self) -> Result<Vec<String>> {
        let mut entries =
            tokio::fs::read_dir(&self.root).await.map_err(|e| io_error(&self.root, e))?;
        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(|e| io_error(&self.root, e))? {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
                names.push(stem.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    async fn upsert(&self, collection: &str, chunks: &[Chunk]) -> Result<()> {
        if chunks.is_empty() {
            return Ok(());
        }

        self.modify(collection, |file| {
            for chunk in chunks {
                file.records.insert(chunk.id.clone(), chunk.clone());
            }
        })
        .await?;
        debug!(collection, count = chunks.len(), "upserted chunks to local store");
        Ok(())
    }

    async fn delete(&self, collection: &str, ids: &[&str]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }

        self.modify(collection, |file| {
            for id in ids {
                file.records.remove(*id);
            }
        })
        .await?;
        debug!(collection, count = ids.len(), "deleted chunks from local store");
        Ok(())
    }

    async fn source_chunk_ids(&self, collection: &str, source: &str) -> Result<Vec<String>> {
        self.with_collection(collection, |file| ids_from_source(file.records.values(), source)).await
    }

    async fn search(
        &self,
        collection: &str,
        embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<SearchResult>> {
        self.with_collection(collection, |file| rank(file.records.values(), embedding, top_k)).await
    }
}
