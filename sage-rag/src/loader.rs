//! Source document loading.
//!
//! Text files become a single [`Document`]; PDFs become one [`Document`] per
//! page. Document IDs are derived from the source name (the path for files on
//! disk, the file name for uploads) so that loading the same source twice
//! yields the same IDs, and therefore the same chunk IDs.

use std::fmt;
use std::path::{Component, Path, PathBuf};

use tracing::debug;

use crate::chunking::RecursiveChunker;
use crate::document::{Document, META_SOURCE, META_SOURCE_TYPE};
use crate::error::{RagError, Result};

/// The kind of source a document was loaded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceType {
    /// A PDF file, loaded page by page.
    Pdf,
    /// Any other file, read as UTF-8 text.
    Text,
}

impl SourceType {
    /// Classify a file name by its extension.
    pub fn from_name(name: &str) -> Self {
        let is_pdf = Path::new(name)
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));
        if is_pdf { Self::Pdf } else { Self::Text }
    }

    /// The metadata label for this source type.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Text => "text",
        }
    }

    /// `(chunk_size, chunk_overlap)` used when ingesting this kind of file.
    pub fn chunk_settings(self) -> (usize, usize) {
        match self {
            Self::Pdf => (1000, 100),
            Self::Text => (500, 50),
        }
    }

    /// A chunker configured with [`chunk_settings`](Self::chunk_settings).
    pub fn chunker(self) -> RecursiveChunker {
        let (size, overlap) = self.chunk_settings();
        RecursiveChunker::new(size, overlap)
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Documents read from one file or upload.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadedSource {
    /// The source name, also stored as `source` metadata on every document.
    pub source: String,
    /// The documents, one per PDF page that yielded text.
    pub documents: Vec<Document>,
    /// 1-based numbers of PDF pages whose text could not be extracted.
    pub skipped_pages: Vec<u32>,
}

/// The name a file on disk is loaded under: its path as given, with `.`
/// components removed.
///
/// Same-named files in different directories get different names.
pub fn source_name(path: &Path) -> String {
    let normalized: PathBuf =
        path.components().filter(|c| !matches!(c, Component::CurDir)).collect();
    normalized.display().to_string()
}

/// Load the file at `path`.
///
/// # Errors
///
/// Returns [`RagError::LoaderError`] if the file cannot be read or decoded.
pub async fn load_path(path: impl AsRef<Path>) -> Result<LoadedSource> {
    let path = path.as_ref();
    let source = source_name(path);
    if path.file_name().is_none() {
        return Err(loader_error(&source, "path has no file name"));
    }
    let bytes = tokio::fs::read(path).await.map_err(|e| loader_error(&source, e))?;
    load(&source, &bytes)
}

/// Load an in-memory upload named `name`. Only the file name part of `name`
/// is kept.
///
/// # Errors
///
/// Returns [`RagError::LoaderError`] if the bytes cannot be decoded.
pub fn load_bytes(name: &str, bytes: &[u8]) -> Result<LoadedSource> {
    let name = Path::new(name).file_name().and_then(|n| n.to_str()).unwrap_or(name);
    load(name, bytes)
}

fn load(source: &str, bytes: &[u8]) -> Result<LoadedSource> {
    let loaded = match SourceType::from_name(source) {
        SourceType::Text => LoadedSource {
            source: source.to_string(),
            documents: vec![load_text(source, bytes)?],
            skipped_pages: Vec::new(),
        },
        SourceType::Pdf => load_pdf(source, bytes)?,
    };
    debug!(
        source,
        document_count = loaded.documents.len(),
        skipped_pages = loaded.skipped_pages.len(),
        "loaded source"
    );
    Ok(loaded)
}

fn load_text(source: &str, bytes: &[u8]) -> Result<Document> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| loader_error(source, format!("file is not valid UTF-8: {e}")))?;
    Ok(Document::new(source, text)
        .with_metadata(META_SOURCE, source)
        .with_metadata(META_SOURCE_TYPE, SourceType::Text.as_str())
        .with_source_uri(source))
}

#[cfg(feature = "pdf")]
fn load_pdf(source: &str, bytes: &[u8]) -> Result<LoadedSource> {
    let pdf = lopdf::Document::load_mem(bytes).map_err(|e| loader_error(source, e))?;
    let pages = pdf.get_pages().into_keys().map(|page| (page, pdf.extract_text(&[page])));
    Ok(collect_pages(source, pages))
}

/// One document per page that yielded text; failed pages are recorded as
/// skipped.
#[cfg(any(feature = "pdf", test))]
fn collect_pages<E: fmt::Display>(
    source: &str,
    pages: impl IntoIterator<Item = (u32, std::result::Result<String, E>)>,
) -> LoadedSource {
    use crate::document::META_PAGE;

    let mut loaded = LoadedSource { source: source.to_string(), ..LoadedSource::default() };
    for (page, text) in pages {
        let text = match text {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(source, page, error = %e, "could not extract page text, skipping");
                loaded.skipped_pages.push(page);
                continue;
            }
        };
        loaded.documents.push(
            Document::new(format!("{source}#page={page}"), text)
                .with_metadata(META_SOURCE, source)
                .with_metadata(META_SOURCE_TYPE, SourceType::Pdf.as_str())
                .with_metadata(META_PAGE, page.to_string())
                .with_source_uri(source),
        );
    }
    loaded
}

#[cfg(not(feature = "pdf"))]
fn load_pdf(source: &str, _bytes: &[u8]) -> Result<LoadedSource> {
    Err(loader_error(source, "PDF support requires the `pdf` feature"))
}

fn loader_error(path: &str, message: impl fmt::Display) -> RagError {
    RagError::LoaderError { path: path.to_string(), message: message.to_string() }
}
