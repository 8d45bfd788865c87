//! Document chunking.
//!
//! This module provides the [`Chunker`] trait and [`RecursiveChunker`], which
//! splits text on a prioritised list of separators (paragraph break, line
//! break, space, then individual characters) and merges the pieces back into
//! windows of at most `chunk_size` characters with `chunk_overlap` characters
//! carried between consecutive windows.
//!
//! Every chunk is an exact slice of its document with surrounding whitespace
//! trimmed. Separators and whitespace that fall on a chunk boundary are left
//! out of both neighbours, and whitespace-only stretches never become chunks,
//! so stitching chunks back together by their offsets restores every
//! non-whitespace character of the original text.

use std::ops::Range;

use crate::document::{Chunk, Document, META_CHUNK_INDEX, META_START_INDEX};
use crate::error::{RagError, Result};

/// Separators tried in order: paragraph, line, word, character.
pub const DEFAULT_SEPARATORS: [&str; 4] = ["\n\n", "\n", " ", ""];

/// A strategy for splitting documents into chunks.
///
/// Implementations produce [`Chunk`]s with text and metadata but no embeddings.
/// Embeddings are attached later by the pipeline.
pub trait Chunker: Send + Sync {
    /// Split a document into chunks.
    ///
    /// Returns an empty `Vec` if the document text is empty or whitespace.
    /// Each returned chunk has an empty embedding vector.
    fn chunk(&self, document: &Document) -> Vec<Chunk>;
}

/// Splits text hierarchically by separators, then merges with overlap.
///
/// Chunk IDs are generated as `{document_id}_{chunk_index}`, so chunking the
/// same document twice yields the same IDs. Each chunk inherits the parent
/// document's metadata plus `chunk_index` and `start_index` (the character
/// offset of the chunk within the document).
///
/// # Example
///
/// ```rust,ignore
/// use sage_rag::RecursiveChunker;
///
/// let chunker = RecursiveChunker::new(500, 50);
/// let chunks = chunker.chunk(&document);
/// ```
#[derive(Debug, Clone)]
pub struct RecursiveChunker {
    chunk_size: usize,
    chunk_overlap: usize,
    separators: Vec<String>,
}

impl RecursiveChunker {
    /// Create a new `RecursiveChunker` with the default separators.
    ///
    /// # Arguments
    ///
    /// * `chunk_size` - maximum number of characters per chunk
    /// * `chunk_overlap` - number of overlapping characters between consecutive chunks
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self {
            chunk_size,
            chunk_overlap,
            separators: DEFAULT_SEPARATORS.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Create a new `RecursiveChunker`, validating the size parameters.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ChunkingError`] if `chunk_size` is zero or
    /// `chunk_overlap >= chunk_size`.
    pub fn try_new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(RagError::ChunkingError("chunk_size must be greater than zero".into()));
        }
        if chunk_overlap >= chunk_size {
            return Err(RagError::ChunkingError(format!(
                "chunk_overlap ({chunk_overlap}) must be less than chunk_size ({chunk_size})"
            )));
        }
        Ok(Self::new(chunk_size, chunk_overlap))
    }

    /// Replace the separator list.
    ///
    /// Without a trailing empty separator, a piece that still exceeds
    /// `chunk_size` after the last separator is emitted as an oversized chunk.
    pub fn with_separators<I, S>(mut self, separators: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.separators = separators.into_iter().map(Into::into).collect();
        self
    }

    /// Maximum chunk size in characters.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Overlap between consecutive chunks in characters.
    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Split `text` into chunk byte ranges, in document order.
    pub fn split_spans(&self, text: &str) -> Vec<Range<usize>> {
        if text.is_empty() {
            return Vec::new();
        }

        let index = CharIndex::new(text);
        let mut pieces = Vec::new();
        self.collect_pieces(text, 0..text.len(), &self.separators, &index, &mut pieces);
        self.merge_pieces(&pieces, &index)
            .into_iter()
            .filter_map(|span| trim_span(text, span))
            .collect()
    }

    /// Split `range` into pieces no larger than `chunk_size`, recursing with
    /// the remaining separators when a piece is still too large.
    fn collect_pieces(
        &self,
        text: &str,
        range: Range<usize>,
        separators: &[String],
        index: &CharIndex,
        out: &mut Vec<Range<usize>>,
    ) {
        if text[range.clone()].trim().is_empty() {
            return;
        }
        if index.width(&range) <= self.chunk_size {
            out.push(range);
            return;
        }

        let slice = &text[range.clone()];
        let Some(position) =
            separators.iter().position(|s| s.is_empty() || slice.contains(s.as_str()))
        else {
            // No split point left.
            out.push(range);
            return;
        };
        let separator = separators[position].as_str();
        let remaining = &separators[position + 1..];

        if separator.is_empty() {
            for (offset, ch) in slice.char_indices() {
                let start = range.start + offset;
                out.push(start..start + ch.len_utf8());
            }
            return;
        }

        let mut start = range.start;
        for (offset, _) in slice.match_indices(separator) {
            let end = range.start + offset;
            self.collect_pieces(text, start..end, remaining, index, out);
            start = end + separator.len();
        }
        self.collect_pieces(text, start..range.end, remaining, index, out);
    }

    /// Greedily merge adjacent pieces into windows of at most `chunk_size`
    /// characters, keeping up to `chunk_overlap` trailing characters.
    fn merge_pieces(&self, pieces: &[Range<usize>], index: &CharIndex) -> Vec<Range<usize>> {
        let width = |lo: usize, hi: usize| {
            index.offset(pieces[hi - 1].end) - index.offset(pieces[lo].start)
        };

        let mut spans = Vec::new();
        let mut lo = 0;
        for hi in 0..pieces.len() {
            if lo < hi && width(lo, hi + 1) > self.chunk_size {
                spans.push(pieces[lo].start..pieces[hi - 1].end);
                while lo < hi
                    && (width(lo, hi) > self.chunk_overlap || width(lo, hi + 1) > self.chunk_size)
                {
                    lo += 1;
                }
            }
        }
        if let Some(last) = pieces.last() {
            spans.push(pieces[lo].start..last.end);
        }
        spans
    }
}

/// Shrink `span` to exclude leading and trailing whitespace; `None` if
/// nothing is left.
fn trim_span(text: &str, span: Range<usize>) -> Option<Range<usize>> {
    let slice = &text[span.clone()];
    let trimmed = slice.trim();
    if trimmed.is_empty() {
        return None;
    }
    let start = span.start + (slice.len() - slice.trim_start().len());
    Some(start..start + trimmed.len())
}

impl Chunker for RecursiveChunker {
    fn chunk(&self, document: &Document) -> Vec<Chunk> {
        if document.text.trim().is_empty() {
            return Vec::new();
        }

        let index = CharIndex::new(&document.text);
        self.split_spans(&document.text)
            .into_iter()
            .enumerate()
            .map(|(i, span)| {
                let mut metadata = document.metadata.clone();
                metadata.insert(META_CHUNK_INDEX.to_string(), i.to_string());
                metadata.insert(META_START_INDEX.to_string(), index.offset(span.start).to_string());
                Chunk {
                    id: format!("{}_{i}", document.id),
                    text: document.text[span].to_string(),
                    embedding: Vec::new(),
                    metadata,
                    document_id: document.id.clone(),
                }
            })
            .collect()
    }
}

/// Maps byte offsets on character boundaries to character offsets.
struct CharIndex {
    boundaries: Vec<usize>,
}

impl CharIndex {
    fn new(text: &str) -> Self {
        let mut boundaries: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();
        boundaries.push(text.len());
        Self { boundaries }
    }

    fn offset(&self, byte: usize) -> usize {
        self.boundaries.binary_search(&byte).unwrap_or_else(|i| i)
    }

    fn width(&self, range: &Range<usize>) -> usize {
        self.offset(range.end) - self.offset(range.start)
    }
}
