//! Document chunking strategies.
//!
//! This module provides the [`Chunker`] trait and two implementations:
//!
//! - [`FixedSizeChunker`]: contiguous slices of at most `chunk_size` characters
//! - [`RecursiveChunker`]: packs paragraphs, then sentences, then words up to `chunk_size`
//!
//! Both strategies share the same output rules: every segment is trimmed,
//! segments that are blank after trimming are dropped, and the surviving
//! chunks are numbered densely from zero. Sizes are counted in characters,
//! never bytes, so a slice boundary never falls inside a UTF-8 code point.

use crate::document::{Chunk, Document};
use crate::error::{RagError, Result};

/// A strategy for splitting documents into chunks.
///
/// Implementations must be deterministic: identical input yields identical
/// chunks in identical order.
pub trait Chunker: Send + Sync {
    /// Split a document into chunks.
    ///
    /// Returns an empty `Vec` if the document text is empty or all whitespace.
    fn chunk(&self, document: &Document) -> Result<Vec<Chunk>>;
}

/// Split `text` into fixed-size chunks attributed to `document`.
///
/// # Errors
///
/// Returns [`RagError::InputError`] if `chunk_size` is zero.
///
/// # Example
///
/// ```rust
/// let chunks = docqa_rag::chunk_text("doc.txt", "AAAA BBBB CCCC", 5).unwrap();
/// let texts: Vec<_> = chunks.iter().map(|c| c.text.as_str()).collect();
/// assert_eq!(texts, ["AAAA", "BBBB", "CCCC"]);
/// assert_eq!(chunks[2].id, "doc.txt-2");
/// ```
pub fn chunk_text(document: &str, text: &str, chunk_size: usize) -> Result<Vec<Chunk>> {
    validate_chunk_size(chunk_size)?;
    Ok(assemble(document, char_windows(text, chunk_size)))
}

fn validate_chunk_size(chunk_size: usize) -> Result<()> {
    if chunk_size == 0 {
        return Err(RagError::InputError("chunk_size must be greater than zero".to_string()));
    }
    Ok(())
}

/// Trim, drop blanks, and number the survivors densely.
fn assemble<'a>(document: &str, segments: impl IntoIterator<Item = &'a str>) -> Vec<Chunk> {
    segments
        .into_iter()
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .enumerate()
        .map(|(index, segment)| Chunk::new(document, index, segment))
        .collect()
}

/// Contiguous slices of at most `size` characters covering all of `text`.
fn char_windows(text: &str, size: usize) -> Vec<&str> {
    let mut windows = Vec::new();
    let mut start = 0;
    let mut count = 0;

    for (offset, _) in text.char_indices() {
        if count == size {
            windows.push(&text[start..offset]);
            start = offset;
            count = 0;
        }
        count += 1;
    }

    if start < text.len() {
        windows.push(&text[start..]);
    }

    windows
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Splits text into contiguous, non-overlapping slices of at most
/// `chunk_size` characters, ignoring sentence and paragraph boundaries.
///
/// Chunk IDs are generated as `{document}-{sequence_index}`.
///
/// # Example
///
/// ```rust,ignore
/// use docqa_rag::FixedSizeChunker;
///
/// let chunker = FixedSizeChunker::new(1200)?;
/// let chunks = chunker.chunk(&document)?;
/// ```
#[derive(Debug, Clone)]
pub struct FixedSizeChunker {
    chunk_size: usize,
}

impl FixedSizeChunker {
    /// Create a new `FixedSizeChunker`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::InputError`] if `chunk_size` is zero.
    pub fn new(chunk_size: usize) -> Result<Self> {
        validate_chunk_size(chunk_size)?;
        Ok(Self { chunk_size })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }
}

impl Chunker for FixedSizeChunker {
    fn chunk(&self, document: &Document) -> Result<Vec<Chunk>> {
        chunk_text(&document.name, &document.text, self.chunk_size)
    }
}

/// Splits text hierarchically: paragraphs → sentences → words → characters.
///
/// Segments are packed greedily into pieces of at most `chunk_size`
/// characters. A segment that alone exceeds `chunk_size` is split with the
/// next separator; words longer than `chunk_size` fall back to fixed-size
/// slicing. Separators stay attached to the preceding segment, so the pieces
/// concatenate back to the original text.
#[derive(Debug, Clone)]
pub struct RecursiveChunker {
    chunk_size: usize,
}

const SEPARATORS: [&str; 5] = ["\n\n", ". ", "! ", "? ", " "];

impl RecursiveChunker {
    /// Create a new `RecursiveChunker`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::InputError`] if `chunk_size` is zero.
    pub fn new(chunk_size: usize) -> Result<Self> {
        validate_chunk_size(chunk_size)?;
        Ok(Self { chunk_size })
    }
}

fn split_and_merge(text: &str, chunk_size: usize, separators: &[&str]) -> Vec<String> {
    if char_len(text) <= chunk_size {
        return vec![text.to_string()];
    }

    let Some((separator, remaining)) = separators.split_first() else {
        return char_windows(text, chunk_size).into_iter().map(str::to_string).collect();
    };

    let mut pieces = Vec::new();
    let mut current = String::new();

    for segment in split_keeping_separator(text, separator) {
        if !current.is_empty() && char_len(&current) + char_len(segment) > chunk_size {
            pieces.extend(split_and_merge(&current, chunk_size, remaining));
            current.clear();
        }
        current.push_str(segment);
    }

    if !current.is_empty() {
        pieces.extend(split_and_merge(&current, chunk_size, remaining));
    }

    pieces
}

/// Split text at a separator while keeping the separator attached to the preceding segment.
fn split_keeping_separator<'a>(text: &'a str, separator: &str) -> Vec<&'a str> {
    let mut result = Vec::new();
    let mut start = 0;

    while let Some(pos) = text[start..].find(separator) {
        let end = start + pos + separator.len();
        result.push(&text[start..end]);
        start = end;
    }

    if start < text.len() {
        result.push(&text[start..]);
    }

    result
}

impl Chunker for RecursiveChunker {
    fn chunk(&self, document: &Document) -> Result<Vec<Chunk>> {
        if document.text.trim().is_empty() {
            return Ok(Vec::new());
        }
        let pieces = split_and_merge(&document.text, self.chunk_size, &SEPARATORS);
        Ok(assemble(&document.name, pieces.iter().map(String::as_str)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(chunks: &[Chunk]) -> Vec<&str> {
        chunks.iter().map(|c| c.text.as_str()).collect()
    }

    #[test]
    fn test_fixed_size_splits_and_trims() {
        let chunks = chunk_text("doc.txt", "AAAA BBBB CCCC", 5).unwrap();
        assert_eq!(texts(&chunks), ["AAAA", "BBBB", "CCCC"]);
        let indices: Vec<usize> = chunks.iter().map(|c| c.sequence_index).collect();
        assert_eq!(indices, [0, 1, 2]);
        let ids: Vec<&str> = chunks.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, ["doc.txt-0", "doc.txt-1", "doc.txt-2"]);
        assert!(chunks.iter().all(|c| c.source_document == "doc.txt"));
    }

    #[test]
    fn test_blank_slices_are_dropped_and_indices_stay_dense() {
        let chunks = chunk_text("d", "abc      def", 3).unwrap();
        assert_eq!(texts(&chunks), ["abc", "def"]);
        assert_eq!(chunks[1].sequence_index, 1);
        assert_eq!(chunks[1].id, "d-1");
    }

    #[test]
    fn test_empty_text_yields_no_chunks() {
        assert!(chunk_text("d", "", 10).unwrap().is_empty());
        assert!(chunk_text("d", "   \n\t ", 2).unwrap().is_empty());
    }

    #[test]
    fn test_zero_chunk_size_is_input_error() {
        assert!(matches!(chunk_text("d", "abc", 0), Err(RagError::InputError(_))));
        assert!(matches!(FixedSizeChunker::new(0), Err(RagError::InputError(_))));
        assert!(matches!(RecursiveChunker::new(0), Err(RagError::InputError(_))));
    }

    #[test]
    fn test_multibyte_text_is_sliced_on_char_boundaries() {
        let chunks = chunk_text("d", "ñañañaña", 3).unwrap();
        assert_eq!(texts(&chunks), ["ñañ", "aña", "ña"]);
    }

    #[test]
    fn test_recursive_prefers_paragraph_boundaries() {
        let doc = Document::new("notes.md", "First para.\n\nSecond para is here.\n\nThird.");
        let chunks = RecursiveChunker::new(22).unwrap().chunk(&doc).unwrap();
        assert_eq!(texts(&chunks), ["First para.", "Second para is here.", "Third."]);
    }

    #[test]
    fn test_recursive_falls_back_to_words_then_characters() {
        let doc = Document::new("d", "alpha beta gamma supercalifragilistic");
        let chunks = RecursiveChunker::new(11).unwrap().chunk(&doc).unwrap();
        assert_eq!(texts(&chunks), ["alpha beta", "gamma", "supercalifr", "agilistic"]);
        assert!(chunks.iter().all(|c| c.text.chars().count() <= 11));
    }
}
