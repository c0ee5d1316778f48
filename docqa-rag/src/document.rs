//! Data types for documents, chunks, collections, and scored results.
//!
//! The serialized field names of [`Chunk`] and [`EmbeddedChunk`] are the
//! on-disk format: retrieval reads exactly what ingestion wrote.

use serde::{Deserialize, Serialize};

use crate::error::{RagError, Result};

/// A source document whose text has already been extracted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Document {
    /// Name of the document. Chunk ids and the collection name derive from it.
    pub name: String,
    /// The extracted text.
    pub text: String,
}

impl Document {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self { name: name.into(), text: text.into() }
    }
}

/// A bounded slice of a [`Document`]'s text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Chunk {
    /// `<source_document>-<sequence_index>`.
    pub id: String,
    /// The name of the parent [`Document`].
    #[serde(rename = "filename")]
    pub source_document: String,
    /// Dense position among the chunks kept for the document.
    #[serde(rename = "chunkIndex")]
    pub sequence_index: usize,
    /// The trimmed chunk text.
    #[serde(rename = "content")]
    pub text: String,
}

impl Chunk {
    /// Create a chunk, deriving its id from the document name and index.
    pub fn new(source_document: &str, sequence_index: usize, text: impl Into<String>) -> Self {
        Self {
            id: chunk_id(source_document, sequence_index),
            source_document: source_document.to_string(),
            sequence_index,
            text: text.into(),
        }
    }
}

/// Build the stable identifier of the `index`-th chunk of `document`.
pub fn chunk_id(document: &str, index: usize) -> String {
    format!("{document}-{index}")
}

/// A [`Chunk`] with its vector embedding attached.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmbeddedChunk {
    #[serde(flatten)]
    pub chunk: Chunk,
    /// The embedding vector for this chunk's text.
    pub embedding: Vec<f32>,
}

impl EmbeddedChunk {
    pub fn new(chunk: Chunk, embedding: Vec<f32>) -> Self {
        Self { chunk, embedding }
    }

    pub fn id(&self) -> &str {
        &self.chunk.id
    }

    pub fn text(&self) -> &str {
        &self.chunk.text
    }
}

/// The embedded chunks of one document, all sharing one vector dimension.
///
/// A collection is the unit of persistence and the unit of retrieval. It is
/// built once at ingestion time and read-only afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddedCollection {
    name: String,
    dimensions: usize,
    chunks: Vec<EmbeddedChunk>,
}

impl EmbeddedCollection {
    /// Create a collection, validating that every embedding has the same length.
    ///
    /// The dimension of an empty collection is `0`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::DimensionMismatchError`] naming the first chunk whose
    /// embedding length differs from the first chunk's.
    pub fn new(name: impl Into<String>, chunks: Vec<EmbeddedChunk>) -> Result<Self> {
        let dimensions = chunks.first().map_or(0, |c| c.embedding.len());
        if let Some(bad) = chunks.iter().find(|c| c.embedding.len() != dimensions) {
            return Err(RagError::DimensionMismatchError {
                chunk_id: bad.chunk.id.clone(),
                expected: dimensions,
                actual: bad.embedding.len(),
            });
        }
        Ok(Self { name: name.into(), dimensions, chunks })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The shared embedding dimension `D`.
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Chunks in ingestion order.
    pub fn chunks(&self) -> &[EmbeddedChunk] {
        &self.chunks
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn into_chunks(self) -> Vec<EmbeddedChunk> {
        self.chunks
    }
}

/// An [`EmbeddedChunk`] paired with its cosine similarity to a query.
///
/// Computed per query and never persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoredChunk {
    #[serde(flatten)]
    pub chunk: EmbeddedChunk,
    /// Cosine similarity in `[-1, 1]` (higher is more relevant).
    pub score: f32,
}

impl ScoredChunk {
    pub fn id(&self) -> &str {
        self.chunk.id()
    }

    pub fn text(&self) -> &str {
        self.chunk.text()
    }
}

/// Free text summarizing a whole document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DocumentSummary {
    /// The document (and collection) this summary belongs to.
    pub document: String,
    pub text: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_serializes_with_stored_field_names() {
        let chunk = Chunk::new("doc.txt", 2, "hello");
        let value = serde_json::to_value(&chunk).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "id": "doc.txt-2",
                "filename": "doc.txt",
                "chunkIndex": 2,
                "content": "hello"
            })
        );
    }

    #[test]
    fn test_embedded_chunk_flattens_chunk_fields() {
        let embedded = EmbeddedChunk::new(Chunk::new("doc.txt", 0, "a"), vec![0.5, 0.5]);
        let value = serde_json::to_value(&embedded).unwrap();
        assert_eq!(value["id"], "doc.txt-0");
        assert_eq!(value["embedding"], serde_json::json!([0.5, 0.5]));

        let back: EmbeddedChunk = serde_json::from_value(value).unwrap();
        assert_eq!(back, embedded);
    }

    #[test]
    fn test_collection_rejects_mixed_dimensions() {
        let chunks = vec![
            EmbeddedChunk::new(Chunk::new("d", 0, "a"), vec![1.0, 0.0]),
            EmbeddedChunk::new(Chunk::new("d", 1, "b"), vec![1.0, 0.0, 0.0]),
        ];
        let err = EmbeddedCollection::new("d", chunks).unwrap_err();
        match err {
            RagError::DimensionMismatchError { chunk_id, expected, actual } => {
                assert_eq!(chunk_id, "d-1");
                assert_eq!(expected, 2);
                assert_eq!(actual, 3);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_empty_collection_has_zero_dimensions() {
        let collection = EmbeddedCollection::new("d", Vec::new()).unwrap();
        assert!(collection.is_empty());
        assert_eq!(collection.dimensions(), 0);
    }
}
