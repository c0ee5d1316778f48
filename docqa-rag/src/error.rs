//! Error types for the `docqa-rag` crate.

use thiserror::Error;

/// Errors that can occur while ingesting, retrieving, or answering.
#[derive(Debug, Error)]
pub enum RagError {
    /// The caller supplied an invalid argument (zero chunk size, zero `top_k`,
    /// blank query, oversized upload, ...).
    #[error("Input error: {0}")]
    InputError(String),

    /// The embedding model failed to load, failed during inference, or
    /// returned a vector of the wrong shape.
    #[error("Embedding error ({provider}): {message}")]
    EmbeddingError {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// A query vector and a candidate vector have different lengths.
    #[error("Dimension mismatch for chunk '{chunk_id}': expected {expected}, got {actual}")]
    DimensionMismatchError {
        /// The candidate chunk whose embedding did not match.
        chunk_id: String,
        /// The expected vector length.
        expected: usize,
        /// The length actually found.
        actual: usize,
    },

    /// No persisted collection exists under the requested name.
    #[error("Collection not found: '{collection}'")]
    CollectionNotFoundError {
        /// The collection that was requested.
        collection: String,
    },

    /// The collection exists but holds no chunks.
    #[error("Collection '{collection}' is empty")]
    EmptyCollectionError {
        /// The empty collection.
        collection: String,
    },

    /// Persisted data could not be read, parsed, or written.
    #[error("Storage error ({path}): {message}")]
    StorageError {
        /// The file or location involved.
        path: String,
        /// A description of the failure.
        message: String,
    },

    /// Text could not be extracted from an uploaded document.
    #[error("Extraction error ({format}): {message}")]
    ExtractionError {
        /// The document format being extracted.
        format: String,
        /// A description of the failure.
        message: String,
    },

    /// The answer-generation server failed or returned an unusable response.
    #[error("Synthesis error: {0}")]
    SynthesisError(String),

    /// A configuration validation error.
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl RagError {
    pub(crate) fn embedding(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::EmbeddingError { provider: provider.into(), message: message.into() }
    }

    pub(crate) fn storage(path: impl std::fmt::Display, message: impl std::fmt::Display) -> Self {
        Self::StorageError { path: path.to_string(), message: message.to_string() }
    }
}

/// A convenience result type for RAG operations.
pub type Result<T> = std::result::Result<T, RagError>;
