//! Persistence boundary for chunks, embedded collections, and summaries.

use async_trait::async_trait;

use crate::document::{Chunk, DocumentSummary, EmbeddedCollection};
use crate::error::{RagError, Result};

/// A storage backend for ingested documents.
///
/// Each ingested document owns one chunk set, one [`EmbeddedCollection`]
/// and at most one [`DocumentSummary`], all keyed by the document name.
///
/// # Example
///
/// ```rust,ignore
/// use docqa_rag::{CollectionStore, JsonFileStore};
///
/// let store = JsonFileStore::new("./data");
/// store.save_collection(&collection).await?;
/// let loaded = store.load_collection("report.pdf").await?;
/// ```
#[async_trait]
pub trait CollectionStore: Send + Sync {
    /// Persist the raw (un-embedded) chunks of a document.
    async fn save_chunks(&self, document: &str, chunks: &[Chunk]) -> Result<()>;

    /// Load the raw chunks of a document.
    ///
    /// Returns [`RagError::CollectionNotFoundError`] if nothing was saved under `document`.
    async fn load_chunks(&self, document: &str) -> Result<Vec<Chunk>>;

    /// Persist an embedded collection, replacing any collection of the same name.
    async fn save_collection(&self, collection: &EmbeddedCollection) -> Result<()>;

    /// Load an embedded collection by name.
    ///
    /// Returns [`RagError::CollectionNotFoundError`] if it does not exist, and
    /// [`RagError::StorageError`] if it exists but cannot be read or parsed.
    async fn load_collection(&self, name: &str) -> Result<EmbeddedCollection>;

    /// Persist a document summary.
    async fn save_summary(&self, summary: &DocumentSummary) -> Result<()>;

    /// Load the summary for a document, if one was generated.
    async fn load_summary(&self, document: &str) -> Result<Option<DocumentSummary>>;

    /// Remove the summary for a document. Removing an absent summary succeeds.
    async fn delete_summary(&self, document: &str) -> Result<()>;

    /// Names of all persisted collections, sorted.
    async fn list_collections(&self) -> Result<Vec<String>>;
}

/// Reject names that cannot serve as a single path component.
pub(crate) fn validate_name(name: &str) -> Result<()> {
    let invalid = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\', '\0'])
        || name.trim() != name;
    if invalid {
        return Err(RagError::InputError(format!("invalid document name '{name}'")));
    }
    Ok(())
}
