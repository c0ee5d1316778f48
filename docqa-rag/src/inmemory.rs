//! In-memory collection store.
//!
//! This module provides [`InMemoryCollectionStore`], a store backed by a
//! `HashMap` protected by a `tokio::sync::RwLock`. It is suitable for tests,
//! demos, and short-lived processes that never need to reload a collection.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::document::{Chunk, DocumentSummary, EmbeddedCollection};
use crate::error::{RagError, Result};
use crate::store::{CollectionStore, validate_name};

#[derive(Debug, Default)]
struct Entries {
    chunks: HashMap<String, Vec<Chunk>>,
    collections: HashMap<String, EmbeddedCollection>,
    summaries: HashMap<String, DocumentSummary>,
}

/// An in-memory [`CollectionStore`].
///
/// All operations are async-safe via `tokio::sync::RwLock`.
///
/// # Example
///
/// ```rust,ignore
/// use docqa_rag::{CollectionStore, InMemoryCollectionStore};
///
/// let store = InMemoryCollectionStore::new();
/// store.save_collection(&collection).await?;
/// ```
#[derive(Debug, Default)]
pub struct InMemoryCollectionStore {
    entries: RwLock<Entries>,
}

impl InMemoryCollectionStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }
}

fn not_found(name: &str) -> RagError {
    RagError::CollectionNotFoundError { collection: name.to_string() }
}

#[async_trait]
impl CollectionStore for InMemoryCollectionStore {
    async fn save_chunks(&self, document: &str, chunks: &[Chunk]) -> Result<()> {
        validate_name(document)?;
        let mut entries = self.entries.write().await;
        entries.chunks.insert(document.to_string(), chunks.to_vec());
        Ok(())
    }

    async fn load_chunks(&self, document: &str) -> Result<Vec<Chunk>> {
        let entries = self.entries.read().await;
        entries.chunks.get(document).cloned().ok_or_else(|| not_found(document))
    }

    async fn save_collection(&self, collection: &EmbeddedCollection) -> Result<()> {
        validate_name(collection.name())?;
        let mut entries = self.entries.write().await;
        entries.collections.insert(collection.name().to_string(), collection.clone());
        Ok(())
    }

    async fn load_collection(&self, name: &str) -> Result<EmbeddedCollection> {
        let entries = self.entries.read().await;
        entries.collections.get(name).cloned().ok_or_else(|| not_found(name))
    }

    async fn save_summary(&self, summary: &DocumentSummary) -> Result<()> {
        validate_name(&summary.document)?;
        let mut entries = self.entries.write().await;
        entries.summaries.insert(summary.document.clone(), summary.clone());
        Ok(())
    }

    async fn load_summary(&self, document: &str) -> Result<Option<DocumentSummary>> {
        let entries = self.entries.read().await;
        Ok(entries.summaries.get(document).cloned())
    }

    async fn delete_summary(&self, document: &str) -> Result<()> {
        let mut entries = self.entries.write().await;
        entries.summaries.remove(document);
        Ok(())
    }

    async fn list_collections(&self) -> Result<Vec<String>> {
        let entries = self.entries.read().await;
        let mut names: Vec<String> = entries.collections.keys().cloned().collect();
        names.sort();
        Ok(names)
    }
}
