//! RAG pipeline orchestrator.
//!
//! The [`RagPipeline`] coordinates the full ingest-and-query workflow by
//! composing an [`EmbeddingProvider`], a [`CollectionStore`], a [`Chunker`],
//! and an optional [`AnswerSynthesizer`].
//!
//! # Example
//!
//! ```rust,ignore
//! use docqa_rag::{RagPipeline, RagConfig, JsonFileStore, FixedSizeChunker};
//!
//! let pipeline = RagPipeline::builder()
//!     .config(RagConfig::default())
//!     .embedding_provider(Arc::new(my_embedder))
//!     .store(Arc::new(JsonFileStore::new("./data")))
//!     .chunker(Arc::new(FixedSizeChunker::new(1200)?))
//!     .build()?;
//!
//! pipeline.ingest(&document).await?;
//! let results = pipeline.query("report.pdf", "who signed it?").await?;
//! ```

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::chunking::{Chunker, FixedSizeChunker};
use crate::config::RagConfig;
use crate::document::{Document, DocumentSummary, EmbeddedChunk, EmbeddedCollection, ScoredChunk};
use crate::embedding::{EmbeddingProvider, ensure_dimensions};
use crate::error::{RagError, Result};
use crate::similarity::rank;
use crate::store::CollectionStore;
use crate::synthesis::{AnswerSynthesizer, TextStream};

/// Outcome of ingesting one document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IngestReport {
    /// The document, which is also the collection name.
    pub document: String,
    pub chunk_count: usize,
    /// Embedding dimension of the stored collection.
    pub dimensions: usize,
    pub summary_generated: bool,
}

/// A synthesized answer with the context it was built from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
    pub text: String,
    pub context: Vec<ScoredChunk>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

/// A streamed answer: the context is known up front, the text arrives as fragments.
pub struct AnswerStream {
    pub context: Vec<ScoredChunk>,
    pub summary: Option<String>,
    pub stream: TextStream,
}

/// The RAG pipeline orchestrator.
///
/// Coordinates document ingestion (chunk → embed → store) and query
/// execution (embed → rank → filter). Construct one via [`RagPipeline::builder()`].
///
/// Embedding and ranking failures are propagated unchanged, so callers can
/// tell a missing collection ([`RagError::CollectionNotFoundError`]) apart
/// from a model or computation failure.
pub struct RagPipeline {
    config: RagConfig,
    embedding_provider: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn CollectionStore>,
    chunker: Arc<dyn Chunker>,
    synthesizer: Option<Arc<AnswerSynthesizer>>,
    summarize_on_ingest: bool,
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

    /// Return a reference to the collection store.
    pub fn store(&self) -> &Arc<dyn CollectionStore> {
        &self.store
    }

    /// Ingest a single document: chunk → embed → persist chunks and collection,
    /// then summarize if a synthesizer is configured.
    ///
    /// Nothing is written until every embedding has been validated, so a failed
    /// ingestion leaves any earlier ingestion of the same name untouched.
    ///
    /// Summary failures are logged and reported as `summary_generated: false`;
    /// in that case any summary stored by an earlier ingestion is removed.
    /// Every other failure aborts ingestion.
    ///
    /// # Errors
    ///
    /// - [`RagError::InputError`] if the document text is blank.
    /// - [`RagError::EmbeddingError`] if embedding fails or returns the wrong shape.
    /// - [`RagError::StorageError`] if persisting fails.
    pub async fn ingest(&self, document: &Document) -> Result<IngestReport> {
        if document.text.trim().is_empty() {
            return Err(RagError::InputError(format!("document '{}' has no text", document.name)));
        }

        // 1. Chunk
        let chunks = self.chunker.chunk(document)?;

        // 2. Embed every chunk in order
        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        let embeddings = self.embedding_provider.embed_batch(&texts).await.map_err(|e| {
            error!(document = %document.name, error = %e, "embedding failed during ingestion");
            e
        })?;
        if embeddings.len() != chunks.len() {
            return Err(RagError::embedding(
                self.embedding_provider.name(),
                format!("expected {} embeddings, received {}", chunks.len(), embeddings.len()),
            ));
        }

        // 3. Validate at the boundary, then attach
        let mut embedded = Vec::with_capacity(chunks.len());
        for (chunk, embedding) in chunks.iter().zip(embeddings) {
            ensure_dimensions(self.embedding_provider.as_ref(), &embedding)?;
            embedded.push(EmbeddedChunk::new(chunk.clone(), embedding));
        }
        let collection = EmbeddedCollection::new(document.name.clone(), embedded)?;

        // 4. Persist chunks and collection only once both are known to be valid
        self.store.save_chunks(&document.name, &chunks).await?;
        self.store.save_collection(&collection).await.map_err(|e| {
            error!(document = %document.name, error = %e, "failed to persist collection");
            e
        })?;

        // 5. Optional summary; a stale one from an earlier ingestion never survives
        let summary_generated = self.summarize(document).await;
        if !summary_generated {
            self.store.delete_summary(&document.name).await?;
        }

        let report = IngestReport {
            document: document.name.clone(),
            chunk_count: collection.len(),
            dimensions: collection.dimensions(),
            summary_generated,
        };
        info!(
            document = %report.document,
            chunk_count = report.chunk_count,
            dimensions = report.dimensions,
            summary_generated,
            "ingested document"
        );
        Ok(report)
    }

    async fn summarize(&self, document: &Document) -> bool {
        let Some(synthesizer) = self.synthesizer.as_ref().filter(|_| self.summarize_on_ingest)
        else {
            return false;
        };

        let saved = match synthesizer.summarize(&document.text).await {
            Ok(text) => {
                let summary = DocumentSummary { document: document.name.clone(), text };
                self.store.save_summary(&summary).await
            }
            Err(e) => Err(e),
        };

        match saved {
            Ok(()) => true,
            Err(e) => {
                warn!(document = %document.name, error = %e, "summary generation failed");
                false
            }
        }
    }

    /// Return the `top_k` chunks of `collection` most similar to `query`.
    ///
    /// # Errors
    ///
    /// - [`RagError::InputError`] if `top_k` is zero or `query` is blank.
    /// - [`RagError::EmptyCollectionError`] if the collection has no chunks.
    /// - [`RagError::EmbeddingError`] if the query cannot be embedded.
    /// - [`RagError::DimensionMismatchError`] if the collection was embedded
    ///   with a model of a different dimension.
    pub async fn retrieve(
        &self,
        query: &str,
        collection: &EmbeddedCollection,
        top_k: usize,
    ) -> Result<Vec<ScoredChunk>> {
        if top_k == 0 {
            return Err(RagError::InputError("top_k must be greater than zero".to_string()));
        }
        if query.trim().is_empty() {
            return Err(RagError::InputError("query must not be blank".to_string()));
        }
        if collection.is_empty() {
            return Err(RagError::EmptyCollectionError {
                collection: collection.name().to_string(),
            });
        }

        let query_embedding = self.embedding_provider.embed(query).await.map_err(|e| {
            error!(error = %e, "embedding failed during query");
            e
        })?;
        ensure_dimensions(self.embedding_provider.as_ref(), &query_embedding)?;

        let results = rank(&query_embedding, collection.chunks(), top_k)?;
        info!(collection = collection.name(), result_count = results.len(), "retrieval completed");
        Ok(results)
    }

    /// Load the named collection from the store, then [`retrieve`](Self::retrieve).
    ///
    /// # Errors
    ///
    /// Returns [`RagError::CollectionNotFoundError`] if no such collection was
    /// persisted, plus everything [`retrieve`](Self::retrieve) returns.
    pub async fn retrieve_from(
        &self,
        query: &str,
        collection: &str,
        top_k: usize,
    ) -> Result<Vec<ScoredChunk>> {
        let loaded = self.store.load_collection(collection).await?;
        self.retrieve(query, &loaded, top_k).await
    }

    /// Retrieve with the configured `top_k`, dropping results below the
    /// configured similarity threshold (if any).
    pub async fn query(&self, collection: &str, query: &str) -> Result<Vec<ScoredChunk>> {
        let results = self.retrieve_from(query, collection, self.config.top_k).await?;
        Ok(match self.config.similarity_threshold {
            Some(threshold) => results.into_iter().filter(|r| r.score >= threshold).collect(),
            None => results,
        })
    }

    fn synthesizer(&self) -> Result<&Arc<AnswerSynthesizer>> {
        self.synthesizer.as_ref().ok_or_else(|| {
            RagError::ConfigError("no answer synthesizer configured for this pipeline".to_string())
        })
    }

    /// Answer `query` from the named collection and its summary (if stored).
    pub async fn ask(&self, collection: &str, query: &str) -> Result<Answer> {
        let synthesizer = self.synthesizer()?;
        let context = self.query(collection, query).await?;
        let summary = self.store.load_summary(collection).await?.map(|s| s.text);

        let text = synthesizer.answer(query, &context, summary.as_deref()).await?;
        info!(collection, context_chunks = context.len(), "answered query");
        Ok(Answer { text, context, summary })
    }

    /// Like [`ask`](Self::ask), but streams the answer text.
    pub async fn ask_stream(&self, collection: &str, query: &str) -> Result<AnswerStream> {
        let synthesizer = self.synthesizer()?;
        let context = self.query(collection, query).await?;
        let summary = self.store.load_summary(collection).await?.map(|s| s.text);

        let stream = synthesizer.answer_stream(query, &context, summary.as_deref()).await?;
        Ok(AnswerStream { context, summary, stream })
    }
}

/// Builder for constructing a [`RagPipeline`].
///
/// `embedding_provider` and `store` are required. Without an explicit chunker
/// the pipeline uses a [`FixedSizeChunker`] sized by `config.chunk_size`.
///
/// # Example
///
/// ```rust,ignore
/// let pipeline = RagPipeline::builder()
///     .config(RagConfig::default())
///     .embedding_provider(Arc::new(embedder))
///     .store(Arc::new(store))
///     .synthesizer(Arc::new(synthesizer))  // optional
///     .build()?;
/// ```
pub struct RagPipelineBuilder {
    config: Option<RagConfig>,
    embedding_provider: Option<Arc<dyn EmbeddingProvider>>,
    store: Option<Arc<dyn CollectionStore>>,
    chunker: Option<Arc<dyn Chunker>>,
    synthesizer: Option<Arc<AnswerSynthesizer>>,
    summarize_on_ingest: bool,
}

impl Default for RagPipelineBuilder {
    fn default() -> Self {
        Self {
            config: None,
            embedding_provider: None,
            store: None,
            chunker: None,
            synthesizer: None,
            summarize_on_ingest: true,
        }
    }
}

impl RagPipelineBuilder {
    /// Set the pipeline configuration. Defaults to [`RagConfig::default()`].
    pub fn config(mut self, config: RagConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the embedding provider.
    pub fn embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedding_provider = Some(provider);
        self
    }

    /// Set the collection store.
    pub fn store(mut self, store: Arc<dyn CollectionStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Set the document chunker.
    pub fn chunker(mut self, chunker: Arc<dyn Chunker>) -> Self {
        self.chunker = Some(chunker);
        self
    }

    /// Set the answer synthesizer used by `ask` and by summary generation.
    pub fn synthesizer(mut self, synthesizer: Arc<AnswerSynthesizer>) -> Self {
        self.synthesizer = Some(synthesizer);
        self
    }

    /// Whether `ingest` generates a summary when a synthesizer is set. Defaults to `true`.
    pub fn summarize_on_ingest(mut self, enabled: bool) -> Self {
        self.summarize_on_ingest = enabled;
        self
    }

    /// Build the [`RagPipeline`], validating that all required fields are set.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if a required field is missing, or
    /// [`RagError::InputError`] if the default chunker cannot be built.
    pub fn build(self) -> Result<RagPipeline> {
        let config = self.config.unwrap_or_default();
        let embedding_provider = self
            .embedding_provider
            .ok_or_else(|| RagError::ConfigError("embedding_provider is required".to_string()))?;
        let store =
            self.store.ok_or_else(|| RagError::ConfigError("store is required".to_string()))?;
        let chunker: Arc<dyn Chunker> = match self.chunker {
            Some(chunker) => chunker,
            None => Arc::new(FixedSizeChunker::new(config.chunk_size)?),
        };

        Ok(RagPipeline {
            config,
            embedding_provider,
            store,
            chunker,
            synthesizer: self.synthesizer,
            summarize_on_ingest: self.summarize_on_ingest,
        })
    }
}
