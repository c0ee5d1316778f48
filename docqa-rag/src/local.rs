//! In-process sentence embeddings via `fastembed` (ONNX Runtime).
//!
//! This module is only available when the `fastembed` feature is enabled.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use tracing::{debug, error, info};

use crate::embedding::{EmbeddingProvider, LazyModel, check_vector, l2_normalize};
use crate::error::{RagError, Result};

const PROVIDER: &str = "FastEmbed";

/// Output size of `paraphrase-multilingual-MiniLM-L12-v2`.
const DEFAULT_DIMENSIONS: usize = 384;

type SharedModel = Arc<Mutex<TextEmbedding>>;

/// An [`EmbeddingProvider`] running a sentence-transformer model in process.
///
/// The default model is `sentence-transformers/paraphrase-multilingual-MiniLM-L12-v2`,
/// which mean-pools token representations; outputs are L2-normalized.
///
/// The model is loaded lazily on first use (which may download weights).
/// Loading happens at most once per provider: concurrent first callers all
/// await the same in-flight load. Inference runs on the blocking thread pool.
///
/// # Example
///
/// ```rust,ignore
/// use docqa_rag::FastEmbedProvider;
///
/// let provider = Arc::new(FastEmbedProvider::new());
/// provider.load().await?; // optional warm-up
/// let embedding = provider.embed("hola mundo").await?;
/// ```
pub struct FastEmbedProvider {
    model_kind: EmbeddingModel,
    dimensions: usize,
    cache_dir: Option<PathBuf>,
    show_download_progress: bool,
    loaded: LazyModel<SharedModel>,
}

impl Default for FastEmbedProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl FastEmbedProvider {
    /// Create a provider for the default multilingual paraphrase model.
    pub fn new() -> Self {
        Self::with_model(EmbeddingModel::ParaphraseMLMiniLML12V2, DEFAULT_DIMENSIONS)
    }

    /// Create a provider for another fastembed model with known output size.
    pub fn with_model(model: EmbeddingModel, dimensions: usize) -> Self {
        Self {
            model_kind: model,
            dimensions,
            cache_dir: None,
            show_download_progress: false,
            loaded: LazyModel::new(),
        }
    }

    /// Directory where downloaded model weights are cached.
    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = Some(dir.into());
        self
    }

    pub fn with_download_progress(mut self, show: bool) -> Self {
        self.show_download_progress = show;
        self
    }

    /// Whether the model has been loaded yet.
    pub fn is_loaded(&self) -> bool {
        self.loaded.is_loaded()
    }

    /// Load the model now instead of on first use.
    pub async fn load(&self) -> Result<()> {
        self.model().await.map(|_| ())
    }

    async fn model(&self) -> Result<SharedModel> {
        let mut options = InitOptions::new(self.model_kind.clone())
            .with_show_download_progress(self.show_download_progress);
        if let Some(dir) = &self.cache_dir {
            options = options.with_cache_dir(dir.clone());
        }
        let model_kind = self.model_kind.clone();

        let model = self
            .loaded
            .get_or_load(PROVIDER, move || {
                info!(provider = PROVIDER, model = ?model_kind, "loading embedding model");
                let loaded = TextEmbedding::try_new(options).map_err(|e| {
                    error!(provider = PROVIDER, error = %e, "model load failed");
                    RagError::embedding(PROVIDER, format!("failed to load model: {e}"))
                })?;
                info!(provider = PROVIDER, "embedding model ready");
                Ok(Arc::new(Mutex::new(loaded)))
            })
            .await?;
        Ok(Arc::clone(model))
    }
}

#[async_trait]
impl EmbeddingProvider for FastEmbedProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let results = self.embed_batch(&[text]).await?;
        results
            .into_iter()
            .next()
            .ok_or_else(|| RagError::embedding(PROVIDER, "model returned no embeddings"))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let model = self.model().await?;
        let owned: Vec<String> = texts.iter().map(|t| t.to_string()).collect();
        debug!(provider = PROVIDER, batch_size = owned.len(), "embedding batch");

        let mut embeddings = tokio::task::spawn_blocking(move || {
            let mut model =
                model.lock().map_err(|_| "embedding model lock poisoned".to_string())?;
            model.embed(owned, None).map_err(|e| e.to_string())
        })
        .await
        .map_err(|e| RagError::embedding(PROVIDER, format!("inference task failed: {e}")))?
        .map_err(|e| {
            error!(provider = PROVIDER, error = %e, "inference failed");
            RagError::embedding(PROVIDER, format!("inference failed: {e}"))
        })?;

        if embeddings.len() != texts.len() {
            return Err(RagError::embedding(
                PROVIDER,
                format!("requested {} embeddings, received {}", texts.len(), embeddings.len()),
            ));
        }

        for embedding in &mut embeddings {
            l2_normalize(embedding);
            check_vector(PROVIDER, self.dimensions, embedding)?;
        }
        Ok(embeddings)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn name(&self) -> &str {
        PROVIDER
    }
}
