//! Embedding provider trait for generating vector embeddings from text.

use async_trait::async_trait;
use tokio::sync::OnceCell;

use crate::error::{RagError, Result};

/// A provider that generates fixed-length vector embeddings from text input.
///
/// Implementations wrap specific embedding backends (an in-process ONNX model,
/// an Ollama server, ...) behind a unified async interface. Every vector a
/// provider returns must have exactly [`dimensions()`](EmbeddingProvider::dimensions)
/// entries and should be L2-normalized.
///
/// Providers are constructed once by the process entry point and shared by
/// reference (`Arc<dyn EmbeddingProvider>`); any expensive model loading is
/// owned by the provider instance, never by process-global state.
///
/// # Example
///
/// ```rust,ignore
/// use docqa_rag::EmbeddingProvider;
///
/// let provider = MyEmbeddingProvider::new();
/// let embedding = provider.embed("hello world").await?;
/// assert_eq!(embedding.len(), provider.dimensions());
/// ```
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate an embedding vector for a single text input.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embedding vectors for a batch of text inputs, in input order.
    ///
    /// The default implementation calls [`embed`](EmbeddingProvider::embed)
    /// sequentially for each input. Override this method if the backend
    /// supports native batch embedding for better throughput.
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let mut results = Vec::with_capacity(texts.len());
        for text in texts {
            results.push(self.embed(text).await?);
        }
        Ok(results)
    }

    /// Return the dimensionality of embeddings produced by this provider.
    fn dimensions(&self) -> usize;

    /// A short name used in logs and error messages.
    fn name(&self) -> &str;
}

/// Check that `embedding` has the provider's declared dimension.
///
/// # Errors
///
/// Returns [`RagError::EmbeddingError`] when the lengths differ or the vector
/// contains non-finite values.
pub fn ensure_dimensions(provider: &dyn EmbeddingProvider, embedding: &[f32]) -> Result<()> {
    check_vector(provider.name(), provider.dimensions(), embedding)
}

pub(crate) fn check_vector(provider: &str, expected: usize, embedding: &[f32]) -> Result<()> {
    if embedding.len() != expected {
        return Err(RagError::embedding(
            provider,
            format!("expected {expected}-dimensional embedding, got {}", embedding.len()),
        ));
    }
    if embedding.iter().any(|x| !x.is_finite()) {
        return Err(RagError::embedding(provider, "embedding contains non-finite values"));
    }
    Ok(())
}

/// Scale `vector` to unit L2 norm in place. Zero vectors are left untouched.
pub fn l2_normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        vector.iter_mut().for_each(|x| *x /= norm);
    }
}

/// A model slot filled at most once by a blocking loader.
///
/// Concurrent first callers await the same in-flight load. A failed load
/// leaves the slot empty, so the next caller tries again.
#[cfg_attr(not(feature = "fastembed"), allow(dead_code))]
pub(crate) struct LazyModel<T> {
    cell: OnceCell<T>,
}

#[cfg_attr(not(feature = "fastembed"), allow(dead_code))]
impl<T: Send + Sync + 'static> LazyModel<T> {
    pub(crate) fn new() -> Self {
        Self { cell: OnceCell::new() }
    }

    pub(crate) fn is_loaded(&self) -> bool {
        self.cell.initialized()
    }

    /// Return the loaded value, running `load` on the blocking pool if the slot is empty.
    pub(crate) async fn get_or_load<F>(&self, provider: &str, load: F) -> Result<&T>
    where
        F: FnOnce() -> Result<T> + Send + 'static,
    {
        self.cell
            .get_or_try_init(|| async move {
                tokio::task::spawn_blocking(load).await.map_err(|e| {
                    RagError::embedding(provider, format!("load task failed: {e}"))
                })?
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;

    struct Fixed(Vec<f32>);

    #[async_trait]
    impl EmbeddingProvider for Fixed {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Ok(self.0.clone())
        }

        fn dimensions(&self) -> usize {
            3
        }

        fn name(&self) -> &str {
            "fixed"
        }
    }

    #[test]
    fn test_l2_normalize() {
        let mut v = vec![3.0, 4.0];
        l2_normalize(&mut v);
        assert!((v[0] - 0.6).abs() < 1e-6);
        assert!((v[1] - 0.8).abs() < 1e-6);

        let mut zero = vec![0.0, 0.0];
        l2_normalize(&mut zero);
        assert_eq!(zero, vec![0.0, 0.0]);
    }

    #[test]
    fn test_ensure_dimensions() {
        let provider = Fixed(vec![1.0, 0.0, 0.0]);
        assert!(ensure_dimensions(&provider, &[1.0, 0.0, 0.0]).is_ok());
        assert!(matches!(
            ensure_dimensions(&provider, &[1.0, 0.0]),
            Err(RagError::EmbeddingError { .. })
        ));
        assert!(matches!(
            ensure_dimensions(&provider, &[f32::NAN, 0.0, 0.0]),
            Err(RagError::EmbeddingError { .. })
        ));
    }

    #[tokio::test]
    async fn test_default_batch_preserves_order() {
        let provider = Fixed(vec![0.0, 1.0, 0.0]);
        let out = provider.embed_batch(&["a", "b"]).await.unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[1], vec![0.0, 1.0, 0.0]);
    }

    fn counting_loader(
        calls: &Arc<AtomicUsize>,
        value: u32,
    ) -> impl FnOnce() -> Result<u32> + Send + 'static {
        let calls = Arc::clone(calls);
        move || {
            calls.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(50));
            Ok(value)
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_lazy_model_loads_once_for_concurrent_callers() {
        let lazy = LazyModel::new();
        let calls = Arc::new(AtomicUsize::new(0));
        assert!(!lazy.is_loaded());

        let (a, b, c) = tokio::join!(
            lazy.get_or_load("test", counting_loader(&calls, 1)),
            lazy.get_or_load("test", counting_loader(&calls, 2)),
            lazy.get_or_load("test", counting_loader(&calls, 3)),
        );
        let (a, b, c) = (*a.unwrap(), *b.unwrap(), *c.unwrap());

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(a, b);
        assert_eq!(b, c);
        assert!(lazy.is_loaded());

        let again = *lazy.get_or_load("test", counting_loader(&calls, 9)).await.unwrap();
        assert_eq!(again, a);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_lazy_model_retries_after_failed_load() {
        let lazy: LazyModel<u32> = LazyModel::new();
        let failed = lazy
            .get_or_load("test", || Err(RagError::embedding("test", "weights unavailable")))
            .await;
        assert!(matches!(failed, Err(RagError::EmbeddingError { .. })));
        assert!(!lazy.is_loaded());

        assert_eq!(*lazy.get_or_load("test", || Ok(7)).await.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_lazy_model_panicking_loader_is_embedding_error() {
        let lazy: LazyModel<u32> = LazyModel::new();
        let result = lazy.get_or_load("test", || panic!("corrupt weights")).await;
        assert!(matches!(result, Err(RagError::EmbeddingError { .. })));
    }
}
