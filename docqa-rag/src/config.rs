//! Configuration for the RAG pipeline and the answer-generation server.

use serde::{Deserialize, Serialize};

use crate::error::{RagError, Result};

/// Default chunk size in characters.
pub const DEFAULT_CHUNK_SIZE: usize = 1200;

/// Default number of chunks handed to the answer synthesizer.
pub const DEFAULT_TOP_K: usize = 3;

/// Configuration parameters for the RAG pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RagConfig {
    /// Maximum chunk size in characters.
    pub chunk_size: usize,
    /// Number of top results to return from retrieval.
    pub top_k: usize,
    /// Minimum similarity score for results. `None` keeps everything the ranker returns.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub similarity_threshold: Option<f32>,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self { chunk_size: DEFAULT_CHUNK_SIZE, top_k: DEFAULT_TOP_K, similarity_threshold: None }
    }
}

impl RagConfig {
    /// Create a new builder for constructing a [`RagConfig`].
    pub fn builder() -> RagConfigBuilder {
        RagConfigBuilder::default()
    }
}

/// Builder for constructing a validated [`RagConfig`].
#[derive(Debug, Clone, Default)]
pub struct RagConfigBuilder {
    config: RagConfig,
}

impl RagConfigBuilder {
    /// Set the maximum chunk size in characters.
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.config.chunk_size = size;
        self
    }

    /// Set the number of top results to return from retrieval.
    pub fn top_k(mut self, k: usize) -> Self {
        self.config.top_k = k;
        self
    }

    /// Set the minimum similarity threshold for filtering results.
    pub fn similarity_threshold(mut self, threshold: f32) -> Self {
        self.config.similarity_threshold = Some(threshold);
        self
    }

    /// Build the [`RagConfig`], validating that parameters are consistent.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if:
    /// - `chunk_size == 0`
    /// - `top_k == 0`
    /// - the similarity threshold lies outside `[-1, 1]`
    pub fn build(self) -> Result<RagConfig> {
        if self.config.chunk_size == 0 {
            return Err(RagError::ConfigError("chunk_size must be greater than zero".to_string()));
        }
        if self.config.top_k == 0 {
            return Err(RagError::ConfigError("top_k must be greater than zero".to_string()));
        }
        if let Some(threshold) = self.config.similarity_threshold {
            if !(-1.0..=1.0).contains(&threshold) {
                return Err(RagError::ConfigError(format!(
                    "similarity_threshold ({threshold}) must lie within [-1, 1]"
                )));
            }
        }
        Ok(self.config)
    }
}

/// Default Ollama endpoint.
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

/// Connection and sampling settings for an Ollama server.
///
/// Used both by the answer generator and by the HTTP embedding provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OllamaConfig {
    /// Base URL of the server, without a trailing slash.
    pub base_url: String,
    /// Model used for answer and summary generation.
    pub model: String,
    /// Model used by the HTTP embedding provider.
    pub embedding_model: String,
    pub temperature: f32,
    pub top_p: f32,
    pub repeat_penalty: f32,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_OLLAMA_URL.to_string(),
            model: "gemma".to_string(),
            embedding_model: "nomic-embed-text".to_string(),
            temperature: 0.3,
            top_p: 0.8,
            repeat_penalty: 1.1,
        }
    }
}

impl OllamaConfig {
    /// Build a config from defaults overridden by `OLLAMA_HOST`, `DOCQA_MODEL`
    /// and `DOCQA_EMBEDDING_MODEL`.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(host) = std::env::var("OLLAMA_HOST") {
            config = config.with_base_url(host);
        }
        if let Ok(model) = std::env::var("DOCQA_MODEL") {
            config.model = model;
        }
        if let Ok(model) = std::env::var("DOCQA_EMBEDDING_MODEL") {
            config.embedding_model = model;
        }
        config
    }

    /// Set the server base URL. A trailing `/` is stripped, and `http://` is
    /// assumed when the URL has no scheme (`OLLAMA_HOST=127.0.0.1:11434`).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        let url = url.into();
        let url = url.trim().trim_end_matches('/');
        self.base_url =
            if url.contains("://") { url.to_string() } else { format!("http://{url}") };
        self
    }

    /// Set the generation model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the embedding model.
    pub fn with_embedding_model(mut self, model: impl Into<String>) -> Self {
        self.embedding_model = model.into();
        self
    }

    /// Set the sampling temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Join `path` onto the base URL.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

/// Settings for document summary generation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SummaryConfig {
    /// Documents longer than this many characters are truncated before prompting.
    pub max_chars: usize,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self { max_chars: 8000 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = RagConfig::builder().build().unwrap();
        assert_eq!(config, RagConfig::default());
        assert_eq!(config.chunk_size, 1200);
        assert_eq!(config.top_k, 3);
        assert!(config.similarity_threshold.is_none());
    }

    #[test]
    fn test_zero_values_rejected() {
        assert!(matches!(
            RagConfig::builder().chunk_size(0).build(),
            Err(RagError::ConfigError(_))
        ));
        assert!(matches!(RagConfig::builder().top_k(0).build(), Err(RagError::ConfigError(_))));
        assert!(matches!(
            RagConfig::builder().similarity_threshold(1.5).build(),
            Err(RagError::ConfigError(_))
        ));
    }

    #[test]
    fn test_ollama_base_url_without_scheme_gets_http() {
        let config = OllamaConfig::default().with_base_url("127.0.0.1:11434");
        assert_eq!(config.base_url, "http://127.0.0.1:11434");
        assert_eq!(config.endpoint("api/embed"), "http://127.0.0.1:11434/api/embed");

        let config = OllamaConfig::default().with_base_url("0.0.0.0:11434/");
        assert_eq!(config.base_url, "http://0.0.0.0:11434");

        let config = OllamaConfig::default().with_base_url("https://ollama.internal");
        assert_eq!(config.base_url, "https://ollama.internal");
    }

    #[test]
    fn test_ollama_endpoint_joins_cleanly() {
        let config = OllamaConfig::default().with_base_url("http://host:1234/");
        assert_eq!(config.base_url, "http://host:1234");
        assert_eq!(config.endpoint("/api/generate"), "http://host:1234/api/generate");
        assert_eq!(config.endpoint("api/embed"), "http://host:1234/api/embed");
    }
}
