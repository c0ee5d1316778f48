//! Ollama HTTP clients: an embedding provider and a text generator.
//!
//! This module is only available when the `ollama` feature is enabled.

use async_stream::try_stream;
use async_trait::async_trait;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::config::OllamaConfig;
use crate::embedding::{EmbeddingProvider, check_vector, l2_normalize};
use crate::error::{RagError, Result};
use crate::synthesis::{NdjsonDecoder, TextGenerator, TextStream};

const PROVIDER: &str = "Ollama";

// ── Ollama API request/response types ──────────────────────────────

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: Vec<&'a str>,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Serialize)]
struct GenerateOptions {
    temperature: f32,
    top_p: f32,
    repeat_penalty: f32,
}

/// Read a non-success response into a readable message.
async fn error_detail(response: reqwest::Response) -> String {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let detail = serde_json::from_str::<ErrorResponse>(&body).map(|e| e.error).unwrap_or(body);
    format!("server returned {status}: {detail}")
}

// ── Embeddings ─────────────────────────────────────────────────────

/// An [`EmbeddingProvider`] backed by an Ollama server's `/api/embed` endpoint.
///
/// Every returned vector is L2-normalized and checked against the declared
/// dimension before it leaves the provider.
///
/// # Example
///
/// ```rust,ignore
/// use docqa_rag::{OllamaConfig, OllamaEmbeddingProvider};
///
/// // Ask the server once for the model's output size.
/// let provider = OllamaEmbeddingProvider::detect(OllamaConfig::from_env()).await?;
/// let embedding = provider.embed("hello world").await?;
/// ```
pub struct OllamaEmbeddingProvider {
    client: reqwest::Client,
    config: OllamaConfig,
    dimensions: usize,
}

impl OllamaEmbeddingProvider {
    /// Create a provider for a model whose output dimension is already known.
    pub fn new(config: OllamaConfig, dimensions: usize) -> Self {
        Self { client: reqwest::Client::new(), config, dimensions }
    }

    /// Create a provider, probing the server once to learn the model's dimension.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::EmbeddingError`] if the server is unreachable or the
    /// probe returns no vector.
    pub async fn detect(config: OllamaConfig) -> Result<Self> {
        let client = reqwest::Client::new();
        let probe = request_embeddings(&client, &config, &["dimension probe"]).await?;
        let dimensions = probe
            .into_iter()
            .next()
            .map(|v| v.len())
            .filter(|len| *len > 0)
            .ok_or_else(|| RagError::embedding(PROVIDER, "probe returned no embedding"))?;
        info!(model = %config.embedding_model, dimensions, "detected embedding dimension");
        Ok(Self { client, config, dimensions })
    }
}

async fn request_embeddings(
    client: &reqwest::Client,
    config: &OllamaConfig,
    texts: &[&str],
) -> Result<Vec<Vec<f32>>> {
    let body = EmbedRequest { model: &config.embedding_model, input: texts.to_vec() };

    let response =
        client.post(config.endpoint("api/embed")).json(&body).send().await.map_err(|e| {
            error!(provider = PROVIDER, error = %e, "request failed");
            RagError::embedding(PROVIDER, format!("request failed: {e}"))
        })?;

    if !response.status().is_success() {
        let detail = error_detail(response).await;
        error!(provider = PROVIDER, %detail, "API error");
        return Err(RagError::embedding(PROVIDER, detail));
    }

    let parsed: EmbedResponse = response.json().await.map_err(|e| {
        error!(provider = PROVIDER, error = %e, "failed to parse response");
        RagError::embedding(PROVIDER, format!("failed to parse response: {e}"))
    })?;
    Ok(parsed.embeddings)
}

#[async_trait]
impl EmbeddingProvider for OllamaEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let results = self.embed_batch(&[text]).await?;
        results
            .into_iter()
            .next()
            .ok_or_else(|| RagError::embedding(PROVIDER, "API returned empty response"))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!(
            provider = PROVIDER,
            batch_size = texts.len(),
            model = %self.config.embedding_model,
            "embedding batch"
        );

        let mut embeddings = request_embeddings(&self.client, &self.config, texts).await?;
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

// ── Generation ─────────────────────────────────────────────────────

/// A [`TextGenerator`] backed by an Ollama server's `/api/generate` endpoint.
///
/// [`generate`](TextGenerator::generate) asks for a single JSON object;
/// [`generate_stream`](TextGenerator::generate_stream) reads the
/// newline-delimited stream and yields each `response` fragment.
pub struct OllamaGenerator {
    client: reqwest::Client,
    config: OllamaConfig,
}

impl OllamaGenerator {
    pub fn new(config: OllamaConfig) -> Self {
        Self { client: reqwest::Client::new(), config }
    }

    fn request(&self, prompt: &str, stream: bool) -> reqwest::RequestBuilder {
        let body = GenerateRequest {
            model: &self.config.model,
            prompt,
            stream,
            options: GenerateOptions {
                temperature: self.config.temperature,
                top_p: self.config.top_p,
                repeat_penalty: self.config.repeat_penalty,
            },
        };
        self.client.post(self.config.endpoint("api/generate")).json(&body)
    }
}

async fn send(request: reqwest::RequestBuilder) -> Result<reqwest::Response> {
    let response = request.send().await.map_err(|e| {
        error!(provider = PROVIDER, error = %e, "generate request failed");
        RagError::SynthesisError(format!("request failed: {e}"))
    })?;

    if !response.status().is_success() {
        let detail = error_detail(response).await;
        error!(provider = PROVIDER, %detail, "generate API error");
        return Err(RagError::SynthesisError(detail));
    }
    Ok(response)
}

#[async_trait]
impl TextGenerator for OllamaGenerator {
    async fn generate(&self, prompt: &str) -> Result<String> {
        debug!(provider = PROVIDER, model = %self.config.model, "generating");
        let response = send(self.request(prompt, false)).await?;
        let body = response
            .bytes()
            .await
            .map_err(|e| RagError::SynthesisError(format!("failed to read response: {e}")))?;
        NdjsonDecoder::decode_all(&body)
    }

    async fn generate_stream(&self, prompt: &str) -> Result<TextStream> {
        debug!(provider = PROVIDER, model = %self.config.model, "generating (streamed)");
        let response = send(self.request(prompt, true)).await?;

        let stream = try_stream! {
            let mut decoder = NdjsonDecoder::new();
            let mut body = response.bytes_stream();

            while let Some(chunk) = body.next().await {
                let chunk = chunk
                    .map_err(|e| RagError::SynthesisError(format!("stream read failed: {e}")))?;
                for fragment in decoder.push(&chunk)? {
                    yield fragment;
                }
            }

            if let Some(fragment) = decoder.finish()? {
                yield fragment;
            }
        };

        Ok(Box::pin(stream))
    }

    fn model(&self) -> &str {
        &self.config.model
    }
}
