//! Answer synthesis: prompt assembly and the text-generation boundary.
//!
//! The generation server itself is an external collaborator reached through
//! the [`TextGenerator`] trait. Its wire format is newline-delimited JSON:
//! every line is an object whose `response` field carries the next fragment
//! of text. A non-streamed reply is the same object on a single line.
//! [`NdjsonDecoder`] turns raw body bytes into those fragments.

use std::borrow::Cow;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use serde::Deserialize;
use tracing::{debug, error};

use crate::config::SummaryConfig;
use crate::document::ScoredChunk;
use crate::error::{RagError, Result};

/// A stream of generated text fragments.
pub type TextStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// A text-generation backend.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generate the complete response for `prompt`.
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Generate the response for `prompt` as a stream of fragments.
    ///
    /// The default implementation yields the output of
    /// [`generate`](TextGenerator::generate) as a single fragment.
    async fn generate_stream(&self, prompt: &str) -> Result<TextStream> {
        let text = self.generate(prompt).await?;
        Ok(Box::pin(futures::stream::once(async move { Ok(text) })))
    }

    /// The model name, for logging.
    fn model(&self) -> &str;
}

#[derive(Debug, Deserialize)]
struct GenerateLine {
    #[serde(default)]
    response: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Incremental decoder for newline-delimited generation responses.
///
/// Bytes may arrive split at arbitrary positions (including inside a UTF-8
/// sequence); incomplete lines are buffered until their newline arrives.
#[derive(Debug, Default)]
pub struct NdjsonDecoder {
    buffer: Vec<u8>,
}

impl NdjsonDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk of body bytes, returning the fragments of every line it completed.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::SynthesisError`] if a line is not valid JSON or
    /// carries an `error` field.
    pub fn push(&mut self, bytes: &[u8]) -> Result<Vec<String>> {
        self.buffer.extend_from_slice(bytes);
        let mut fragments = Vec::new();
        while let Some(newline) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=newline).collect();
            if let Some(fragment) = decode_line(&line)? {
                fragments.push(fragment);
            }
        }
        Ok(fragments)
    }

    /// Decode whatever remains after the body ended without a trailing newline.
    pub fn finish(&mut self) -> Result<Option<String>> {
        let rest = std::mem::take(&mut self.buffer);
        decode_line(&rest)
    }

    /// Decode a complete body in one go and concatenate its fragments.
    pub fn decode_all(body: &[u8]) -> Result<String> {
        let mut decoder = Self::new();
        let mut text = decoder.push(body)?.concat();
        if let Some(last) = decoder.finish()? {
            text.push_str(&last);
        }
        Ok(text)
    }
}

fn decode_line(line: &[u8]) -> Result<Option<String>> {
    let line = std::str::from_utf8(line)
        .map_err(|e| RagError::SynthesisError(format!("response line is not UTF-8: {e}")))?
        .trim();
    if line.is_empty() {
        return Ok(None);
    }

    let parsed: GenerateLine = serde_json::from_str(line).map_err(|e| {
        error!(error = %e, "undecodable response line");
        RagError::SynthesisError(format!("undecodable response line: {e}"))
    })?;

    if let Some(message) = parsed.error {
        return Err(RagError::SynthesisError(format!("server reported: {message}")));
    }
    Ok(parsed.response.filter(|r| !r.is_empty()))
}

/// Keep at most `max_chars` characters of `text`, appending `...` when cut.
pub fn truncate_chars(text: &str, max_chars: usize) -> Cow<'_, str> {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => Cow::Owned(format!("{}...", &text[..cut])),
        None => Cow::Borrowed(text),
    }
}

/// Build the prompt asking the model to answer `query` from the retrieved context.
///
/// Context chunks appear in ranking order, separated by `\n---\n`.
pub fn build_answer_prompt(query: &str, context: &[ScoredChunk], summary: Option<&str>) -> String {
    let context = context.iter().map(ScoredChunk::text).collect::<Vec<_>>().join("\n---\n");

    let mut prompt = String::from(
        "You answer questions about a document using only the material below.\n\
         If the material does not contain the answer, say that the document does not \
         provide enough information. Reasonable inferences are allowed; say when an \
         answer is inferred rather than stated.\n",
    );

    if let Some(summary) = summary.filter(|s| !s.trim().is_empty()) {
        prompt.push_str("\nDOCUMENT SUMMARY:\n");
        prompt.push_str(summary.trim());
        prompt.push_str("\n---\n");
    }

    prompt.push_str("\nRELEVANT EXCERPTS:\n");
    prompt.push_str(&context);
    prompt.push_str("\n\nQUESTION: ");
    prompt.push_str(query);
    prompt.push_str("\n\nANSWER:\n");
    prompt
}

/// Build the prompt asking the model to summarize a document.
pub fn build_summary_prompt(text: &str, max_chars: usize) -> String {
    format!(
        "Write a structured summary of the following document covering its main topic, \
         key points, and conclusions.\n\nDOCUMENT:\n{}\n\nSUMMARY:\n",
        truncate_chars(text, max_chars)
    )
}

/// Turns retrieved chunks (plus an optional summary) into an answer via a [`TextGenerator`].
///
/// # Example
///
/// ```rust,ignore
/// use docqa_rag::{AnswerSynthesizer, OllamaConfig, OllamaGenerator};
///
/// let synthesizer = AnswerSynthesizer::new(Arc::new(OllamaGenerator::new(OllamaConfig::default())));
/// let answer = synthesizer.answer("Who wrote it?", &results, None).await?;
/// ```
pub struct AnswerSynthesizer {
    generator: Arc<dyn TextGenerator>,
    summary_config: SummaryConfig,
}

impl AnswerSynthesizer {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator, summary_config: SummaryConfig::default() }
    }

    pub fn with_summary_config(mut self, config: SummaryConfig) -> Self {
        self.summary_config = config;
        self
    }

    pub fn generator(&self) -> &Arc<dyn TextGenerator> {
        &self.generator
    }

    /// Answer `query` from `context`. The returned text is trimmed.
    ///
    /// # Errors
    ///
    /// Propagates [`RagError::SynthesisError`] from the generator.
    pub async fn answer(
        &self,
        query: &str,
        context: &[ScoredChunk],
        summary: Option<&str>,
    ) -> Result<String> {
        let prompt = build_answer_prompt(query, context, summary);
        debug!(
            model = self.generator.model(),
            context_chunks = context.len(),
            has_summary = summary.is_some(),
            prompt_len = prompt.len(),
            "requesting answer"
        );
        let answer = self.generator.generate(&prompt).await?;
        Ok(answer.trim().to_string())
    }

    /// Like [`answer`](Self::answer) but yields fragments as the server produces them.
    pub async fn answer_stream(
        &self,
        query: &str,
        context: &[ScoredChunk],
        summary: Option<&str>,
    ) -> Result<TextStream> {
        let prompt = build_answer_prompt(query, context, summary);
        self.generator.generate_stream(&prompt).await
    }

    /// Summarize a document.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::SynthesisError`] if the generator fails or returns only whitespace.
    pub async fn summarize(&self, text: &str) -> Result<String> {
        let prompt = build_summary_prompt(text, self.summary_config.max_chars);
        let summary = self.generator.generate(&prompt).await?;
        let summary = summary.trim();
        if summary.is_empty() {
            return Err(RagError::SynthesisError("model returned an empty summary".to_string()));
        }
        Ok(summary.to_string())
    }
}

/// Drain a [`TextStream`] into one string.
pub async fn collect_stream(mut stream: TextStream) -> Result<String> {
    let mut text = String::new();
    while let Some(fragment) = stream.next().await {
        text.push_str(&fragment?);
    }
    Ok(text)
}
