//! Shared test doubles.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use docqa_rag::{EmbeddingProvider, RagError, Result, TextGenerator};

/// Embeds text by looking up exact strings; unknown text maps to the zero vector.
pub struct TableEmbeddingProvider {
    table: HashMap<String, Vec<f32>>,
    dimensions: usize,
    pub calls: AtomicUsize,
}

impl TableEmbeddingProvider {
    pub fn new(dimensions: usize, entries: &[(&str, &[f32])]) -> Self {
        let table = entries.iter().map(|(text, v)| (text.to_string(), v.to_vec())).collect();
        Self { table, dimensions, calls: AtomicUsize::new(0) }
    }
}

#[async_trait]
impl EmbeddingProvider for TableEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.table.get(text).cloned().unwrap_or_else(|| vec![0.0; self.dimensions]))
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn name(&self) -> &str {
        "table"
    }
}

/// Deterministic hash-based embeddings, L2-normalized.
pub struct HashEmbeddingProvider {
    pub dimensions: usize,
}

#[async_trait]
impl EmbeddingProvider for HashEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let hash = text.bytes().fold(0u64, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u64));
        let mut emb: Vec<f32> =
            (0..self.dimensions).map(|i| ((hash.wrapping_add(i as u64)) as f32).sin()).collect();
        docqa_rag::l2_normalize(&mut emb);
        Ok(emb)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn name(&self) -> &str {
        "hash"
    }
}

/// Always fails, as a model that cannot be loaded would.
pub struct FailingEmbeddingProvider;

#[async_trait]
impl EmbeddingProvider for FailingEmbeddingProvider {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Err(RagError::EmbeddingError {
            provider: "failing".to_string(),
            message: "model weights unavailable".to_string(),
        })
    }

    fn dimensions(&self) -> usize {
        3
    }

    fn name(&self) -> &str {
        "failing"
    }
}

/// Records prompts and replies with a canned answer, or fails when `reply` is `None`.
pub struct ScriptedGenerator {
    pub reply: Option<String>,
    pub prompts: Mutex<Vec<String>>,
}

impl ScriptedGenerator {
    pub fn replying(reply: &str) -> Self {
        Self { reply: Some(reply.to_string()), prompts: Mutex::new(Vec::new()) }
    }

    pub fn failing() -> Self {
        Self { reply: None, prompts: Mutex::new(Vec::new()) }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.reply.clone().ok_or_else(|| RagError::SynthesisError("server unavailable".to_string()))
    }

    fn model(&self) -> &str {
        "scripted"
    }
}
