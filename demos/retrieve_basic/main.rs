//! # Retrieval Basics
//!
//! Ingests a few short documents, then ranks their chunks against queries.
//!
//! Uses `InMemoryCollectionStore`, `FixedSizeChunker`, and a deterministic
//! `HashEmbeddingProvider`, so no model server is needed.
//!
//! Run: `cargo run -p docqa-demos --example retrieve_basic`

use std::sync::Arc;

use docqa_rag::{
    Document, EmbeddingProvider, FixedSizeChunker, InMemoryCollectionStore, RagConfig,
    RagPipeline, l2_normalize,
};

// ---------------------------------------------------------------------------
// HashEmbeddingProvider: content-dependent but meaningless vectors
// ---------------------------------------------------------------------------

struct HashEmbeddingProvider {
    dimensions: usize,
}

#[async_trait::async_trait]
impl EmbeddingProvider for HashEmbeddingProvider {
    async fn embed(&self, text: &str) -> docqa_rag::Result<Vec<f32>> {
        let hash = text.bytes().fold(0u64, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u64));
        let mut emb: Vec<f32> =
            (0..self.dimensions).map(|i| ((hash.wrapping_add(i as u64)) as f32).sin()).collect();
        l2_normalize(&mut emb);
        Ok(emb)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn name(&self) -> &str {
        "hash"
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter("docqa_rag=info").init();

    // -- 1. Configure the pipeline ----------------------------------------
    // 120-character chunks keep each document to a handful of chunks; the
    // three best matches are returned per query.
    let config = RagConfig::builder().chunk_size(120).top_k(3).build()?;

    let pipeline = RagPipeline::builder()
        .config(config)
        .embedding_provider(Arc::new(HashEmbeddingProvider { dimensions: 64 }))
        .store(Arc::new(InMemoryCollectionStore::new()))
        .chunker(Arc::new(FixedSizeChunker::new(120)?))
        .build()?;

    // -- 2. Ingest sample documents ---------------------------------------
    let documents = [
        Document::new(
            "rust.txt",
            "Rust is a systems programming language focused on safety, speed, and \
             concurrency. It achieves memory safety without a garbage collector through \
             its ownership system.",
        ),
        Document::new(
            "retrieval.md",
            "Retrieval-augmented generation splits documents into chunks and embeds each \
             one. At question time the closest chunks are found by cosine similarity and \
             handed to a language model as context.",
        ),
    ];

    for doc in &documents {
        let report = pipeline.ingest(doc).await?;
        println!("{} -> {} chunk(s), {} dims", report.document, report.chunk_count, report.dimensions);
    }

    // -- 3. Query each collection -----------------------------------------
    let queries = [("rust.txt", "memory safety"), ("retrieval.md", "cosine similarity")];

    for (collection, query) in queries {
        println!("\n{collection}: \"{query}\"");
        for (i, result) in pipeline.query(collection, query).await?.iter().enumerate() {
            let preview: String = result.text().chars().take(60).collect();
            println!("  {}. [score={:.4}] {} | {preview}", i + 1, result.score, result.id());
        }
    }

    Ok(())
}
