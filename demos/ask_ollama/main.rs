//! # Asking a Local Model
//!
//! Ingests a markdown document into a JSON store, then streams an answer
//! from an Ollama server.
//!
//! Needs a running Ollama with `nomic-embed-text` and `gemma` pulled
//! (`OLLAMA_HOST`, `DOCQA_MODEL` and `DOCQA_EMBEDDING_MODEL` override them).
//!
//! Run: `cargo run -p docqa-demos --example ask_ollama`

use std::io::Write;
use std::sync::Arc;

use docqa_rag::{
    AnswerSynthesizer, Document, JsonFileStore, OllamaConfig, OllamaEmbeddingProvider,
    OllamaGenerator, RagConfig, RagPipeline, RecursiveChunker,
};
use futures::StreamExt;

const HANDBOOK: &str = "# Travel policy

Employees book flights through the internal portal. Economy class is the default
for trips under six hours.

## Expenses

Meals are reimbursed up to 60 EUR per day. Receipts must be uploaded within
30 days of returning.

## Approvals

Trips abroad need written approval from a department head before booking.";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter("docqa_rag=debug").init();

    let ollama = OllamaConfig::from_env();
    let data_dir = std::env::temp_dir().join("docqa-ask-ollama");

    let embedder = OllamaEmbeddingProvider::detect(ollama.clone()).await?;
    let generator = Arc::new(OllamaGenerator::new(ollama));

    let pipeline = RagPipeline::builder()
        .config(RagConfig::builder().chunk_size(200).top_k(2).build()?)
        .embedding_provider(Arc::new(embedder))
        .store(Arc::new(JsonFileStore::new(&data_dir)))
        .chunker(Arc::new(RecursiveChunker::new(200)?))
        .synthesizer(Arc::new(AnswerSynthesizer::new(generator)))
        .build()?;

    let report = pipeline.ingest(&Document::new("handbook.md", HANDBOOK)).await?;
    println!("Stored {} chunks under {}", report.chunk_count, data_dir.display());

    let question = "How long do I have to upload receipts?";
    let mut answer = pipeline.ask_stream("handbook.md", question).await?;

    println!("\nContext:");
    for chunk in &answer.context {
        println!("  [{:.3}] {}", chunk.score, chunk.id());
    }

    println!("\nQ: {question}\nA: ");
    let mut stdout = std::io::stdout();
    while let Some(fragment) = answer.stream.next().await {
        write!(stdout, "{}", fragment?)?;
        stdout.flush()?;
    }
    println!();

    Ok(())
}
