//! Document question answering over semantically retrieved chunks.
//!
//! This crate provides:
//! - Fixed-size and paragraph-aware chunking ([`FixedSizeChunker`], [`RecursiveChunker`])
//! - Embedding providers behind [`EmbeddingProvider`] (Ollama over HTTP,
//!   or in-process ONNX via `fastembed`)
//! - Cosine-similarity top-K ranking ([`rank`], [`cosine_similarity`])
//! - Persistence of chunks, embedded collections and summaries ([`CollectionStore`])
//! - The [`RagPipeline`] orchestrating ingestion, retrieval and answering
//! - Answer synthesis through a [`TextGenerator`] ([`AnswerSynthesizer`])
//!
//! # Features
//!
//! | Feature | Enables |
//! |---------|---------|
//! | `ollama` (default) | [`OllamaEmbeddingProvider`], [`OllamaGenerator`] |
//! | `fastembed` | [`FastEmbedProvider`] |
//! | `pdf` | PDF text extraction |

pub mod chunking;
pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod extract;
pub mod inmemory;
pub mod jsonfile;
pub mod pipeline;
pub mod similarity;
pub mod store;
pub mod synthesis;

#[cfg(feature = "fastembed")]
pub mod local;
#[cfg(feature = "ollama")]
pub mod ollama;

pub use chunking::{Chunker, FixedSizeChunker, RecursiveChunker, chunk_text};
pub use config::{OllamaConfig, RagConfig, RagConfigBuilder, SummaryConfig};
pub use document::{
    Chunk, Document, DocumentSummary, EmbeddedChunk, EmbeddedCollection, ScoredChunk, chunk_id,
};
pub use embedding::{EmbeddingProvider, ensure_dimensions, l2_normalize};
pub use error::{RagError, Result};
pub use extract::{DocumentFormat, MAX_UPLOAD_BYTES, extract_text, load_document};
pub use inmemory::InMemoryCollectionStore;
pub use jsonfile::JsonFileStore;
pub use pipeline::{Answer, AnswerStream, IngestReport, RagPipeline, RagPipelineBuilder};
pub use similarity::{cosine_similarity, rank};
pub use store::CollectionStore;
pub use synthesis::{
    AnswerSynthesizer, NdjsonDecoder, TextGenerator, TextStream, build_answer_prompt,
    build_summary_prompt, collect_stream,
};

#[cfg(feature = "fastembed")]
pub use local::FastEmbedProvider;
#[cfg(feature = "ollama")]
pub use ollama::{OllamaEmbeddingProvider, OllamaGenerator};
