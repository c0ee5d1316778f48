//! docqa - ingest documents and ask questions about them.
//!
//! # Commands
//!
//! ```bash
//! # Chunk, embed and persist a PDF (also generates a summary)
//! docqa ingest report.pdf --format pdf
//!
//! # Show the most similar chunks as JSON
//! docqa search report.pdf "who signed the contract?"
//!
//! # Answer a question from the retrieved chunks
//! docqa ask report.pdf "who signed the contract?" --stream
//!
//! # List ingested collections
//! docqa list
//! ```

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use docqa_rag::{
    AnswerSynthesizer, Chunker, CollectionStore, DocumentFormat, EmbeddingProvider,
    FixedSizeChunker, JsonFileStore, OllamaConfig, OllamaEmbeddingProvider, OllamaGenerator,
    RagConfig, RagPipeline, RecursiveChunker, load_document,
};
use futures::StreamExt;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "docqa")]
#[command(about = "Ask questions about your documents")]
#[command(version)]
struct Cli {
    /// Directory holding chunks, embeddings and summaries
    #[arg(long, env = "DOCQA_DATA_DIR", default_value = "./data", global = true)]
    data_dir: PathBuf,

    /// Base URL of the Ollama server (`host:port` implies http)
    #[arg(long, env = "OLLAMA_HOST", global = true)]
    ollama_url: Option<String>,

    /// Model used for answers and summaries
    #[arg(long, env = "DOCQA_MODEL", global = true)]
    model: Option<String>,

    /// Embedding backend
    #[arg(long, env = "DOCQA_EMBEDDER", value_enum, default_value = "ollama", global = true)]
    embedder: EmbedderKind,

    /// Model used by the Ollama embedding backend
    #[arg(long, env = "DOCQA_EMBEDDING_MODEL", global = true)]
    embedding_model: Option<String>,

    /// Maximum characters per chunk
    #[arg(long, env = "DOCQA_CHUNK_SIZE", default_value_t = docqa_rag::config::DEFAULT_CHUNK_SIZE, global = true)]
    chunk_size: usize,

    /// Number of chunks retrieved per question
    #[arg(long, env = "DOCQA_TOP_K", default_value_t = docqa_rag::config::DEFAULT_TOP_K, global = true)]
    top_k: usize,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum EmbedderKind {
    /// Embeddings from the Ollama server
    Ollama,
    /// In-process ONNX embeddings (requires the `fastembed` feature)
    Fastembed,
}

#[derive(Clone, Copy, ValueEnum)]
enum FormatArg {
    Pdf,
    Markdown,
    Text,
}

impl From<FormatArg> for DocumentFormat {
    fn from(format: FormatArg) -> Self {
        match format {
            FormatArg::Pdf => DocumentFormat::Pdf,
            FormatArg::Markdown => DocumentFormat::Markdown,
            FormatArg::Text => DocumentFormat::PlainText,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Extract, chunk, embed and persist a document
    Ingest {
        /// File to ingest
        file: PathBuf,

        /// Format of the file
        #[arg(short, long, value_enum)]
        format: FormatArg,

        /// Collection name (defaults to the file name)
        #[arg(long)]
        name: Option<String>,

        /// Split on paragraph and sentence boundaries instead of fixed windows
        #[arg(long)]
        recursive: bool,

        /// Skip summary generation
        #[arg(long)]
        no_summary: bool,
    },

    /// Print the most similar chunks as JSON
    Search {
        /// Collection to search
        collection: String,

        /// Question or search text
        query: String,
    },

    /// Answer a question from a collection
    Ask {
        /// Collection to answer from
        collection: String,

        /// The question
        query: String,

        /// Print the answer as it is generated
        #[arg(long)]
        stream: bool,
    },

    /// List ingested collections
    List,
}

fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn ollama_config(cli: &Cli) -> OllamaConfig {
    let mut config = OllamaConfig::default();
    if let Some(url) = &cli.ollama_url {
        config = config.with_base_url(url);
    }
    if let Some(model) = &cli.model {
        config = config.with_model(model);
    }
    if let Some(model) = &cli.embedding_model {
        config = config.with_embedding_model(model);
    }
    config
}

async fn build_embedder(
    kind: EmbedderKind,
    config: &OllamaConfig,
) -> Result<Arc<dyn EmbeddingProvider>> {
    match kind {
        EmbedderKind::Ollama => {
            let provider = OllamaEmbeddingProvider::detect(config.clone())
                .await
                .context("failed to reach the Ollama embedding model")?;
            Ok(Arc::new(provider))
        }
        #[cfg(feature = "fastembed")]
        EmbedderKind::Fastembed => {
            let provider = docqa_rag::FastEmbedProvider::new();
            provider.load().await.context("failed to load the embedding model")?;
            Ok(Arc::new(provider))
        }
        #[cfg(not(feature = "fastembed"))]
        EmbedderKind::Fastembed => {
            anyhow::bail!("this build of docqa was compiled without the `fastembed` feature")
        }
    }
}

/// Everything needed to assemble a pipeline once the command is known.
struct Setup {
    config: RagConfig,
    ollama: OllamaConfig,
    embedder: EmbedderKind,
    store: Arc<dyn CollectionStore>,
}

impl Setup {
    /// Build the embedder and the pipeline around it.
    async fn pipeline(
        &self,
        chunker: Option<Arc<dyn Chunker>>,
        summarize: bool,
    ) -> Result<RagPipeline> {
        let embedder = build_embedder(self.embedder, &self.ollama).await?;
        let generator = Arc::new(OllamaGenerator::new(self.ollama.clone()));

        let mut builder = RagPipeline::builder()
            .config(self.config.clone())
            .embedding_provider(embedder)
            .store(self.store.clone())
            .synthesizer(Arc::new(AnswerSynthesizer::new(generator)))
            .summarize_on_ingest(summarize);
        if let Some(chunker) = chunker {
            builder = builder.chunker(chunker);
        }
        Ok(builder.build()?)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_json);

    let setup = Setup {
        config: RagConfig::builder().chunk_size(cli.chunk_size).top_k(cli.top_k).build()?,
        ollama: ollama_config(&cli),
        embedder: cli.embedder,
        store: Arc::new(JsonFileStore::new(&cli.data_dir)),
    };

    match cli.command {
        Commands::Ingest { file, format, name, recursive, no_summary } => {
            let chunk_size = setup.config.chunk_size;
            let chunker: Arc<dyn Chunker> = if recursive {
                Arc::new(RecursiveChunker::new(chunk_size)?)
            } else {
                Arc::new(FixedSizeChunker::new(chunk_size)?)
            };

            let document = load_document(&file, format.into(), name.as_deref())
                .await
                .with_context(|| format!("failed to read {}", file.display()))?;
            let pipeline = setup.pipeline(Some(chunker), !no_summary).await?;
            let report = pipeline.ingest(&document).await?;
            info!(
                document = %report.document,
                chunk_count = report.chunk_count,
                summary = report.summary_generated,
                "document ready"
            );
            println!("{}", serde_json::to_string_pretty(&report)?);
        }

        Commands::Search { collection, query } => {
            let pipeline = setup.pipeline(None, false).await?;
            let results = pipeline.query(&collection, &query).await?;
            println!("{}", serde_json::to_string_pretty(&results)?);
        }

        Commands::Ask { collection, query, stream } => {
            let pipeline = setup.pipeline(None, false).await?;
            if stream {
                let mut answer = pipeline.ask_stream(&collection, &query).await?;
                let mut stdout = std::io::stdout();
                while let Some(fragment) = answer.stream.next().await {
                    write!(stdout, "{}", fragment?)?;
                    stdout.flush()?;
                }
                writeln!(stdout)?;
            } else {
                let answer = pipeline.ask(&collection, &query).await?;
                println!("{}", answer.text);
            }
        }

        Commands::List => {
            for name in setup.store.list_collections().await? {
                println!("{name}");
            }
        }
    }

    Ok(())
}
