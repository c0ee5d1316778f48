//! JSON-file collection store.
//!
//! Layout under the data directory:
//!
//! ```text
//! <root>/chunks/<document>.json       JSON array of chunks
//! <root>/embeddings/<document>.json   JSON array of embedded chunks
//! <root>/summaries/<document>.txt     plain-text summary
//! ```
//!
//! Files are written to a temporary sibling and renamed into place, so a
//! reader never observes a half-written collection.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, error};

use crate::document::{Chunk, DocumentSummary, EmbeddedChunk, EmbeddedCollection};
use crate::error::{RagError, Result};
use crate::store::{CollectionStore, validate_name};

const CHUNKS_DIR: &str = "chunks";
const EMBEDDINGS_DIR: &str = "embeddings";
const SUMMARIES_DIR: &str = "summaries";

/// A [`CollectionStore`] persisting pretty-printed JSON files under a root directory.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    root: PathBuf,
}

impl JsonFileStore {
    /// Create a store rooted at `root`. Directories are created on first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the embedded collection file for `name`.
    pub fn collection_path(&self, name: &str) -> PathBuf {
        self.root.join(EMBEDDINGS_DIR).join(format!("{name}.json"))
    }

    fn chunks_path(&self, name: &str) -> PathBuf {
        self.root.join(CHUNKS_DIR).join(format!("{name}.json"))
    }

    fn summary_path(&self, name: &str) -> PathBuf {
        self.root.join(SUMMARIES_DIR).join(format!("{name}.txt"))
    }
}

async fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(|e| {
            error!(path = %parent.display(), error = %e, "failed to create directory");
            RagError::storage(parent.display(), e)
        })?;
    }

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    tokio::fs::write(&tmp, contents).await.map_err(|e| RagError::storage(tmp.display(), e))?;
    tokio::fs::rename(&tmp, path).await.map_err(|e| {
        error!(path = %path.display(), error = %e, "failed to move file into place");
        RagError::storage(path.display(), e)
    })?;

    debug!(path = %path.display(), bytes = contents.len(), "wrote file");
    Ok(())
}

async fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_vec_pretty(value).map_err(|e| RagError::storage(path.display(), e))?;
    write_atomic(path, &json).await
}

/// Read and parse a JSON file. A missing file maps to `not_found`.
async fn read_json<T: DeserializeOwned>(path: &Path, name: &str) -> Result<T> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(RagError::CollectionNotFoundError { collection: name.to_string() });
        }
        Err(e) => {
            error!(path = %path.display(), error = %e, "failed to read file");
            return Err(RagError::storage(path.display(), e));
        }
    };

    serde_json::from_slice(&bytes).map_err(|e| {
        error!(path = %path.display(), error = %e, "malformed JSON");
        RagError::storage(path.display(), format!("malformed JSON: {e}"))
    })
}

#[async_trait]
impl CollectionStore for JsonFileStore {
    async fn save_chunks(&self, document: &str, chunks: &[Chunk]) -> Result<()> {
        validate_name(document)?;
        write_json(&self.chunks_path(document), chunks).await
    }

    async fn load_chunks(&self, document: &str) -> Result<Vec<Chunk>> {
        validate_name(document)?;
        read_json(&self.chunks_path(document), document).await
    }

    async fn save_collection(&self, collection: &EmbeddedCollection) -> Result<()> {
        validate_name(collection.name())?;
        write_json(&self.collection_path(collection.name()), collection.chunks()).await
    }

    async fn load_collection(&self, name: &str) -> Result<EmbeddedCollection> {
        validate_name(name)?;
        let chunks: Vec<EmbeddedChunk> = read_json(&self.collection_path(name), name).await?;
        EmbeddedCollection::new(name, chunks)
    }

    async fn save_summary(&self, summary: &DocumentSummary) -> Result<()> {
        validate_name(&summary.document)?;
        write_atomic(&self.summary_path(&summary.document), summary.text.as_bytes()).await
    }

    async fn load_summary(&self, document: &str) -> Result<Option<DocumentSummary>> {
        validate_name(document)?;
        let path = self.summary_path(document);
        match tokio::fs::read_to_string(&path).await {
            Ok(text) => Ok(Some(DocumentSummary { document: document.to_string(), text })),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(RagError::storage(path.display(), e)),
        }
    }

    async fn delete_summary(&self, document: &str) -> Result<()> {
        validate_name(document)?;
        let path = self.summary_path(document);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                debug!(path = %path.display(), "removed summary");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => {
                error!(path = %path.display(), error = %e, "failed to remove summary");
                Err(RagError::storage(path.display(), e))
            }
        }
    }

    async fn list_collections(&self) -> Result<Vec<String>> {
        let dir = self.root.join(EMBEDDINGS_DIR);
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(RagError::storage(dir.display(), e)),
        };

        let mut names = Vec::new();
        while let Some(entry) =
            entries.next_entry().await.map_err(|e| RagError::storage(dir.display(), e))?
        {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    names.push(stem.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }
}
