//! Plain-text extraction from uploaded documents.
//!
//! The caller states the format; nothing here inspects file contents to guess it.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::document::Document;
use crate::error::{RagError, Result};

/// Largest accepted upload, in bytes (20 MiB).
pub const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

/// Supported input formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    Pdf,
    Markdown,
    #[serde(rename = "text")]
    PlainText,
}

impl DocumentFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Markdown => "markdown",
            Self::PlainText => "text",
        }
    }
}

impl std::fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn extraction_error(format: DocumentFormat, message: impl Into<String>) -> RagError {
    RagError::ExtractionError { format: format.to_string(), message: message.into() }
}

/// Extract the text of a document held in memory.
///
/// Markdown and plain text are decoded as UTF-8 unchanged. PDF text is
/// extracted with `pdf-extract` (feature `pdf`) and trimmed.
///
/// # Errors
///
/// - [`RagError::InputError`] if `bytes` exceeds [`MAX_UPLOAD_BYTES`] or the
///   extracted text is blank.
/// - [`RagError::ExtractionError`] if decoding or PDF parsing fails.
pub fn extract_text(bytes: &[u8], format: DocumentFormat) -> Result<String> {
    if bytes.len() > MAX_UPLOAD_BYTES {
        return Err(RagError::InputError(format!(
            "document is {} bytes; the limit is {MAX_UPLOAD_BYTES}",
            bytes.len()
        )));
    }

    let text = match format {
        DocumentFormat::Markdown | DocumentFormat::PlainText => std::str::from_utf8(bytes)
            .map(str::to_string)
            .map_err(|e| extraction_error(format, format!("invalid UTF-8: {e}")))?,
        DocumentFormat::Pdf => extract_pdf(bytes)?,
    };

    if text.trim().is_empty() {
        return Err(RagError::InputError(format!("no text could be extracted from {format} input")));
    }

    debug!(%format, bytes = bytes.len(), chars = text.chars().count(), "extracted text");
    Ok(text)
}

#[cfg(feature = "pdf")]
fn extract_pdf(bytes: &[u8]) -> Result<String> {
    pdf_extract::extract_text_from_mem(bytes).map(|text| text.trim().to_string()).map_err(|e| {
        error!(error = %e, "PDF extraction failed");
        extraction_error(DocumentFormat::Pdf, e.to_string())
    })
}

#[cfg(not(feature = "pdf"))]
fn extract_pdf(_bytes: &[u8]) -> Result<String> {
    error!("PDF input received but the `pdf` feature is disabled");
    Err(extraction_error(DocumentFormat::Pdf, "PDF support requires the `pdf` feature"))
}

/// Run an extraction on the blocking pool. A panicking extractor surfaces as
/// [`RagError::ExtractionError`].
async fn extract_blocking<F>(format: DocumentFormat, extract: F) -> Result<String>
where
    F: FnOnce() -> Result<String> + Send + 'static,
{
    tokio::task::spawn_blocking(extract).await.map_err(|e| {
        error!(%format, error = %e, "extraction task failed");
        extraction_error(format, format!("extraction task failed: {e}"))
    })?
}

/// Read a file from disk and extract it into a [`Document`].
///
/// Extraction runs on the blocking pool. The document is named `name` if
/// given, otherwise after the file name.
pub async fn load_document(
    path: &Path,
    format: DocumentFormat,
    name: Option<&str>,
) -> Result<Document> {
    let metadata =
        tokio::fs::metadata(path).await.map_err(|e| RagError::storage(path.display(), e))?;
    if metadata.len() > MAX_UPLOAD_BYTES as u64 {
        return Err(RagError::InputError(format!(
            "{} is {} bytes; the limit is {MAX_UPLOAD_BYTES}",
            path.display(),
            metadata.len()
        )));
    }

    let bytes = tokio::fs::read(path).await.map_err(|e| RagError::storage(path.display(), e))?;
    let text = extract_blocking(format, move || extract_text(&bytes, format)).await?;

    let name = match name {
        Some(name) => name.to_string(),
        None => path
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::to_string)
            .ok_or_else(|| {
                RagError::InputError(format!("cannot derive a name from {}", path.display()))
            })?,
    };

    Ok(Document::new(name, text))
}
