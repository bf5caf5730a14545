//! Uploaded file text extraction
//!
//! Turns uploaded bytes into bounded plain text and the `[FILE]` summary
//! message that carries it into chat history.

pub mod formats;

use crate::config::ExtractionConfig;
use crate::error::Result;
use crate::storage::{FileRef, FILE_MARKER};
use bytes::Bytes;

/// Converts a single file's bytes to plain text
///
/// Implementations must not apply length limits; `prepare_file` does.
pub trait TextExtractor: Send + Sync {
    /// Extract text from `bytes`
    ///
    /// # Arguments
    ///
    /// * `file_name` - Original file name; its extension selects the decoder
    /// * `mime_hint` - Declared MIME type
    /// * `bytes` - Raw file contents
    ///
    /// # Errors
    ///
    /// Returns `ParleyError::Extraction` if the file cannot be decoded
    fn extract(&self, file_name: &str, mime_hint: &str, bytes: &[u8]) -> Result<String>;
}

/// Extension-dispatching extractor for PDF, DOCX, CSV and plain text
#[derive(Debug, Clone)]
pub struct DocumentExtractor {
    csv_max_rows: usize,
}

impl DocumentExtractor {
    /// Create an extractor keeping at most `csv_max_rows` CSV records
    pub fn new(csv_max_rows: usize) -> Self {
        Self { csv_max_rows }
    }
}

impl Default for DocumentExtractor {
    fn default() -> Self {
        Self::new(ExtractionConfig::default().csv_max_rows)
    }
}

impl TextExtractor for DocumentExtractor {
    fn extract(&self, file_name: &str, mime_hint: &str, bytes: &[u8]) -> Result<String> {
        let ext = file_extension(file_name);
        tracing::debug!(file = file_name, ext = %ext, mime = mime_hint, "Extracting text");

        match ext.as_str() {
            "pdf" => formats::pdf_text(bytes),
            "doc" | "docx" => formats::docx_text(bytes),
            "csv" => formats::csv_text(bytes, self.csv_max_rows),
            _ => Ok(formats::plain_text(bytes)),
        }
    }
}

/// Lower-cased text after the last `.`; the whole name when there is none
fn file_extension(file_name: &str) -> String {
    file_name
        .rsplit('.')
        .next()
        .unwrap_or(file_name)
        .to_lowercase()
}

/// A file received in an upload request
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub name: String,
    /// Declared MIME type
    pub mime_type: String,
    /// Declared size in bytes
    pub size: u64,
    pub bytes: Bytes,
}

impl UploadedFile {
    /// Build an upload whose declared size is the byte length
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        let bytes = bytes.into();
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            size: bytes.len() as u64,
            bytes,
        }
    }
}

/// Extracted, trimmed and truncated text of one upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedFile {
    pub name: String,
    pub mime_type: String,
    pub size: u64,
    pub text: String,
    pub word_count: usize,
}

impl PreparedFile {
    /// The `[FILE] <name> (<n> words)` system message content
    pub fn summary_message(&self) -> String {
        format!(
            "{} {} ({} words)\n\n{}",
            FILE_MARKER, self.name, self.word_count, self.text
        )
    }

    /// File metadata for the user message, linked to its text message
    pub fn file_ref(&self, server_file_id: impl Into<String>) -> FileRef {
        FileRef {
            name: self.name.clone(),
            size: self.size,
            mime_type: self.mime_type.clone(),
            server_file_id: Some(server_file_id.into()),
        }
    }
}

/// Run one upload through the extractor and apply the configured limits
///
/// # Returns
///
/// Returns `Ok(None)` when the declared size exceeds `max_file_bytes`; the
/// file is skipped without being decoded.
///
/// # Errors
///
/// Returns `ParleyError::Extraction` if decoding fails
pub fn prepare_file(
    extractor: &dyn TextExtractor,
    file: &UploadedFile,
    limits: &ExtractionConfig,
) -> Result<Option<PreparedFile>> {
    if file.size > limits.max_file_bytes {
        tracing::warn!(
            file = %file.name,
            size = file.size,
            limit = limits.max_file_bytes,
            "Skipping oversized file"
        );
        return Ok(None);
    }

    let raw = extractor.extract(&file.name, &file.mime_type, &file.bytes)?;
    let text = truncate_chars(raw.trim(), limits.max_chars);
    let word_count = text.split_whitespace().count();

    Ok(Some(PreparedFile {
        name: file.name.clone(),
        mime_type: file.mime_type.clone(),
        size: file.size,
        text,
        word_count,
    }))
}

/// First `max_chars` characters of `text`, never splitting a code point
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => text[..byte_index].to_string(),
        None => text.to_string(),
    }
}
