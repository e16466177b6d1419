//! Folio Parser - Markdown corpus loading and chunking
//!
//! Reads the markdown documents that describe the site owner and splits
//! them into overlapping fixed-size character windows ready for embedding.
//! Also derives photo-gallery metadata from image file names.
//!
//! Author: hephaex@gmail.com

pub mod chunk;
pub mod photo;

pub use chunk::{chunk_text, window_ranges, ChunkConfig};
pub use photo::{describe_photo, export_photos, scan_photos, Photo, PhotoList};

use folio_core::{Document, FolioError};
use std::path::Path;
use thiserror::Error;
use walkdir::WalkDir;

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur while loading or chunking documents
#[derive(Error, Debug)]
pub enum ParserError {
    /// IO error while reading a file
    #[error("IO error reading file: {path}")]
    IoError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Directory traversal failed
    #[error("Failed to walk {path}: {message}")]
    WalkError { path: String, message: String },

    /// Chunking parameters that cannot terminate
    #[error("Invalid chunk configuration: {0}")]
    InvalidConfig(String),

    /// Output could not be serialised
    #[error("Serialization error: {0}")]
    SerializeError(String),
}

pub type Result<T> = std::result::Result<T, ParserError>;

impl From<ParserError> for FolioError {
    fn from(err: ParserError) -> Self {
        match err {
            ParserError::IoError { path, source } => FolioError::Io { path, source },
            ParserError::InvalidConfig(msg) => FolioError::ConfigError(msg),
            other => FolioError::Other(other.into()),
        }
    }
}

// ============================================================================
// Markdown Loading
// ============================================================================

/// Whether a path names a markdown file (extension compared case-insensitively)
pub fn is_markdown(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("md"))
        .unwrap_or(false)
}

/// Recursively load every markdown file under `dir`
///
/// Each document's `source` is its path relative to `base` when `dir` lies
/// under it, and the path as walked otherwise. Documents are returned in
/// file-name order so repeated runs produce identical indexes. A missing
/// directory yields no documents.
pub fn load_markdown_documents(dir: &Path, base: &Path) -> Result<Vec<Document>> {
    if !dir.exists() {
        tracing::debug!("Document directory {} does not exist", dir.display());
        return Ok(Vec::new());
    }

    let mut documents = Vec::new();

    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.map_err(|e| ParserError::WalkError {
            path: dir.display().to_string(),
            message: e.to_string(),
        })?;

        if !entry.file_type().is_file() || !is_markdown(entry.path()) {
            continue;
        }

        let path = entry.path();
        let text = std::fs::read_to_string(path).map_err(|e| ParserError::IoError {
            path: path.display().to_string(),
            source: e,
        })?;

        let source = path
            .strip_prefix(base)
            .unwrap_or(path)
            .to_string_lossy()
            .replace('\\', "/");

        tracing::debug!("Loaded {} ({} bytes)", source, text.len());
        documents.push(Document::new(source, text));
    }

    Ok(documents)
}

// ============================================================================
// Tests
// ============================================================================
