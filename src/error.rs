//! Error types for the scanpress library.
//!
//! Three error types reflect three distinct failure modes:
//!
//! * [`ScanpressError`] — **Fatal**: the run cannot proceed at all (bad
//!   input file, unparseable PDF, no API key, every chunk failed). Returned
//!   as `Err(ScanpressError)` from the top-level entry points.
//!
//! * [`ChunkError`] — **Non-fatal**: a single chunk failed (upload retries
//!   exhausted, fragment missing its HTML) but the other chunks are fine.
//!   Stored inside [`crate::output::ChunkResult`] so callers can inspect
//!   partial success rather than losing the whole document to one chunk.
//!
//! * [`SectionError`] — **Non-fatal**: one section could not be extracted
//!   or summarised; the batch continues with the remaining sections.
//!
//! The separation lets callers decide their own tolerance: abort on the
//! first chunk failure, log and continue, or collect everything for a
//! post-run report.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the scanpress library.
///
/// Chunk- and section-level failures use [`ChunkError`] / [`SectionError`]
/// and are stored in the run output rather than propagated here.
#[derive(Debug, Error)]
pub enum ScanpressError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The input string is not a valid file path or URL.
    #[error("Invalid input '{input}': not a file path or a valid HTTP/HTTPS URL")]
    InvalidInput { input: String },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// The PDF cannot be parsed. Fatal and not retried — no valid chunk
    /// plan can be derived from an unreadable document.
    #[error("PDF '{path}' cannot be parsed: {detail}")]
    CorruptPdf { path: PathBuf, detail: String },

    /// The PDF parsed but contains no pages.
    #[error("PDF '{path}' contains no pages")]
    EmptyPdf { path: PathBuf },

    /// Writing a chunk PDF to the splits directory failed.
    #[error("Failed to write chunk file '{path}': {source}")]
    ChunkWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Remote service errors ─────────────────────────────────────────────
    /// No OCR API key in configuration or environment.
    #[error("Digitization API key is not configured.\n{hint}")]
    OcrNotConfigured { hint: String },

    /// The generative-text provider is not initialised (missing key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// Every chunk failed after all retries; no merged output exists.
    #[error("All {total} chunks failed after {attempts} attempts each.\nFirst error: {first_error}")]
    AllChunksFailed {
        total: usize,
        attempts: u32,
        first_error: String,
    },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// A work-directory read or write failed outside chunk extraction.
    #[error("Work directory I/O failed at '{path}': {source}")]
    WorkDirIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Could not write an output artifact (merged envelope, export, ...).
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// The section catalog file could not be read.
    #[error("Failed to read section catalog '{path}': {source}")]
    CatalogReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The section catalog contains no markers.
    #[error("Section catalog is empty — at least one marker is required")]
    EmptyCatalog,

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single chunk.
///
/// Stored in [`crate::output::ChunkResult`]; the run continues unless ALL
/// chunks fail.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum ChunkError {
    /// Upload failed on every attempt (non-200 status or transport error).
    #[error("Chunk {index}: digitization failed after {attempts} attempts: {detail}")]
    UploadFailed {
        index: usize,
        attempts: u32,
        detail: String,
    },

    /// The provider's response parsed, but `content.html` is absent.
    /// A permanent shape mismatch — not retried, skipped at merge.
    #[error("Chunk {index}: digitization result has no content.html")]
    MissingHtml { index: usize },
}

/// A non-fatal error for a single section.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum SectionError {
    /// The marker does not occur in the merged document.
    #[error("Section marker not found in merged document: {marker:?}")]
    MarkerNotFound { marker: String },

    /// A generative-text call failed. Not retried — the error surfaces as
    /// a per-section diagnostic and the section is skipped.
    #[error("Section {title:?}: {stage} failed: {detail}")]
    GenerationFailed {
        title: String,
        stage: GenerationStage,
        detail: String,
    },
}

/// Which of the two generative passes failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum GenerationStage {
    /// First pass: section text → study summary.
    Summary,
    /// Second pass: study summary → publication-style prose.
    Refine,
}

impl std::fmt::Display for GenerationStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GenerationStage::Summary => write!(f, "summary"),
            GenerationStage::Refine => write!(f, "refinement"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_chunks_failed_display() {
        let e = ScanpressError::AllChunksFailed {
            total: 12,
            attempts: 5,
            first_error: "HTTP 503".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("12 chunks"), "got: {msg}");
        assert!(msg.contains("5 attempts"), "got: {msg}");
        assert!(msg.contains("HTTP 503"), "got: {msg}");
    }

    #[test]
    fn upload_failed_display() {
        let e = ChunkError::UploadFailed {
            index: 3,
            attempts: 5,
            detail: "connection refused".into(),
        };
        assert!(e.to_string().contains("Chunk 3"));
        assert!(e.to_string().contains("5 attempts"));
    }

    #[test]
    fn missing_html_display() {
        let e = ChunkError::MissingHtml { index: 7 };
        assert!(e.to_string().contains("Chunk 7"));
        assert!(e.to_string().contains("content.html"));
    }

    #[test]
    fn marker_not_found_display() {
        let e = SectionError::MarkerNotFound {
            marker: "<h1>Missing</h1>".into(),
        };
        assert!(e.to_string().contains("<h1>Missing</h1>"));
    }

    #[test]
    fn generation_failed_display_names_stage() {
        let e = SectionError::GenerationFailed {
            title: "Intro".into(),
            stage: GenerationStage::Refine,
            detail: "rate limited".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("refinement"), "got: {msg}");
        assert!(msg.contains("rate limited"), "got: {msg}");
    }
}
