//! Output types: per-chunk results, per-section results, and run statistics.
//!
//! Everything here is `Serialize` so the CLI's `--json` mode and any host
//! application can persist a complete machine-readable record of a run.

use crate::error::{ChunkError, SectionError};
use crate::plan::{DocumentProfile, PageRange};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Outcome of digitizing one chunk.
///
/// `error == None` means the raw digitization JSON was persisted; whether
/// it actually contains usable HTML is decided at merge time (a fragment
/// can parse yet lack `content.html`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkResult {
    /// 0-based chunk index.
    pub index: usize,
    /// Pages this chunk covers in the source document.
    pub range: PageRange,
    /// Where the raw digitization JSON was persisted, if the upload
    /// succeeded.
    pub fragment_path: Option<PathBuf>,
    /// Upload attempts actually made (1 on first-try success).
    pub attempts: u32,
    /// Wall-clock time spent on this chunk, including retry delays.
    pub duration_ms: u64,
    /// Set when the chunk failed permanently.
    pub error: Option<ChunkError>,
}

/// A named subdivision of the merged document.
///
/// Transient: computed on demand from the merged HTML and the catalog,
/// never persisted as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    /// The catalog marker that opens this section, verbatim.
    pub title: String,
    /// The slice of merged HTML from the marker up to the next marker
    /// occurrence (marker included).
    pub body: String,
}

/// Outcome of the generative passes over one section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionOutput {
    /// The catalog marker, verbatim.
    pub title: String,
    /// First-pass study summary, when generation succeeded.
    pub summary: Option<String>,
    /// Second-pass publication prose, when refinement succeeded.
    pub refined: Option<String>,
    /// Set when the section was skipped (marker absent or generation
    /// failed).
    pub error: Option<SectionError>,
}

/// Aggregate statistics for one run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunStats {
    /// Pages in the source document.
    pub total_pages: usize,
    /// Chunks the document was split into.
    pub chunk_count: usize,
    /// Chunks whose digitization result was persisted.
    pub digitized_chunks: usize,
    /// Chunks that failed permanently.
    pub failed_chunks: usize,
    /// Fragments whose HTML made it into the merged document.
    pub merged_fragments: usize,
    /// Fragments skipped at merge time (missing `content.html`).
    pub skipped_fragments: usize,
    /// Sections requested by the catalog (0 when no catalog).
    pub sections_requested: usize,
    /// Sections whose markers were found.
    pub sections_extracted: usize,
    /// Sections that completed both generative passes.
    pub sections_generated: usize,
    /// Total wall-clock time for the run.
    pub total_duration_ms: u64,
    /// Time spent splitting the PDF.
    pub split_duration_ms: u64,
    /// Time spent uploading chunks (including retry delays).
    pub ocr_duration_ms: u64,
    /// Time spent in generative calls.
    pub generation_duration_ms: u64,
}

/// Complete result of a pipeline run.
#[derive(Debug, Clone, Serialize)]
pub struct RunOutput {
    /// Profile of the source document.
    pub profile: DocumentProfile,
    /// Per-chunk outcomes, in chunk order.
    pub chunks: Vec<ChunkResult>,
    /// The merged HTML (concatenated fragments, newline-separated).
    pub merged_html: String,
    /// Where the merged envelope was written.
    pub merged_path: PathBuf,
    /// Per-section outcomes, in catalog order. Empty when no catalog.
    pub sections: Vec<SectionOutput>,
    /// Aggregate statistics.
    pub stats: RunStats,
}

/// Render the plain-text export for one generative pass.
///
/// Joins one block per section that produced text for `pass`, in catalog
/// order: `"===== {title} 요약 결과 =====\n\n{body}\n"`. Sections that were
/// skipped contribute nothing.
pub fn render_export(sections: &[SectionOutput], pass: ExportPass) -> String {
    let mut out = String::new();
    for section in sections {
        let body = match pass {
            ExportPass::Summary => section.summary.as_deref(),
            ExportPass::Refined => section.refined.as_deref(),
        };
        if let Some(body) = body {
            out.push_str(&format!(
                "===== {} 요약 결과 =====\n\n{}\n",
                section.title, body
            ));
        }
    }
    out
}

/// Which generative pass an export covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportPass {
    /// First-pass study summaries.
    Summary,
    /// Second-pass publication prose.
    Refined,
}
