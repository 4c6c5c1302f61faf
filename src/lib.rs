//! # scanpress
//!
//! Turn a scanned study-guide PDF into structured, AI-generated textbook
//! prose.
//!
//! ## Why this crate?
//!
//! Document-digitization APIs choke on large scans — payload and complexity
//! ceilings make a 300-page upload a coin flip. scanpress splits the PDF
//! into right-sized chunks first (a tiered heuristic over size, page count,
//! and image density), digitizes each chunk independently with bounded
//! retries, then stitches the returned HTML back into one document, slices
//! it into named sections, and rewrites each section twice with a language
//! model: a study summary, then publication-style prose.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Input      resolve local file or download from URL
//!  ├─ 2. Split      plan chunk ranges, extract chunk PDFs (lopdf, spawn_blocking)
//!  ├─ 3. Digitize   upload each chunk to the OCR API, retry ×5, persist raw JSON
//!  ├─ 4. Merge      concatenate fragment HTML in numeric chunk order
//!  ├─ 5. Segment    slice at section-title markers from the catalog
//!  └─ 6. Generate   per section: study summary, then refined prose
//! ```
//!
//! Chunks are processed strictly one at a time; the work directory acts as
//! the queue between stages, so interrupted runs keep every fragment they
//! already paid for.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use scanpress::{run, PipelineConfig, SectionCatalog};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // OCR key from UPSTAGE_API_KEY; LLM provider auto-detected from
//!     // OPENAI_API_KEY / ANTHROPIC_API_KEY / ...
//!     let config = PipelineConfig::builder()
//!         .catalog(SectionCatalog::from_file("sections.txt")?)
//!         .subject("컴퓨터활용능력 1급")
//!         .build()?;
//!     let output = run("study-guide.pdf", &config).await?;
//!     eprintln!(
//!         "{}/{} chunks digitized, {} sections generated",
//!         output.stats.digitized_chunks,
//!         output.stats.chunk_count,
//!         output.stats.sections_generated,
//!     );
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `scanpress` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! scanpress = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod catalog;
pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod plan;
pub mod progress;
pub mod prompts;
pub mod run;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use catalog::SectionCatalog;
pub use config::{PipelineConfig, PipelineConfigBuilder, DEFAULT_OCR_MODEL, DEFAULT_OCR_URL};
pub use error::{ChunkError, GenerationStage, ScanpressError, SectionError};
pub use output::{
    ChunkResult, ExportPass, RunOutput, RunStats, Section, SectionOutput, render_export,
};
pub use plan::{recommend_parts, split_ranges, DocumentProfile, PageRange};
pub use progress::{NoopProgressCallback, ProgressCallback, RunProgressCallback};
pub use run::{inspect, run};
