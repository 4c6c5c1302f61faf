//! Pipeline stages for study-guide digitization.
//!
//! Each submodule implements exactly one transformation step. Keeping
//! stages separate makes each independently testable and lets us swap an
//! implementation (e.g. a different OCR provider) without touching the
//! other stages.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ split ──▶ digitize ──▶ merge ──▶ segment ──▶ summarize
//! (URL/path) (lopdf)  (OCR API)    (JSON)    (catalog)   (LLM ×2)
//! ```
//!
//! 1. [`input`]     — canonicalise the user-supplied path or URL to a local file
//! 2. [`split`]     — profile the document and extract chunk PDFs; runs in
//!    `spawn_blocking` because PDF parsing is CPU-bound
//! 3. [`digitize`]  — upload each chunk with bounded retry; persists raw
//!    JSON keyed by chunk index
//! 4. [`merge`]     — concatenate fragment HTML in numeric chunk order into
//!    the fixed `{"api":"2.0"}` envelope
//! 5. [`segment`]   — slice the merged HTML into sections at catalog markers
//! 6. [`summarize`] — two generative passes per section (summary, then
//!    publication prose); the only other stage with network I/O

pub mod digitize;
pub mod input;
pub mod merge;
pub mod segment;
pub mod split;
pub mod summarize;
