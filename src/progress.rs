//! Progress-callback trait for per-chunk and per-section run events.
//!
//! Inject an `Arc<dyn RunProgressCallback>` via
//! [`crate::config::PipelineConfigBuilder::progress_callback`] to receive
//! events as the pipeline works through chunks and sections.
//!
//! # Why callbacks instead of channels?
//!
//! The callback approach is the least-invasive integration point: callers
//! can forward events to a channel, a WebSocket, a database record, or a
//! terminal progress bar without the library knowing anything about how the
//! host application communicates. The trait is `Send + Sync` so the same
//! implementation would survive a future concurrent pipeline unchanged.

use std::sync::Arc;

/// Called by the pipeline as it processes chunks and sections.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. The current pipeline is sequential, so calls
/// arrive in order; implementations should still be internally synchronised
/// (`Send + Sync` is required).
pub trait RunProgressCallback: Send + Sync {
    /// Called once after splitting, before the first upload.
    ///
    /// * `total_chunks` — number of chunks that will be uploaded
    fn on_run_start(&self, total_chunks: usize) {
        let _ = total_chunks;
    }

    /// Called just before a chunk's upload begins.
    ///
    /// * `index` — 0-based chunk index
    fn on_chunk_start(&self, index: usize, total_chunks: usize) {
        let _ = (index, total_chunks);
    }

    /// Called when a chunk's raw digitization result has been persisted.
    ///
    /// * `fragment_bytes` — size of the persisted JSON, for progress bars
    ///   that track output volume
    fn on_chunk_complete(&self, index: usize, total_chunks: usize, fragment_bytes: usize) {
        let _ = (index, total_chunks, fragment_bytes);
    }

    /// Called when a chunk fails permanently (all attempts exhausted).
    fn on_chunk_error(&self, index: usize, total_chunks: usize, error: &str) {
        let _ = (index, total_chunks, error);
    }

    /// Called after each section finishes (extracted and, when enabled,
    /// summarised). `ok` is false when the section was skipped.
    fn on_section_complete(&self, title: &str, ok: bool) {
        let _ = (title, ok);
    }

    /// Called once after the merge (and any generation) completes.
    ///
    /// * `success_count` — chunks digitized without error
    fn on_run_complete(&self, total_chunks: usize, success_count: usize) {
        let _ = (total_chunks, success_count);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl RunProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::PipelineConfig`].
pub type ProgressCallback = Arc<dyn RunProgressCallback>;
