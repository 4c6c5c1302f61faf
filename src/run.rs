//! Top-level pipeline entry points.
//!
//! [`run`] drives the whole conversion: resolve → profile → plan → split →
//! digitize → merge → segment → generate. Stages communicate through the
//! work directory, so every intermediate artifact survives the run and a
//! crashed run keeps the fragments it already paid for.
//!
//! The fragments directory is merged wholesale: rerunning into the same
//! work dir with a *different* part count would mix fragment sets. Use a
//! fresh work dir when changing the split plan.

use crate::config::PipelineConfig;
use crate::error::ScanpressError;
use crate::output::{ChunkResult, ExportPass, RunOutput, RunStats, SectionOutput};
use crate::pipeline::{digitize, input, merge, segment, split, summarize};
use crate::plan::{self, DocumentProfile};
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Profile a PDF without digitizing anything.
///
/// Does not require any API key. Pair with
/// [`plan::recommend_parts`] to preview the split plan.
pub async fn inspect(input_str: impl AsRef<str>) -> Result<DocumentProfile, ScanpressError> {
    let resolved = input::resolve_input(input_str.as_ref(), 120).await?;
    split::inspect_document(resolved.path()).await
}

/// Run the full pipeline on a local PDF path or HTTP(S) URL.
///
/// # Returns
/// `Ok(RunOutput)` on success, even if some chunks or sections failed —
/// check `output.stats` and the per-item errors.
///
/// # Errors
/// Returns `Err(ScanpressError)` only for fatal conditions: unreadable
/// input, unparseable PDF, missing OCR credentials, or every chunk failing.
pub async fn run(
    input_str: impl AsRef<str>,
    config: &PipelineConfig,
) -> Result<RunOutput, ScanpressError> {
    let total_start = Instant::now();
    let input_str = input_str.as_ref();
    info!("Starting run: {}", input_str);

    // ── Step 1: Resolve input ────────────────────────────────────────────
    let resolved = input::resolve_input(input_str, config.download_timeout_secs).await?;
    let pdf_path = resolved.path().to_path_buf();

    // ── Step 2: Build the OCR client early — missing credentials should
    //    fail before any splitting work is done ──────────────────────────
    let client = digitize::DigitizeClient::from_config(config)?;

    // ── Step 3: Profile the document ─────────────────────────────────────
    let profile = split::inspect_document(&pdf_path).await?;

    // ── Step 4: Decide the split plan ────────────────────────────────────
    let recommended = plan::recommend_parts(&profile);
    let parts = config
        .parts
        .unwrap_or(recommended)
        .clamp(1, profile.page_count);
    info!(
        "Split plan: {} parts over {} pages (recommended {})",
        parts, profile.page_count, recommended
    );
    let ranges = plan::split_ranges(profile.page_count, parts);

    // ── Step 5: Prepare the work directory ───────────────────────────────
    prepare_work_dirs(config)?;

    // ── Step 6: Extract chunk PDFs ───────────────────────────────────────
    let split_start = Instant::now();
    let chunks = split::extract_chunks(&pdf_path, ranges, &config.splits_dir()).await?;
    let split_duration_ms = split_start.elapsed().as_millis() as u64;
    info!("Extracted {} chunks in {}ms", chunks.len(), split_duration_ms);

    // ── Step 7: Digitize chunks, one at a time ───────────────────────────
    if let Some(ref cb) = config.progress_callback {
        cb.on_run_start(chunks.len());
    }

    let ocr_start = Instant::now();
    let fragments_dir = config.fragments_dir();
    let mut chunk_results: Vec<ChunkResult> = Vec::with_capacity(chunks.len());

    for chunk in &chunks {
        if let Some(ref cb) = config.progress_callback {
            cb.on_chunk_start(chunk.index, chunks.len());
        }
        let result = digitize_chunk(&client, chunk, &fragments_dir).await;
        if let Some(ref cb) = config.progress_callback {
            match &result.error {
                None => {
                    let bytes = result
                        .fragment_path
                        .as_deref()
                        .and_then(|p| std::fs::metadata(p).ok())
                        .map(|m| m.len() as usize)
                        .unwrap_or(0);
                    cb.on_chunk_complete(chunk.index, chunks.len(), bytes);
                }
                Some(e) => cb.on_chunk_error(chunk.index, chunks.len(), &e.to_string()),
            }
        }
        chunk_results.push(result);
    }
    let ocr_duration_ms = ocr_start.elapsed().as_millis() as u64;

    let digitized = chunk_results.iter().filter(|c| c.error.is_none()).count();
    let failed = chunk_results.len() - digitized;
    if digitized == 0 {
        let first_error = chunk_results
            .iter()
            .find_map(|c| c.error.as_ref())
            .map(|e| e.to_string())
            .unwrap_or_else(|| "Unknown error".to_string());
        return Err(ScanpressError::AllChunksFailed {
            total: chunk_results.len(),
            attempts: config.max_attempts,
            first_error,
        });
    }

    // ── Step 8: Merge fragments ──────────────────────────────────────────
    let merge_outcome = merge::merge_fragments(&fragments_dir)?;
    let merged_path = config.results_dir().join("merged_output.json");
    merge::write_envelope(&merged_path, &merge_outcome.html)?;
    info!(
        "Merged {} fragments ({} skipped) into {}",
        merge_outcome.merged.len(),
        merge_outcome.skipped.len(),
        merged_path.display()
    );

    // ── Step 9: Segment and generate ─────────────────────────────────────
    let generation_start = Instant::now();
    let sections = match &config.catalog {
        Some(catalog) => {
            process_sections(&merge_outcome.html, catalog, config).await?
        }
        None => {
            debug!("No section catalog configured; stopping after merge");
            Vec::new()
        }
    };
    let generation_duration_ms = generation_start.elapsed().as_millis() as u64;

    // ── Step 10: Stats ───────────────────────────────────────────────────
    let stats = RunStats {
        total_pages: profile.page_count,
        chunk_count: chunk_results.len(),
        digitized_chunks: digitized,
        failed_chunks: failed,
        merged_fragments: merge_outcome.merged.len(),
        skipped_fragments: merge_outcome.skipped.len(),
        sections_requested: config.catalog.as_ref().map_or(0, |c| c.len()),
        sections_extracted: sections
            .iter()
            .filter(|s| {
                !matches!(
                    &s.error,
                    Some(crate::error::SectionError::MarkerNotFound { .. })
                )
            })
            .count(),
        sections_generated: sections
            .iter()
            .filter(|s| s.summary.is_some() && s.refined.is_some())
            .count(),
        total_duration_ms: total_start.elapsed().as_millis() as u64,
        split_duration_ms,
        ocr_duration_ms,
        generation_duration_ms,
    };

    if let Some(ref cb) = config.progress_callback {
        cb.on_run_complete(stats.chunk_count, stats.digitized_chunks);
    }
    info!(
        "Run complete: {}/{} chunks, {}/{} sections, {}ms total",
        stats.digitized_chunks,
        stats.chunk_count,
        stats.sections_generated,
        stats.sections_requested,
        stats.total_duration_ms
    );

    Ok(RunOutput {
        profile,
        chunks: chunk_results,
        merged_html: merge_outcome.html,
        merged_path,
        sections,
        stats,
    })
}

/// Upload one chunk and persist its raw result.
async fn digitize_chunk(
    client: &digitize::DigitizeClient,
    chunk: &split::ChunkFile,
    fragments_dir: &Path,
) -> ChunkResult {
    let start = Instant::now();
    let file_name = format!("split_{}.pdf", chunk.index + 1);

    let bytes = match tokio::fs::read(&chunk.path).await {
        Ok(b) => b,
        Err(e) => {
            // A chunk file we just wrote going missing is an environment
            // problem, reported like an upload failure so the run continues.
            warn!("Chunk {}: cannot read {}: {e}", chunk.index, chunk.path.display());
            return ChunkResult {
                index: chunk.index,
                range: chunk.range,
                fragment_path: None,
                attempts: 0,
                duration_ms: start.elapsed().as_millis() as u64,
                error: Some(crate::error::ChunkError::UploadFailed {
                    index: chunk.index,
                    attempts: 0,
                    detail: format!("read chunk file: {e}"),
                }),
            };
        }
    };

    match client.digitize(chunk.index, &bytes, &file_name).await {
        Ok((value, attempts)) => {
            match digitize::persist_fragment(fragments_dir, chunk.index, &value).await {
                Ok(path) => ChunkResult {
                    index: chunk.index,
                    range: chunk.range,
                    fragment_path: Some(path),
                    attempts,
                    duration_ms: start.elapsed().as_millis() as u64,
                    error: None,
                },
                Err(e) => ChunkResult {
                    index: chunk.index,
                    range: chunk.range,
                    fragment_path: None,
                    attempts,
                    duration_ms: start.elapsed().as_millis() as u64,
                    error: Some(crate::error::ChunkError::UploadFailed {
                        index: chunk.index,
                        attempts,
                        detail: format!("persist fragment: {e}"),
                    }),
                },
            }
        }
        Err(error) => {
            let attempts = match &error {
                crate::error::ChunkError::UploadFailed { attempts, .. } => *attempts,
                _ => 0,
            };
            ChunkResult {
                index: chunk.index,
                range: chunk.range,
                fragment_path: None,
                attempts,
                duration_ms: start.elapsed().as_millis() as u64,
                error: Some(error),
            }
        }
    }
}

/// Segment the merged HTML and, when enabled, run both generative passes.
async fn process_sections(
    html: &str,
    catalog: &crate::catalog::SectionCatalog,
    config: &PipelineConfig,
) -> Result<Vec<SectionOutput>, ScanpressError> {
    let (extracted, missing) = segment::extract_sections(html, catalog);
    info!(
        "Segmented {} of {} catalog sections",
        extracted.len(),
        catalog.len()
    );

    let mut outputs: Vec<SectionOutput> = Vec::with_capacity(catalog.len());

    if config.summarize && !extracted.is_empty() {
        let provider = summarize::resolve_provider(config)?;
        for section in &extracted {
            let output = summarize::generate_section(&provider, section, config).await;
            let ok = output.error.is_none();
            persist_section(&config.sections_dir(), &output)?;
            if let Some(ref cb) = config.progress_callback {
                cb.on_section_complete(&output.title, ok);
            }
            outputs.push(output);
        }

        let summary_path = config.results_dir().join("summary.txt");
        write_text(&summary_path, &crate::output::render_export(&outputs, ExportPass::Summary))?;
        let refined_path = config.results_dir().join("refined.txt");
        write_text(&refined_path, &crate::output::render_export(&outputs, ExportPass::Refined))?;
        info!("Exports written: {} / {}", summary_path.display(), refined_path.display());
    } else {
        // Extraction-only mode keeps the section bodies available to the
        // caller through RunOutput without any generative calls.
        for section in &extracted {
            if let Some(ref cb) = config.progress_callback {
                cb.on_section_complete(&section.title, true);
            }
            outputs.push(SectionOutput {
                title: section.title.clone(),
                summary: None,
                refined: None,
                error: None,
            });
        }
    }

    for miss in missing {
        let title = match &miss {
            crate::error::SectionError::MarkerNotFound { marker } => marker.clone(),
            other => other.to_string(),
        };
        if let Some(ref cb) = config.progress_callback {
            cb.on_section_complete(&title, false);
        }
        outputs.push(SectionOutput {
            title,
            summary: None,
            refined: None,
            error: Some(miss),
        });
    }

    Ok(outputs)
}

/// Persist one section's generative output as JSON keyed by its title.
fn persist_section(sections_dir: &Path, output: &SectionOutput) -> Result<(), ScanpressError> {
    let path = sections_dir.join(format!("{}.json", sanitize_title(&output.title)));
    let body = serde_json::to_vec_pretty(output)
        .map_err(|e| ScanpressError::Internal(format!("serialize section: {e}")))?;
    std::fs::write(&path, body).map_err(|source| ScanpressError::OutputWriteFailed {
        path,
        source,
    })
}

/// Collapse a marker title into a safe file stem.
///
/// Markers carry OCR markup (`<h1>…</h1>`); runs of non-alphanumeric
/// characters become a single `_` so titles stay recognisable on disk.
fn sanitize_title(title: &str) -> String {
    let mut out = String::with_capacity(title.len());
    let mut last_was_sep = true;
    for ch in title.chars() {
        if ch.is_alphanumeric() {
            out.push(ch);
            last_was_sep = false;
        } else if !last_was_sep {
            out.push('_');
            last_was_sep = true;
        }
    }
    let trimmed = out.trim_end_matches('_').to_string();
    if trimmed.is_empty() {
        "section".to_string()
    } else {
        trimmed
    }
}

fn prepare_work_dirs(config: &PipelineConfig) -> Result<(), ScanpressError> {
    let mut dirs = vec![
        config.splits_dir(),
        config.fragments_dir(),
        config.results_dir(),
    ];
    if config.catalog.is_some() && config.summarize {
        dirs.push(config.sections_dir());
    }
    for dir in dirs {
        std::fs::create_dir_all(&dir).map_err(|source| ScanpressError::WorkDirIo {
            path: dir.clone(),
            source,
        })?;
    }
    Ok(())
}

fn write_text(path: &Path, text: &str) -> Result<(), ScanpressError> {
    std::fs::write(path, text).map_err(|source| ScanpressError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    })
}
