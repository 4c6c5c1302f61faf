//! Document profiling and chunk extraction.
//!
//! ## Why spawn_blocking?
//!
//! lopdf parses the whole cross-reference table and object graph in memory;
//! on a 100 MB scan that is hundreds of milliseconds of CPU-bound work.
//! `tokio::task::spawn_blocking` keeps it off the async worker threads,
//! matching how the rest of the pipeline treats CPU-heavy PDF work.
//!
//! ## How a chunk is produced
//!
//! lopdf has no "copy pages into a new document" primitive, so extraction
//! goes the other way: clone the parsed document, delete every page outside
//! the range, prune the now-unreferenced objects, and save. Fonts, images,
//! and per-page structure survive because nothing referenced by a kept page
//! is touched.

use crate::error::ScanpressError;
use crate::plan::{DocumentProfile, PageRange};
use lopdf::{Document, Object};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// A chunk PDF written to the splits directory.
#[derive(Debug, Clone)]
pub struct ChunkFile {
    /// 0-based chunk index.
    pub index: usize,
    /// Pages this chunk covers in the source document.
    pub range: PageRange,
    /// Where the chunk PDF was written (`split_{index+1}.pdf`).
    pub path: PathBuf,
}

/// Profile a PDF: file size, page count, and image-page count.
///
/// Fatal on parse failure — no chunk plan can be derived from an
/// unreadable document.
pub async fn inspect_document(pdf_path: &Path) -> Result<DocumentProfile, ScanpressError> {
    let path = pdf_path.to_path_buf();
    tokio::task::spawn_blocking(move || inspect_blocking(&path))
        .await
        .map_err(|e| ScanpressError::Internal(format!("Inspect task panicked: {e}")))?
}

fn inspect_blocking(pdf_path: &Path) -> Result<DocumentProfile, ScanpressError> {
    let file_size_bytes = std::fs::metadata(pdf_path)
        .map_err(|source| ScanpressError::WorkDirIo {
            path: pdf_path.to_path_buf(),
            source,
        })?
        .len();

    let doc = load_document(pdf_path)?;
    let pages = doc.get_pages();
    if pages.is_empty() {
        return Err(ScanpressError::EmptyPdf {
            path: pdf_path.to_path_buf(),
        });
    }

    let image_pages = pages
        .values()
        .filter(|&&page_id| page_has_image(&doc, page_id))
        .count();

    let profile = DocumentProfile {
        file_size_bytes,
        page_count: pages.len(),
        image_pages,
    };
    info!(
        "Profiled '{}': {} pages, {:.1} MB, {} image pages",
        pdf_path.display(),
        profile.page_count,
        profile.file_size_mb(),
        profile.image_pages
    );
    Ok(profile)
}

/// Extract one chunk PDF per range into `out_dir`.
///
/// The source is parsed once; each chunk is produced from a clone so the
/// deletions never interact. Files are named `split_{index+1}.pdf` — the
/// 1-based on-disk names pair with the fragment files the digitization
/// stage writes.
pub async fn extract_chunks(
    pdf_path: &Path,
    ranges: Vec<PageRange>,
    out_dir: &Path,
) -> Result<Vec<ChunkFile>, ScanpressError> {
    let path = pdf_path.to_path_buf();
    let out_dir = out_dir.to_path_buf();
    tokio::task::spawn_blocking(move || extract_chunks_blocking(&path, &ranges, &out_dir))
        .await
        .map_err(|e| ScanpressError::Internal(format!("Split task panicked: {e}")))?
}

fn extract_chunks_blocking(
    pdf_path: &Path,
    ranges: &[PageRange],
    out_dir: &Path,
) -> Result<Vec<ChunkFile>, ScanpressError> {
    let source = load_document(pdf_path)?;
    let total_pages = source.get_pages().len();

    let mut chunks = Vec::with_capacity(ranges.len());
    for (index, range) in ranges.iter().enumerate() {
        let out_path = out_dir.join(format!("split_{}.pdf", index + 1));
        write_chunk(&source, total_pages, *range, &out_path)?;
        debug!(
            "Chunk {}: pages {} -> {}",
            index,
            range,
            out_path.display()
        );
        chunks.push(ChunkFile {
            index,
            range: *range,
            path: out_path,
        });
    }
    Ok(chunks)
}

fn write_chunk(
    source: &Document,
    total_pages: usize,
    range: PageRange,
    out_path: &Path,
) -> Result<(), ScanpressError> {
    let mut doc = source.clone();

    let delete: Vec<u32> = (1..=total_pages as u32)
        .filter(|p| (*p as usize) < range.start || (*p as usize) > range.end)
        .collect();
    doc.delete_pages(&delete);
    doc.prune_objects();

    doc.save(out_path)
        .map_err(|e| ScanpressError::ChunkWriteFailed {
            path: out_path.to_path_buf(),
            source: std::io::Error::other(e.to_string()),
        })?;
    Ok(())
}

fn load_document(pdf_path: &Path) -> Result<Document, ScanpressError> {
    Document::load(pdf_path).map_err(|e| ScanpressError::CorruptPdf {
        path: pdf_path.to_path_buf(),
        detail: e.to_string(),
    })
}

/// Whether a page directly references at least one image XObject.
///
/// Best-effort: unresolvable references and exotic resource layouts count
/// as "no image". Images nested inside Form XObjects are not counted —
/// scanned study guides put their scans straight on the page.
fn page_has_image(doc: &Document, page_id: (u32, u16)) -> bool {
    let Some(resources) = page_resources(doc, page_id) else {
        return false;
    };
    let Some(xobjects) = resources
        .get(b"XObject")
        .ok()
        .and_then(|obj| resolve(doc, obj).as_dict().ok())
    else {
        return false;
    };
    xobjects.iter().any(|(_, value)| {
        let resolved = resolve(doc, value);
        let dict = match resolved {
            Object::Stream(stream) => &stream.dict,
            other => match other.as_dict() {
                Ok(d) => d,
                Err(_) => return false,
            },
        };
        dict.get(b"Subtype")
            .and_then(Object::as_name)
            .map(|name| name == b"Image")
            .unwrap_or(false)
    })
}

/// Resources for a page, following the Pages-tree inheritance chain.
fn page_resources(doc: &Document, page_id: (u32, u16)) -> Option<&lopdf::Dictionary> {
    let mut node = doc.get_dictionary(page_id).ok()?;
    // Bounded walk: a well-formed Pages tree is shallow; the cap guards
    // against cyclic Parent references in damaged files.
    for _ in 0..32 {
        if let Some(resources) = node
            .get(b"Resources")
            .ok()
            .and_then(|obj| resolve(doc, obj).as_dict().ok())
        {
            return Some(resources);
        }
        let parent = node.get(b"Parent").ok()?.as_reference().ok()?;
        node = doc.get_dictionary(parent).ok()?;
    }
    None
}

fn resolve<'a>(doc: &'a Document, object: &'a Object) -> &'a Object {
    match object {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(object),
        other => other,
    }
}
