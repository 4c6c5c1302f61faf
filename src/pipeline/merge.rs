//! Fragment merger: persisted per-chunk JSON → one ordered HTML document.
//!
//! Ordering is by the chunk index embedded in the filename, compared
//! **numerically** — a lexical sort would file `split_10` before `split_2`
//! and silently shuffle the book. Fragments that parse but lack
//! `content.html` are skipped with a diagnostic; one bad chunk must not
//! abort the merge.

use crate::error::{ChunkError, ScanpressError};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// The fixed envelope the merged document is persisted in.
///
/// Mirrors the digitization provider's own response shape so downstream
/// consumers can treat the merged file exactly like a single huge result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergedEnvelope {
    pub api: String,
    pub content: MergedContent,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergedContent {
    pub html: String,
}

impl MergedEnvelope {
    fn new(html: String) -> Self {
        Self {
            api: "2.0".to_string(),
            content: MergedContent { html },
        }
    }
}

/// What the merger needs from a fragment file. Everything else in the
/// provider's response is carried opaquely on disk and ignored here.
#[derive(Debug, Deserialize)]
struct Fragment {
    #[serde(default)]
    content: Option<FragmentContent>,
}

#[derive(Debug, Deserialize)]
struct FragmentContent {
    #[serde(default)]
    html: Option<String>,
}

/// Result of merging a fragments directory.
#[derive(Debug)]
pub struct MergeOutcome {
    /// Concatenated HTML, one fragment per line group, in chunk order.
    pub html: String,
    /// 1-based fragment indices that contributed HTML, ascending.
    pub merged: Vec<usize>,
    /// Per-fragment diagnostics for results without `content.html`.
    pub skipped: Vec<ChunkError>,
}

static FRAGMENT_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^split_(\d+)\.json$").expect("fragment name pattern"));

/// Merge all `split_N.json` fragments under `fragments_dir`.
///
/// Files that don't match the fragment naming scheme are ignored, so a
/// stray `.DS_Store` or editor backup cannot corrupt the output.
pub fn merge_fragments(fragments_dir: &Path) -> Result<MergeOutcome, ScanpressError> {
    let mut indexed: Vec<(usize, PathBuf)> = Vec::new();
    let entries =
        std::fs::read_dir(fragments_dir).map_err(|source| ScanpressError::WorkDirIo {
            path: fragments_dir.to_path_buf(),
            source,
        })?;
    for entry in entries {
        let entry = entry.map_err(|source| ScanpressError::WorkDirIo {
            path: fragments_dir.to_path_buf(),
            source,
        })?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        if let Some(caps) = FRAGMENT_NAME.captures(name) {
            if let Ok(index) = caps[1].parse::<usize>() {
                indexed.push((index, entry.path()));
            }
        }
    }
    indexed.sort_by_key(|(index, _)| *index);

    let mut html = String::new();
    let mut merged = Vec::new();
    let mut skipped = Vec::new();

    for (index, path) in indexed {
        let text = std::fs::read_to_string(&path).map_err(|source| ScanpressError::WorkDirIo {
            path: path.clone(),
            source,
        })?;
        let fragment: Fragment = match serde_json::from_str(&text) {
            Ok(f) => f,
            Err(e) => {
                warn!("Fragment {}: unreadable JSON ({e}), skipping", path.display());
                skipped.push(ChunkError::MissingHtml { index });
                continue;
            }
        };

        match fragment.content.and_then(|c| c.html) {
            Some(fragment_html) => {
                html.push_str(&fragment_html);
                html.push('\n');
                merged.push(index);
                debug!("Merged fragment {index} ({} bytes)", fragment_html.len());
            }
            None => {
                warn!("Fragment {}: no content.html, skipping", path.display());
                skipped.push(ChunkError::MissingHtml { index });
            }
        }
    }

    Ok(MergeOutcome {
        html,
        merged,
        skipped,
    })
}

/// Write the merged HTML to `path` wrapped in the fixed envelope.
pub fn write_envelope(path: &Path, html: &str) -> Result<(), ScanpressError> {
    let envelope = MergedEnvelope::new(html.to_string());
    let body = serde_json::to_vec_pretty(&envelope)
        .map_err(|e| ScanpressError::Internal(format!("serialize envelope: {e}")))?;
    std::fs::write(path, body).map_err(|source| ScanpressError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_fragment(dir: &Path, name: &str, json: &str) {
        std::fs::write(dir.join(name), json).unwrap();
    }

    #[test]
    fn merges_in_numeric_not_lexical_order() {
        let dir = tempfile::tempdir().unwrap();
        write_fragment(dir.path(), "split_10.json", r#"{"content":{"html":"TEN"}}"#);
        write_fragment(dir.path(), "split_2.json", r#"{"content":{"html":"TWO"}}"#);

        let outcome = merge_fragments(dir.path()).unwrap();
        assert_eq!(outcome.html, "TWO\nTEN\n");
        assert_eq!(outcome.merged, vec![2, 10]);
        assert!(outcome.skipped.is_empty());
    }

    #[test]
    fn missing_html_is_skipped_with_one_diagnostic() {
        let dir = tempfile::tempdir().unwrap();
        write_fragment(dir.path(), "split_1.json", r#"{"content":{"html":"A"}}"#);
        write_fragment(dir.path(), "split_2.json", r#"{"api":"2.0"}"#);

        let outcome = merge_fragments(dir.path()).unwrap();
        assert_eq!(outcome.html, "A\n");
        assert_eq!(outcome.merged, vec![1]);
        assert_eq!(outcome.skipped.len(), 1);
        assert!(matches!(
            outcome.skipped[0],
            ChunkError::MissingHtml { index: 2 }
        ));
    }

    #[test]
    fn non_fragment_files_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        write_fragment(dir.path(), "split_1.json", r#"{"content":{"html":"A"}}"#);
        write_fragment(dir.path(), "notes.txt", "not a fragment");
        write_fragment(dir.path(), "split_x.json", "{}");

        let outcome = merge_fragments(dir.path()).unwrap();
        assert_eq!(outcome.html, "A\n");
        assert_eq!(outcome.skipped.len(), 0);
    }

    #[test]
    fn empty_directory_merges_to_empty() {
        let dir = tempfile::tempdir().unwrap();
        let outcome = merge_fragments(dir.path()).unwrap();
        assert!(outcome.html.is_empty());
        assert!(outcome.merged.is_empty());
    }

    #[test]
    fn envelope_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("merged_output.json");
        write_envelope(&path, "<h1>One</h1>\n").unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let envelope: MergedEnvelope = serde_json::from_str(&text).unwrap();
        assert_eq!(envelope.api, "2.0");
        assert_eq!(envelope.content.html, "<h1>One</h1>\n");
    }

    #[test]
    fn unreadable_json_counts_as_missing() {
        let dir = tempfile::tempdir().unwrap();
        write_fragment(dir.path(), "split_1.json", "{ not json");

        let outcome = merge_fragments(dir.path()).unwrap();
        assert!(outcome.html.is_empty());
        assert_eq!(outcome.skipped.len(), 1);
    }
}
