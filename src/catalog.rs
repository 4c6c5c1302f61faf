//! Section catalog: the ordered list of section-title markers.
//!
//! A marker is the literal substring that opens a section in the merged OCR
//! output, including whatever markup artefacts the OCR engine wraps around
//! the heading (`<h1>`, `<p><b>`, stray entities). The catalog's order is
//! the canonical document order assumed by the segmenter — it is supplied
//! as configuration, never derived from the document, so one binary serves
//! any study guide by swapping the catalog file.

use crate::error::ScanpressError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// An ordered sequence of section-title markers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionCatalog {
    markers: Vec<String>,
}

impl SectionCatalog {
    /// Build a catalog from marker strings, preserving order.
    ///
    /// Fails on an empty list or on blank markers — an empty marker would
    /// match at offset 0 of any document and corrupt every boundary.
    pub fn new(markers: Vec<String>) -> Result<Self, ScanpressError> {
        if markers.is_empty() {
            return Err(ScanpressError::EmptyCatalog);
        }
        if let Some(blank) = markers.iter().position(|m| m.trim().is_empty()) {
            return Err(ScanpressError::InvalidConfig(format!(
                "catalog marker {} is blank",
                blank + 1
            )));
        }
        Ok(Self { markers })
    }

    /// Load a catalog from a text file: one marker per line, in document
    /// order. Blank lines and lines starting with `#` are ignored.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ScanpressError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| {
            ScanpressError::CatalogReadFailed {
                path: path.to_path_buf(),
                source,
            }
        })?;
        Self::from_lines(&text)
    }

    /// Parse catalog text: one marker per line, `#` comments and blank
    /// lines skipped. Leading/trailing whitespace is trimmed — OCR markers
    /// never start or end with spaces, but hand-edited files often do.
    pub fn from_lines(text: &str) -> Result<Self, ScanpressError> {
        let markers: Vec<String> = text
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty() && !l.starts_with('#'))
            .map(str::to_owned)
            .collect();
        Self::new(markers)
    }

    /// The markers in catalog (canonical document) order.
    pub fn markers(&self) -> &[String] {
        &self.markers
    }

    /// Number of markers.
    pub fn len(&self) -> usize {
        self.markers.len()
    }

    /// Whether the catalog holds no markers. Always `false` for a
    /// successfully constructed catalog.
    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    /// Iterate markers in order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.markers.iter().map(String::as_str)
    }
}
