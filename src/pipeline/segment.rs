//! Section segmenter: slice the merged HTML at catalog markers.
//!
//! For each marker the algorithm takes its **first** occurrence as the
//! section start and closes the section at the nearest following
//! occurrence of *any* catalog marker; a section whose marker never
//! appears is reported missing without failing the batch.
//!
//! The algorithm assumes markers are unique substrings appearing in
//! catalog order. When that holds the slices tile the document exactly;
//! when it doesn't (a repeated heading, a catalog out of document order)
//! adjacent slices can overlap or swallow an unmatched heading. A more
//! robust design would locate every marker offset, sort ascending, and
//! slice consecutively — kept out deliberately to preserve the observed
//! slicing behaviour for existing catalogs.

use crate::catalog::SectionCatalog;
use crate::error::SectionError;
use crate::output::Section;
use tracing::warn;

/// Extract the section opened by `marker`.
///
/// Returns `None` when the marker does not occur in `html`. The section
/// body includes the marker itself and runs to the closest following
/// catalog-marker occurrence, or to the end of the document.
pub fn extract_section(html: &str, catalog: &SectionCatalog, marker: &str) -> Option<Section> {
    let start = html.find(marker)?;

    // Search resumes one character past the section start so a marker
    // cannot terminate itself. char-based, not byte-based: catalogs for
    // Korean study guides start markers on multi-byte characters.
    let resume = start
        + html[start..]
            .chars()
            .next()
            .map(char::len_utf8)
            .unwrap_or(1);

    let end = catalog
        .iter()
        .filter_map(|m| html[resume..].find(m).map(|pos| resume + pos))
        .min()
        .unwrap_or(html.len());

    Some(Section {
        title: marker.to_string(),
        body: html[start..end].to_string(),
    })
}

/// Extract every catalog section from the merged HTML, in catalog order.
///
/// Missing markers become [`SectionError::MarkerNotFound`] diagnostics;
/// the batch never fails as a whole.
pub fn extract_sections(
    html: &str,
    catalog: &SectionCatalog,
) -> (Vec<Section>, Vec<SectionError>) {
    let mut sections = Vec::new();
    let mut missing = Vec::new();

    for marker in catalog.iter() {
        match extract_section(html, catalog, marker) {
            Some(section) => sections.push(section),
            None => {
                warn!("Section marker not found, skipping: {marker:?}");
                missing.push(SectionError::MarkerNotFound {
                    marker: marker.to_string(),
                });
            }
        }
    }

    (sections, missing)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog(markers: &[&str]) -> SectionCatalog {
        SectionCatalog::new(markers.iter().map(|m| m.to_string()).collect()).unwrap()
    }

    #[test]
    fn slices_between_adjacent_markers() {
        let html = "X<h1>One</h1>body1<h1>Two</h1>body2";
        let cat = catalog(&["<h1>One</h1>", "<h1>Two</h1>"]);

        let one = extract_section(html, &cat, "<h1>One</h1>").unwrap();
        assert_eq!(one.body, "<h1>One</h1>body1");

        let two = extract_section(html, &cat, "<h1>Two</h1>").unwrap();
        assert_eq!(two.body, "<h1>Two</h1>body2");
    }

    #[test]
    fn last_section_runs_to_document_end() {
        let html = "<h1>Only</h1>everything after";
        let cat = catalog(&["<h1>Only</h1>"]);
        let section = extract_section(html, &cat, "<h1>Only</h1>").unwrap();
        assert_eq!(section.body, html);
    }

    #[test]
    fn missing_marker_is_none() {
        let cat = catalog(&["<h1>One</h1>", "<h1>Ghost</h1>"]);
        assert!(extract_section("<h1>One</h1>x", &cat, "<h1>Ghost</h1>").is_none());
    }

    #[test]
    fn batch_reports_missing_markers_without_failing() {
        let html = "<h1>One</h1>body1";
        let cat = catalog(&["<h1>One</h1>", "<h1>Ghost</h1>"]);

        let (sections, missing) = extract_sections(html, &cat);
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].title, "<h1>One</h1>");
        assert_eq!(missing.len(), 1);
        assert!(matches!(
            &missing[0],
            SectionError::MarkerNotFound { marker } if marker == "<h1>Ghost</h1>"
        ));
    }

    #[test]
    fn multibyte_markers_do_not_split_char_boundaries() {
        // Markers that begin with a multi-byte character: the resume
        // offset must land on a char boundary, not start + 1 byte.
        let html = "머리말<h2>1과목 개요</h2>내용 하나<h2>2과목 심화</h2>내용 둘";
        let cat = catalog(&["<h2>1과목 개요</h2>", "<h2>2과목 심화</h2>"]);

        let (sections, missing) = extract_sections(html, &cat);
        assert!(missing.is_empty());
        assert_eq!(sections[0].body, "<h2>1과목 개요</h2>내용 하나");
        assert_eq!(sections[1].body, "<h2>2과목 심화</h2>내용 둘");
    }

    #[test]
    fn marker_at_offset_zero_with_multibyte_first_char() {
        let html = "가 marker opens the document<h1>B</h1>tail";
        let cat = catalog(&["가", "<h1>B</h1>"]);
        let section = extract_section(html, &cat, "가").unwrap();
        assert_eq!(section.body, "가 marker opens the document");
    }

    #[test]
    fn sections_come_back_in_catalog_order() {
        let html = "<h1>B</h1>bb<h1>A</h1>aa";
        // Catalog order wins over document order, per the documented
        // assumption — A's slice runs to end of document here.
        let cat = catalog(&["<h1>A</h1>", "<h1>B</h1>"]);
        let (sections, _) = extract_sections(html, &cat);
        assert_eq!(sections[0].title, "<h1>A</h1>");
        assert_eq!(sections[0].body, "<h1>A</h1>aa");
        assert_eq!(sections[1].title, "<h1>B</h1>");
        assert_eq!(sections[1].body, "<h1>B</h1>bb");
    }
}
