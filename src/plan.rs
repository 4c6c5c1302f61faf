//! Split planning: page-range partitioning and the split-count heuristic.
//!
//! OCR providers impose per-request payload and complexity ceilings. Larger
//! files, image-heavy pages, and higher page counts each independently raise
//! the risk of tripping one, so [`recommend_parts`] stacks additive safety
//! margins rather than modelling a precise byte budget. It is a heuristic,
//! not an optimiser — no claim of minimality.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A contiguous, 1-indexed, inclusive range of pages.
///
/// Ranges produced by [`split_ranges`] for one document are contiguous,
/// non-overlapping, and together cover exactly `[1, total_pages]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRange {
    /// First page, 1-indexed.
    pub start: usize,
    /// Last page, inclusive. Always `>= start`.
    pub end: usize,
}

impl PageRange {
    /// Number of pages covered by this range.
    pub fn page_count(&self) -> usize {
        self.end - self.start + 1
    }
}

impl fmt::Display for PageRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// Partition `[1, total_pages]` into `num_parts` contiguous ranges.
///
/// Each part gets `total_pages / num_parts` pages; the final part absorbs
/// the remainder. Callers must clamp `num_parts` to `1..=total_pages` first
/// ([`recommend_parts`] already does) — passing more parts than pages would
/// yield degenerate empty ranges.
pub fn split_ranges(total_pages: usize, num_parts: usize) -> Vec<PageRange> {
    let base = total_pages / num_parts;
    (0..num_parts)
        .map(|i| PageRange {
            start: i * base + 1,
            end: if i + 1 == num_parts {
                total_pages
            } else {
                (i + 1) * base
            },
        })
        .collect()
}

/// What the split heuristic looks at: size, page count, and how many pages
/// carry at least one embedded image.
///
/// Produced by [`crate::pipeline::split::inspect_document`]; also useful on
/// its own for `--inspect-only` style tooling.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DocumentProfile {
    /// Size of the source PDF in bytes.
    pub file_size_bytes: u64,
    /// Total number of pages.
    pub page_count: usize,
    /// Pages containing at least one embedded image object.
    pub image_pages: usize,
}

impl DocumentProfile {
    /// File size in megabytes.
    pub fn file_size_mb(&self) -> f64 {
        self.file_size_bytes as f64 / (1024.0 * 1024.0)
    }

    /// Fraction of pages with at least one embedded image, in `[0, 1]`.
    pub fn image_page_ratio(&self) -> f64 {
        if self.page_count == 0 {
            0.0
        } else {
            self.image_pages as f64 / self.page_count as f64
        }
    }
}

/// Recommend a part count expected to keep each chunk under the OCR
/// provider's implicit size/complexity limit.
///
/// Deterministic and tiered:
/// - base tier by page count (≤10 → 1, ≤30 → 3, ≤60 → 6, ≤100 → 8,
///   ≤150 → 10, else `min(15, pages / 10)`);
/// - +2 when the average page weighs more than 1.5 MB, +1 above 1.0 MB;
/// - +2 when more than 70 % of pages carry images, +1 above 40 %;
/// - clamped so the result never exceeds the page count.
pub fn recommend_parts(profile: &DocumentProfile) -> usize {
    let pages = profile.page_count;
    let base = match pages {
        0..=10 => 1,
        11..=30 => 3,
        31..=60 => 6,
        61..=100 => 8,
        101..=150 => 10,
        n => (n / 10).min(15),
    };

    let mut parts = base;

    let avg_mb_per_page = profile.file_size_mb() / pages.max(1) as f64;
    if avg_mb_per_page > 1.5 {
        parts += 2;
    } else if avg_mb_per_page > 1.0 {
        parts += 1;
    }

    let ratio = profile.image_page_ratio();
    if ratio > 0.7 {
        parts += 2;
    } else if ratio > 0.4 {
        parts += 1;
    }

    parts.min(pages).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(file_size_bytes: u64, page_count: usize, image_pages: usize) -> DocumentProfile {
        DocumentProfile {
            file_size_bytes,
            page_count,
            image_pages,
        }
    }

    #[test]
    fn ranges_partition_exactly() {
        for total in 1..=60 {
            for parts in 1..=total {
                let ranges = split_ranges(total, parts);
                assert_eq!(ranges.len(), parts);
                assert_eq!(ranges[0].start, 1);
                assert_eq!(ranges[parts - 1].end, total);
                for pair in ranges.windows(2) {
                    assert_eq!(
                        pair[1].start,
                        pair[0].end + 1,
                        "ranges must be contiguous for total={total} parts={parts}"
                    );
                }
                let covered: usize = ranges.iter().map(PageRange::page_count).sum();
                assert_eq!(covered, total);
            }
        }
    }

    #[test]
    fn last_range_absorbs_remainder() {
        let ranges = split_ranges(10, 3);
        assert_eq!(
            ranges,
            vec![
                PageRange { start: 1, end: 3 },
                PageRange { start: 4, end: 6 },
                PageRange { start: 7, end: 10 },
            ]
        );
    }

    #[test]
    fn single_part_covers_everything() {
        assert_eq!(split_ranges(45, 1), vec![PageRange { start: 1, end: 45 }]);
    }

    #[test]
    fn base_tiers() {
        assert_eq!(recommend_parts(&profile(1 << 20, 8, 0)), 1);
        assert_eq!(recommend_parts(&profile(1 << 20, 30, 0)), 3);
        assert_eq!(recommend_parts(&profile(1 << 20, 45, 0)), 6);
        assert_eq!(recommend_parts(&profile(1 << 20, 100, 0)), 8);
        assert_eq!(recommend_parts(&profile(1 << 20, 120, 0)), 10);
        // 400 pages: 400/10 = 40, capped at 15.
        assert_eq!(recommend_parts(&profile(1 << 20, 400, 0)), 15);
    }

    #[test]
    fn size_adjustment() {
        // 45 pages at ~2 MB/page: base 6 + 2.
        let heavy = profile(45 * 2 * 1024 * 1024, 45, 0);
        assert_eq!(recommend_parts(&heavy), 8);
        // 45 pages at ~1.2 MB/page: base 6 + 1.
        let mid = profile(45 * 1_258_291, 45, 0);
        assert_eq!(recommend_parts(&mid), 7);
    }

    #[test]
    fn image_adjustment() {
        // 80 % image pages: base 6 + 2.
        assert_eq!(recommend_parts(&profile(1 << 20, 45, 36)), 8);
        // 50 % image pages: base 6 + 1.
        assert_eq!(recommend_parts(&profile(1 << 20, 45, 23)), 7);
    }

    #[test]
    fn adjustments_stack() {
        // Heavy and image-dense: 6 + 2 + 2.
        let p = profile(45 * 2 * 1024 * 1024, 45, 40);
        assert_eq!(recommend_parts(&p), 10);
    }

    #[test]
    fn never_more_parts_than_pages() {
        // 4 pages but enormous and image-heavy: clamped to the page count.
        let p = profile(64 * 1024 * 1024, 4, 4);
        assert_eq!(recommend_parts(&p), 4);
    }

    #[test]
    fn monotone_in_page_count_within_tier() {
        let mut last = 0;
        for pages in 1..=300 {
            let parts = recommend_parts(&profile(0, pages, 0));
            assert!(parts >= last, "recommendation regressed at {pages} pages");
            assert!(parts <= pages);
            last = parts;
        }
    }

    #[test]
    fn range_display() {
        assert_eq!(PageRange { start: 3, end: 9 }.to_string(), "3-9");
    }
}
