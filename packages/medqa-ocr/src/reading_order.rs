//! Reading-order reconstruction for detected text boxes.
//!
//! A page is read column by column: every box is assigned to the left column,
//! the right column, or marked as spanning both (titles, full-width
//! paragraphs). Spanning boxes split the page into vertical sections, and each
//! section is emitted as its left column top to bottom, then its right column
//! top to bottom, then the spanning box that closes it.
//!
//! Single-column pages need no special handling: their boxes either all fall
//! in one column or all span the boundary, and both cases degrade to a plain
//! top-to-bottom sort.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::clustering::kmeans_two;
use crate::region::BoundingBox;

/// How the column boundary of a page is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnSplit {
    /// The horizontal midpoint of the page.
    #[default]
    Midpoint,
    /// Two-group K-means over box centers; falls back to a single column when
    /// the groups are closer than `min_column_gap_ratio` of the page width.
    KMeans,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadingOrderConfig {
    /// Boxes whose `top` lies within this many pixels of a band's first box
    /// are read as one line, left to right. `0` disables banding.
    pub line_tolerance: i32,
    pub column_split: ColumnSplit,
    /// A box must cross the boundary by this fraction of the page width on
    /// both sides to count as spanning.
    pub spanning_margin_ratio: f64,
    pub min_column_gap_ratio: f64,
}

impl Default for ReadingOrderConfig {
    fn default() -> Self {
        Self {
            line_tolerance: 0,
            column_split: ColumnSplit::Midpoint,
            spanning_margin_ratio: 0.05,
            min_column_gap_ratio: 0.25,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Column {
    Left,
    Right,
    Spanning,
}

/// A box annotated with its place in the page's reading sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderedBox {
    pub position: usize,
    /// Index of the box in the resolver input.
    pub source_index: usize,
    pub bbox: BoundingBox,
    pub column: Column,
}

#[derive(Debug, Clone, Default)]
pub struct ReadingOrderResolver {
    config: ReadingOrderConfig,
}

impl ReadingOrderResolver {
    pub fn new(config: ReadingOrderConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ReadingOrderConfig {
        &self.config
    }

    /// Orders the boxes of one page.
    ///
    /// Every input box appears exactly once in the output, duplicates
    /// included. The result depends only on the input, never on sort
    /// stability, because the input index is the final tie-break.
    pub fn resolve(&self, boxes: &[BoundingBox], page_width: u32) -> Vec<OrderedBox> {
        if boxes.is_empty() {
            return Vec::new();
        }

        let boundary = self.column_boundary(boxes, page_width);
        let margin = self.config.spanning_margin_ratio * f64::from(page_width);

        let mut left = Vec::new();
        let mut right = Vec::new();
        let mut spanning = Vec::new();
        for (index, bbox) in boxes.iter().enumerate() {
            let entry = (index, *bbox);
            match classify(bbox, boundary, margin) {
                Column::Left => left.push(entry),
                Column::Right => right.push(entry),
                Column::Spanning => spanning.push(entry),
            }
        }

        spanning.sort_by(by_position);
        let span_tops: Vec<i32> = spanning.iter().map(|(_, b)| b.top).collect();
        let section_of = |bbox: &BoundingBox| span_tops.partition_point(|&top| top <= bbox.top);

        let left = self.sort_column(left);
        let right = self.sort_column(right);

        let mut ordered = Vec::with_capacity(boxes.len());
        let mut push = |(source_index, bbox): (usize, BoundingBox), column: Column| {
            let position = ordered.len();
            ordered.push(OrderedBox {
                position,
                source_index,
                bbox,
                column,
            });
        };

        for section in 0..=spanning.len() {
            for entry in left.iter().filter(|(_, b)| section_of(b) == section) {
                push(*entry, Column::Left);
            }
            for entry in right.iter().filter(|(_, b)| section_of(b) == section) {
                push(*entry, Column::Right);
            }
            if let Some(entry) = spanning.get(section) {
                push(*entry, Column::Spanning);
            }
        }

        ordered
    }

    /// Horizontal split between the columns, `None` for a single-column page.
    fn column_boundary(&self, boxes: &[BoundingBox], page_width: u32) -> Option<f64> {
        let width = f64::from(page_width);
        match self.config.column_split {
            ColumnSplit::Midpoint => Some(width / 2.0),
            ColumnSplit::KMeans => {
                let centers: Vec<f64> = boxes.iter().map(BoundingBox::center_x).collect();
                let groups = kmeans_two(&centers);
                if groups.separation() >= self.config.min_column_gap_ratio * width {
                    Some((groups.low_centroid + groups.high_centroid) / 2.0)
                } else {
                    tracing::debug!(
                        separation = groups.separation(),
                        "column groups too close, reading page as a single column"
                    );
                    None
                }
            }
        }
    }

    fn sort_column(&self, mut entries: Vec<(usize, BoundingBox)>) -> Vec<(usize, BoundingBox)> {
        entries.sort_by(by_position);

        let tolerance = self.config.line_tolerance;
        if tolerance <= 0 || entries.len() < 2 {
            return entries;
        }

        let mut band = 0usize;
        let mut anchor = entries[0].1.top;
        let mut banded: Vec<(usize, (usize, BoundingBox))> = Vec::with_capacity(entries.len());
        for entry in entries {
            if entry.1.top.saturating_sub(anchor) > tolerance {
                band += 1;
                anchor = entry.1.top;
            }
            banded.push((band, entry));
        }

        banded.sort_by(|(band_a, a), (band_b, b)| {
            band_a
                .cmp(band_b)
                .then(a.1.left.cmp(&b.1.left))
                .then(a.1.top.cmp(&b.1.top))
                .then(a.0.cmp(&b.0))
        });
        banded.into_iter().map(|(_, entry)| entry).collect()
    }
}

fn classify(bbox: &BoundingBox, boundary: Option<f64>, margin: f64) -> Column {
    let Some(boundary) = boundary else {
        return Column::Left;
    };

    let left = f64::from(bbox.left);
    let right = f64::from(bbox.right);
    if left < boundary - margin && right > boundary + margin {
        Column::Spanning
    } else if bbox.center_x() < boundary {
        Column::Left
    } else {
        Column::Right
    }
}

fn by_position(a: &(usize, BoundingBox), b: &(usize, BoundingBox)) -> Ordering {
    a.1.top
        .cmp(&b.1.top)
        .then(a.1.left.cmp(&b.1.left))
        .then(a.0.cmp(&b.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn boxes(raw: &[[i32; 4]]) -> Vec<BoundingBox> {
        raw.iter().copied().map(BoundingBox::from).collect()
    }

    fn order(resolved: &[OrderedBox]) -> Vec<usize> {
        resolved.iter().map(|b| b.source_index).collect()
    }

    #[test]
    fn test_empty_page() {
        let resolver = ReadingOrderResolver::default();
        assert!(resolver.resolve(&[], 300).is_empty());
    }

    #[test]
    fn test_two_column_page() {
        let resolver = ReadingOrderResolver::default();
        let input = boxes(&[[0, 0, 100, 20], [150, 0, 250, 20], [0, 25, 100, 45]]);
        let resolved = resolver.resolve(&input, 300);

        assert_eq!(order(&resolved), vec![0, 2, 1]);
        assert_eq!(
            resolved.iter().map(|b| b.column).collect::<Vec<_>>(),
            vec![Column::Left, Column::Left, Column::Right]
        );
        assert_eq!(
            resolved.iter().map(|b| b.position).collect::<Vec<_>>(),
            vec![0, 1, 2]
        );
    }

    #[test]
    fn test_spanning_title_opens_page() {
        let resolver = ReadingOrderResolver::default();
        let input = boxes(&[
            [160, 60, 290, 100], // right column
            [10, 60, 140, 100],  // left column
            [10, 5, 290, 40],    // full-width title
        ]);
        assert_eq!(order(&resolver.resolve(&input, 300)), vec![2, 1, 0]);
    }

    #[test]
    fn test_spanning_box_separates_sections() {
        let resolver = ReadingOrderResolver::default();
        let input = boxes(&[
            [10, 0, 140, 40],    // 0: left, section 0
            [160, 0, 290, 40],   // 1: right, section 0
            [10, 50, 290, 70],   // 2: full-width figure caption
            [160, 80, 290, 120], // 3: right, section 1
            [10, 80, 140, 120],  // 4: left, section 1
        ]);
        assert_eq!(order(&resolver.resolve(&input, 300)), vec![0, 1, 2, 4, 3]);
    }

    #[test]
    fn test_single_column_page_reads_top_down() {
        let resolver = ReadingOrderResolver::default();
        let input = boxes(&[[20, 200, 280, 260], [20, 10, 280, 60], [20, 100, 280, 160]]);
        assert_eq!(order(&resolver.resolve(&input, 300)), vec![1, 2, 0]);
    }

    #[test]
    fn test_duplicates_pass_through_in_stable_order() {
        let resolver = ReadingOrderResolver::default();
        let input = boxes(&[[0, 10, 100, 20], [0, 10, 100, 20], [0, 0, 100, 5]]);
        let resolved = resolver.resolve(&input, 300);
        assert_eq!(order(&resolved), vec![2, 0, 1]);
        assert_eq!(resolver.resolve(&input, 300), resolved);
    }

    #[test]
    fn test_overlapping_boxes_ordered_by_top_then_left() {
        let resolver = ReadingOrderResolver::default();
        let input = boxes(&[[40, 10, 120, 30], [10, 10, 100, 30], [5, 12, 60, 25]]);
        assert_eq!(order(&resolver.resolve(&input, 300)), vec![1, 0, 2]);
    }

    #[test]
    fn test_column_order_is_non_decreasing_in_top() {
        let resolver = ReadingOrderResolver::default();
        let mut seed = 7u32;
        let mut next = move |modulo: u32| {
            seed = seed.wrapping_mul(1_103_515_245).wrapping_add(12_345);
            ((seed >> 8) % modulo) as i32
        };
        let input: Vec<BoundingBox> = (0..60)
            .map(|_| {
                let left = next(280);
                let top = next(900);
                BoundingBox::new(left, top, left + 10 + next(10), top + 5 + next(30))
            })
            .collect();

        let resolved = resolver.resolve(&input, 300);
        assert_eq!(resolved.len(), input.len());
        assert_eq!(resolver.resolve(&input, 300), resolved);

        for column in [Column::Left, Column::Right, Column::Spanning] {
            let in_column: Vec<&OrderedBox> =
                resolved.iter().filter(|b| b.column == column).collect();
            for pair in in_column.windows(2) {
                let (a, b) = (pair[0].bbox, pair[1].bbox);
                assert!(a.top <= b.top, "{a} read before {b}");
                if a.top == b.top {
                    assert!(a.left <= b.left, "{a} read before {b}");
                }
            }
        }
    }

    #[test]
    fn test_line_band_reads_left_to_right() {
        let resolver = ReadingOrderResolver::new(ReadingOrderConfig {
            line_tolerance: 10,
            ..Default::default()
        });
        let input = boxes(&[[70, 4, 130, 20], [10, 0, 60, 20], [10, 40, 60, 60]]);
        assert_eq!(order(&resolver.resolve(&input, 300)), vec![1, 0, 2]);

        let strict = ReadingOrderResolver::default();
        assert_eq!(order(&strict.resolve(&input, 300)), vec![1, 0, 2]);

        let skewed = boxes(&[[10, 4, 60, 20], [70, 0, 130, 20]]);
        assert_eq!(order(&strict.resolve(&skewed, 300)), vec![1, 0]);
        assert_eq!(order(&resolver.resolve(&skewed, 300)), vec![0, 1]);
    }

    #[test]
    fn test_kmeans_split_finds_off_center_gutter() {
        let resolver = ReadingOrderResolver::new(ReadingOrderConfig {
            column_split: ColumnSplit::KMeans,
            ..Default::default()
        });
        // narrow sidebar on the left, main column starting left of page center
        let input = boxes(&[
            [100, 0, 290, 40],
            [10, 0, 60, 40],
            [100, 50, 290, 90],
            [10, 50, 60, 90],
        ]);
        let resolved = resolver.resolve(&input, 300);
        assert_eq!(order(&resolved), vec![1, 3, 0, 2]);

        // at the page midpoint the main column reads as full-width
        let midpoint = ReadingOrderResolver::default();
        assert_eq!(order(&midpoint.resolve(&input, 300)), vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_kmeans_single_column_fallback() {
        let resolver = ReadingOrderResolver::new(ReadingOrderConfig {
            column_split: ColumnSplit::KMeans,
            ..Default::default()
        });
        let input = boxes(&[[100, 50, 200, 60], [110, 0, 190, 20], [105, 20, 195, 40]]);
        let resolved = resolver.resolve(&input, 300);
        assert_eq!(order(&resolved), vec![1, 2, 0]);
        assert!(resolved.iter().all(|b| b.column == Column::Left));
    }

    #[test]
    fn test_banding_with_extreme_coordinates() {
        let resolver = ReadingOrderResolver::new(ReadingOrderConfig {
            line_tolerance: 10,
            ..Default::default()
        });
        let input = boxes(&[
            [0, 100, 100, 120],
            [0, i32::MIN, 100, 20],
            [0, i32::MAX, 100, i32::MAX],
            [40, 105, 90, 118],
        ]);
        let resolved = resolver.resolve(&input, 300);
        assert_eq!(order(&resolved), vec![1, 0, 3, 2]);
    }
}
