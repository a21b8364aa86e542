//! # Table Module
//!
//! Candidate table regions and everything derived from them: segmentation
//! of a grid into blocks, header detection and flattening, the block-merge
//! decision, and data cleaning applied to recognized tables.
pub(crate) mod clean;
pub mod header;
pub mod merge;
pub mod segment;

use crate::grid::model::GridModel;
use serde::Serialize;

/// A candidate table region: inclusive bounding box plus the occupancy
/// facts gathered while it was built. Never mutated in place; splitting or
/// merging produces new values.
#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
pub struct Block {
    /// First row (inclusive)
    pub r0: usize,
    /// Last row (inclusive)
    pub r1: usize,
    /// First column (inclusive)
    pub c0: usize,
    /// Last column (inclusive)
    pub c1: usize,
    /// Non-empty cell fraction of the bounding box
    pub density: f64,
    /// Fully empty rows plus fully empty columns inside the bounding box
    pub holes_spanned: usize,
    /// Kept despite falling below the density threshold
    pub low_confidence: bool,
}

impl Block {
    /// Builds a block over a box, measuring density and holes from the model.
    pub(crate) fn measure(model: &GridModel, r0: usize, r1: usize, c0: usize, c1: usize) -> Self {
        let empty_rows = (r0..=r1).filter(|&r| model.row_fill(r, c0, c1) == 0).count();
        let empty_cols = (c0..=c1).filter(|&c| model.col_fill(c, r0, r1) == 0).count();
        Block {
            r0,
            r1,
            c0,
            c1,
            density: model.box_density(r0, r1, c0, c1),
            holes_spanned: empty_rows + empty_cols,
            low_confidence: false,
        }
    }

    /// Number of rows covered.
    pub fn height(&self) -> usize {
        self.r1 - self.r0 + 1
    }

    /// Number of columns covered.
    pub fn width(&self) -> usize {
        self.c1 - self.c0 + 1
    }

    /// Covered cell count.
    pub fn area(&self) -> usize {
        self.height() * self.width()
    }

    /// Returns true if the two bounding boxes share any cell.
    pub fn overlaps(&self, other: &Block) -> bool {
        self.r0 <= other.r1 && other.r0 <= self.r1 && self.c0 <= other.c1 && other.c0 <= self.c1
    }
}

/// Header classification for one block: the inclusive row range recognized
/// as header and one leaf column name per data column.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct HeaderSpec {
    /// Inclusive header row range, `None` when no row qualified
    pub rows: Option<(usize, usize)>,
    /// One flattened name per block column, duplicates disambiguated
    pub leaf_names: Vec<String>,
    /// True when no row qualified and names are synthetic positional ones
    pub ambiguous: bool,
}

impl HeaderSpec {
    /// Number of rows classified as header.
    pub fn header_row_count(&self) -> usize {
        self.rows.map(|(first, last)| last - first + 1).unwrap_or(0)
    }
}

/// Per-table quality measurements used to rank blocks within a sheet.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct TableScore {
    pub area: usize,
    pub density: f64,
    /// Mean share of the dominant value kind per column
    pub type_consistency: f64,
    /// Share of perimeter cells carrying their outward border
    pub border_completeness: f64,
    /// 1.0 when a header was recognized, 0.0 otherwise
    pub header_completeness: f64,
    /// Weighted total of the above
    pub total: f64,
}

impl TableScore {
    const W_DENSITY: f64 = 0.3;
    const W_TYPES: f64 = 0.25;
    const W_BORDERS: f64 = 0.2;
    const W_HEADER: f64 = 0.25;

    /// Measures a recognized table.
    pub(crate) fn measure(model: &GridModel, block: &Block, header: &HeaderSpec) -> Self {
        let mut score = TableScore {
            area: block.area(),
            density: block.density,
            header_completeness: if header.ambiguous { 0.0 } else { 1.0 },
            ..TableScore::default()
        };

        let mut consistency = 0.0;
        for c in block.c0..=block.c1 {
            let filled = model.col_fill(c, block.r0, block.r1);
            if filled == 0 {
                continue;
            }
            if let Some(kind) = model.dominant_kind(c, block.r0, block.r1) {
                let matching = (block.r0..=block.r1)
                    .filter(|&r| model.is_occupied(r, c) && model.kind(r, c) == kind)
                    .count();
                consistency += matching as f64 / filled as f64;
            }
        }
        score.type_consistency = consistency / block.width().max(1) as f64;

        let mut present = 0usize;
        let mut edges = 0usize;
        for c in block.c0..=block.c1 {
            edges += 2;
            if model.cell(block.r0, c).map(|cell| cell.borders.top).unwrap_or(false) {
                present += 1;
            }
            if model.cell(block.r1, c).map(|cell| cell.borders.bottom).unwrap_or(false) {
                present += 1;
            }
        }
        for r in block.r0..=block.r1 {
            edges += 2;
            if model.cell(r, block.c0).map(|cell| cell.borders.left).unwrap_or(false) {
                present += 1;
            }
            if model.cell(r, block.c1).map(|cell| cell.borders.right).unwrap_or(false) {
                present += 1;
            }
        }
        score.border_completeness = present as f64 / edges.max(1) as f64;

        score.total = Self::W_DENSITY * score.density
            + Self::W_TYPES * score.type_consistency
            + Self::W_BORDERS * score.border_completeness
            + Self::W_HEADER * score.header_completeness;
        score
    }
}

/// Non-fatal conditions carried on an emitted table for caller inspection.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TableFlag {
    /// Kept below the density threshold because a header row rescued it
    LowDensity,
    /// No header row qualified; column names are synthetic
    HeaderAmbiguous,
    /// Repeated header rows inside the data region were dropped
    MidHeadersRemoved,
    /// The table was assembled from more than one segmented block
    MergedFragments,
}

/// Final unit of output: one recognized table with its provenance,
/// handed to the external exporter in block-segmentation order.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TableMeta {
    /// Sheet the table was found on
    pub sheet: String,
    /// Bounding box and occupancy facts
    pub block: Block,
    /// Header rows and flattened leaf column names
    pub header: HeaderSpec,
    /// Inclusive data row range, `None` when the header consumed every row
    pub data_rows: Option<(usize, usize)>,
    /// Data rows dropped as repeated headers (absolute row indices)
    pub dropped_rows: Vec<usize>,
    /// Unit annotation found near the top of the data region
    pub units: Option<String>,
    /// Quality measurements
    pub score: TableScore,
    /// Highest-scoring table of its sheet
    pub is_main: bool,
    /// Number of segmented blocks this table was assembled from
    pub merged_from: usize,
    /// Non-fatal conditions observed while recognizing the table
    pub flags: Vec<TableFlag>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_geometry() {
        let block = Block {
            r0: 2,
            r1: 5,
            c0: 1,
            c1: 3,
            density: 1.0,
            holes_spanned: 0,
            low_confidence: false,
        };
        assert_eq!(block.height(), 4);
        assert_eq!(block.width(), 3);
        assert_eq!(block.area(), 12);
    }

    #[test]
    fn block_overlap() {
        let a = Block { r0: 0, r1: 4, c0: 0, c1: 4, density: 1.0, holes_spanned: 0, low_confidence: false };
        let b = Block { r0: 4, r1: 8, c0: 4, c1: 8, density: 1.0, holes_spanned: 0, low_confidence: false };
        let c = Block { r0: 5, r1: 8, c0: 0, c1: 4, density: 1.0, holes_spanned: 0, low_confidence: false };
        assert!(a.overlaps(&b)); // corner cell (4, 4) is shared
        assert!(!a.overlaps(&c));
        assert!(b.overlaps(&c));
    }

    #[test]
    fn header_row_count() {
        let spec = HeaderSpec {
            rows: Some((3, 4)),
            leaf_names: vec!["a".to_owned()],
            ambiguous: false,
        };
        assert_eq!(spec.header_row_count(), 2);
        let none = HeaderSpec {
            rows: None,
            leaf_names: vec!["column_1".to_owned()],
            ambiguous: true,
        };
        assert_eq!(none.header_row_count(), 0);
    }
}
