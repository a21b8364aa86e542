//! # Grid Module
//!
//! In-memory model of one sheet's cell grid as delivered by an external
//! cell reader, plus the derived structural signals (occupancy, borders,
//! style clusters) consumed by segmentation and header detection.
pub mod cell;
pub mod model;

use crate::grid::cell::Cell;
use thiserror::Error;

/// Errors raised when an incoming grid violates its own contract.
/// Fatal for the affected sheet only; sibling sheets keep processing.
#[derive(Error, Debug)]
pub enum GridError {
    /// Cell position lies outside the declared sheet extent
    #[error("cell at ({row}, {col}) lies outside the {rows}x{cols} sheet extent")]
    CellOutOfExtent { row: usize, col: usize, rows: usize, cols: usize },

    /// Merged range has inverted bounds
    #[error("merged range {index} has inverted bounds [{r0}:{r1}, {c0}:{c1}]")]
    InvertedMergedRange { index: usize, r0: usize, r1: usize, c0: usize, c1: usize },

    /// Merged range lies outside the declared sheet extent
    #[error("merged range {index} lies outside the {rows}x{cols} sheet extent")]
    MergedRangeOutOfExtent { index: usize, rows: usize, cols: usize },

    /// Cell references a merged range that does not exist
    #[error("cell at ({row}, {col}) references missing merged range {index}")]
    MissingMergedRange { row: usize, col: usize, index: usize },

    /// Cell claims membership of a merged range it does not lie in
    #[error("cell at ({row}, {col}) lies outside its merged range {index}")]
    CellOutsideMergedRange { row: usize, col: usize, index: usize },
}

/// An inclusive rectangle of merged cells.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct MergedRange {
    /// First row (inclusive)
    pub r0: usize,
    /// Last row (inclusive)
    pub r1: usize,
    /// First column (inclusive)
    pub c0: usize,
    /// Last column (inclusive)
    pub c1: usize,
}

impl MergedRange {
    /// Checks whether a position lies inside the range.
    pub fn contains(&self, row: usize, col: usize) -> bool {
        self.r0 <= row && row <= self.r1 && self.c0 <= col && col <= self.c1
    }
}

/// One sheet's full cell collection plus its row/column extent.
/// Owned by the run that built it; read-only to all downstream components.
#[derive(Clone, Debug)]
pub struct Grid {
    name: String,
    rows: usize,
    cols: usize,
    cells: Vec<Cell>,
    merged: Vec<MergedRange>,
}

impl Grid {
    /// Creates a grid from reader output. Call [`Grid::validate`] before
    /// handing the grid to the pipeline; the orchestrator does so itself.
    pub fn new(
        name: impl Into<String>,
        rows: usize,
        cols: usize,
        cells: Vec<Cell>,
        merged: Vec<MergedRange>,
    ) -> Self {
        Grid {
            name: name.into(),
            rows,
            cols,
            cells,
            merged,
        }
    }

    /// Sheet name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Row extent.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Column extent.
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// All cells delivered by the reader.
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// All merged ranges delivered by the reader.
    pub fn merged_ranges(&self) -> &[MergedRange] {
        &self.merged
    }

    /// Checks the grid against its own contract: every cell inside the
    /// extent, every merged range well-formed and in range, every merge
    /// membership consistent. A violation means the upstream reader is
    /// broken and the sheet must fail loudly.
    pub fn validate(&self) -> Result<(), GridError> {
        for cell in &self.cells {
            if cell.row >= self.rows || cell.col >= self.cols {
                return Err(GridError::CellOutOfExtent {
                    row: cell.row,
                    col: cell.col,
                    rows: self.rows,
                    cols: self.cols,
                });
            }
            if let Some(index) = cell.merge {
                let range = self.merged.get(index).ok_or(GridError::MissingMergedRange {
                    row: cell.row,
                    col: cell.col,
                    index,
                })?;
                if !range.contains(cell.row, cell.col) {
                    return Err(GridError::CellOutsideMergedRange {
                        row: cell.row,
                        col: cell.col,
                        index,
                    });
                }
            }
        }
        for (index, range) in self.merged.iter().enumerate() {
            if range.r1 < range.r0 || range.c1 < range.c0 {
                return Err(GridError::InvertedMergedRange {
                    index,
                    r0: range.r0,
                    r1: range.r1,
                    c0: range.c0,
                    c1: range.c1,
                });
            }
            if range.r1 >= self.rows || range.c1 >= self.cols {
                return Err(GridError::MergedRangeOutOfExtent {
                    index,
                    rows: self.rows,
                    cols: self.cols,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::cell::CellKind;

    #[test]
    fn validate_accepts_well_formed_grid() {
        let grid = Grid::new(
            "Sheet1",
            2,
            2,
            vec![
                Cell::new(0, 0, CellKind::Text, "a").with_merge(0),
                Cell::new(1, 1, CellKind::Number, "1"),
            ],
            vec![MergedRange { r0: 0, r1: 0, c0: 0, c1: 1 }],
        );
        assert!(grid.validate().is_ok());
    }

    #[test]
    fn validate_rejects_cell_outside_extent() {
        let grid = Grid::new("s", 2, 2, vec![Cell::new(5, 0, CellKind::Text, "a")], Vec::new());
        assert!(matches!(
            grid.validate(),
            Err(GridError::CellOutOfExtent { row: 5, col: 0, .. })
        ));
    }

    #[test]
    fn validate_rejects_inverted_merged_range() {
        let grid = Grid::new(
            "s",
            3,
            3,
            Vec::new(),
            vec![MergedRange { r0: 2, r1: 1, c0: 0, c1: 0 }],
        );
        assert!(matches!(
            grid.validate(),
            Err(GridError::InvertedMergedRange { index: 0, .. })
        ));
    }

    #[test]
    fn validate_rejects_merge_membership_mismatch() {
        let grid = Grid::new(
            "s",
            3,
            3,
            vec![Cell::new(2, 2, CellKind::Text, "x").with_merge(0)],
            vec![MergedRange { r0: 0, r1: 0, c0: 0, c1: 1 }],
        );
        assert!(matches!(
            grid.validate(),
            Err(GridError::CellOutsideMergedRange { row: 2, col: 2, index: 0 })
        ));
        let grid = Grid::new(
            "s",
            3,
            3,
            vec![Cell::new(0, 0, CellKind::Text, "x").with_merge(9)],
            Vec::new(),
        );
        assert!(matches!(
            grid.validate(),
            Err(GridError::MissingMergedRange { index: 9, .. })
        ));
    }
}
