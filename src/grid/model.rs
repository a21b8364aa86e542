use crate::grid::cell::Cell;
use crate::grid::cell::CellKind;
use crate::grid::Grid;
use std::collections::HashMap;

/// Derived structural signals for one grid: occupancy matrix, border
/// adjacency, style clusters and merge lookup. Pure function of the grid,
/// computed once per sheet and read-only afterwards.
///
/// Style clustering groups cells whose style signature matches exactly;
/// cluster ids are assigned in first-appearance order scanning row-major,
/// so identical grids always produce identical cluster maps. Cells without
/// a style signature share cluster 0.
pub struct GridModel<'a> {
    grid: &'a Grid,
    rows: usize,
    cols: usize,
    /// Row-major index into the grid's cell vector
    cell_at: Vec<Option<u32>>,
    /// Row-major occupancy: cell present and not blank
    occupied: Vec<bool>,
    /// Row-major style cluster ids, 0 for unstyled positions
    clusters: Vec<u32>,
    /// Row-major index into the grid's merged-range table
    merge_at: Vec<Option<u32>>,
}

impl<'a> GridModel<'a> {
    /// Builds the model for a validated grid.
    pub fn build(grid: &'a Grid) -> Self {
        let rows = grid.rows();
        let cols = grid.cols();
        let mut cell_at = vec![None; rows * cols];
        for (index, cell) in grid.cells().iter().enumerate() {
            cell_at[cell.row * cols + cell.col] = Some(index as u32);
        }

        let mut occupied = vec![false; rows * cols];
        let mut clusters = vec![0u32; rows * cols];
        let mut signatures = HashMap::<u32, u32>::new();
        for position in 0..rows * cols {
            if let Some(index) = cell_at[position] {
                let cell = &grid.cells()[index as usize];
                occupied[position] = !cell.is_blank();
                if let Some(signature) = cell.style {
                    let next = signatures.len() as u32 + 1;
                    clusters[position] = *signatures.entry(signature).or_insert(next);
                }
            }
        }

        let mut merge_at = vec![None; rows * cols];
        for (index, range) in grid.merged_ranges().iter().enumerate() {
            for r in range.r0..=range.r1 {
                for c in range.c0..=range.c1 {
                    merge_at[r * cols + c] = Some(index as u32);
                }
            }
        }

        GridModel {
            grid,
            rows,
            cols,
            cell_at,
            occupied,
            clusters,
            merge_at,
        }
    }

    /// Row extent of the underlying grid.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Column extent of the underlying grid.
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Sheet name of the underlying grid.
    pub fn sheet(&self) -> &'a str {
        self.grid.name()
    }

    /// Returns the cell at a position, if the reader delivered one.
    pub fn cell(&self, row: usize, col: usize) -> Option<&'a Cell> {
        self.cell_at[row * self.cols + col].map(|index| &self.grid.cells()[index as usize])
    }

    /// Returns true if the position holds a non-blank value.
    pub fn is_occupied(&self, row: usize, col: usize) -> bool {
        self.occupied[row * self.cols + col]
    }

    /// Value kind at a position, `Empty` where no cell was delivered.
    pub fn kind(&self, row: usize, col: usize) -> CellKind {
        self.cell(row, col).map(|cell| cell.kind).unwrap_or_default()
    }

    /// Style cluster id at a position, 0 for unstyled.
    pub fn cluster(&self, row: usize, col: usize) -> u32 {
        self.clusters[row * self.cols + col]
    }

    /// Trimmed cell text at a position, `None` when blank.
    pub fn text(&self, row: usize, col: usize) -> Option<&'a str> {
        self.cell(row, col)
            .map(|cell| cell.value.trim())
            .filter(|value| !value.is_empty())
    }

    /// Trimmed cell text with merged ranges resolved to their anchor:
    /// every position a merged cell spans reads the anchor's value.
    pub fn merged_text(&self, row: usize, col: usize) -> Option<&'a str> {
        match self.merge_at[row * self.cols + col] {
            Some(index) => {
                let range = &self.grid.merged_ranges()[index as usize];
                self.text(range.r0, range.c0)
            }
            None => self.text(row, col),
        }
    }

    /// Number of occupied cells in one row restricted to a column span.
    pub(crate) fn row_fill(&self, row: usize, c0: usize, c1: usize) -> usize {
        (c0..=c1).filter(|&c| self.is_occupied(row, c)).count()
    }

    /// Number of occupied cells in one column restricted to a row span.
    pub(crate) fn col_fill(&self, col: usize, r0: usize, r1: usize) -> usize {
        (r0..=r1).filter(|&r| self.is_occupied(r, col)).count()
    }

    /// Occupancy density of an inclusive box.
    pub(crate) fn box_density(&self, r0: usize, r1: usize, c0: usize, c1: usize) -> f64 {
        let area = (r1 - r0 + 1) * (c1 - c0 + 1);
        let filled: usize = (r0..=r1).map(|r| self.row_fill(r, c0, c1)).sum();
        filled as f64 / area.max(1) as f64
    }

    /// Most frequent style cluster over the occupied cells of a box.
    /// Ties resolve to the smallest cluster id; `None` if the box is empty.
    pub(crate) fn dominant_cluster(&self, r0: usize, r1: usize, c0: usize, c1: usize) -> Option<u32> {
        let mut counts = HashMap::<u32, usize>::new();
        for r in r0..=r1 {
            for c in c0..=c1 {
                if self.is_occupied(r, c) {
                    *counts.entry(self.cluster(r, c)).or_insert(0) += 1;
                }
            }
        }
        counts
            .into_iter()
            .max_by_key(|&(cluster, count)| (count, std::cmp::Reverse(cluster)))
            .map(|(cluster, _)| cluster)
    }

    /// Most frequent value kind over the occupied cells of one column span.
    /// Ties resolve in `CellKind` declaration order; `None` if empty.
    pub(crate) fn dominant_kind(&self, col: usize, r0: usize, r1: usize) -> Option<CellKind> {
        const KINDS: [CellKind; 4] = [CellKind::Text, CellKind::Number, CellKind::Date, CellKind::Other];
        let mut counts = [0usize; 4];
        for r in r0..=r1 {
            if self.is_occupied(r, col) {
                match self.kind(r, col) {
                    CellKind::Text => counts[0] += 1,
                    CellKind::Number => counts[1] += 1,
                    CellKind::Date => counts[2] += 1,
                    CellKind::Other => counts[3] += 1,
                    CellKind::Empty => (),
                }
            }
        }
        let best = (0..4).max_by_key(|&i| (counts[i], std::cmp::Reverse(i)))?;
        (counts[best] > 0).then(|| KINDS[best])
    }

    /// Returns true if a drawn border separates `(row, col)` from `(row + 1, col)`.
    pub(crate) fn edge_below(&self, row: usize, col: usize) -> bool {
        let below = self
            .cell(row + 1, col)
            .map(|cell| cell.borders.top)
            .unwrap_or(false);
        below
            || self
                .cell(row, col)
                .map(|cell| cell.borders.bottom)
                .unwrap_or(false)
    }

    /// Returns true if a drawn border separates `(row, col)` from `(row, col + 1)`.
    pub(crate) fn edge_right(&self, row: usize, col: usize) -> bool {
        let right = self
            .cell(row, col + 1)
            .map(|cell| cell.borders.left)
            .unwrap_or(false);
        right
            || self
                .cell(row, col)
                .map(|cell| cell.borders.right)
                .unwrap_or(false)
    }

    /// Returns true if a border line runs below `row` across the whole column span.
    pub(crate) fn full_border_below(&self, row: usize, c0: usize, c1: usize) -> bool {
        row + 1 < self.rows && (c0..=c1).all(|c| self.edge_below(row, c))
    }

    /// Returns true if a border line runs right of `col` across the whole row span.
    pub(crate) fn full_border_right(&self, col: usize, r0: usize, r1: usize) -> bool {
        col + 1 < self.cols && (r0..=r1).all(|r| self.edge_right(r, col))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::cell::Borders;
    use pretty_assertions::assert_eq;

    fn grid() -> Grid {
        Grid::new(
            "s",
            3,
            3,
            vec![
                Cell::new(0, 0, CellKind::Text, "h1").with_style(40),
                Cell::new(0, 1, CellKind::Text, "h2").with_style(40),
                Cell::new(0, 2, CellKind::Text, "  ").with_style(40),
                Cell::new(1, 0, CellKind::Number, "1"),
                Cell::new(1, 1, CellKind::Number, "2").with_borders(Borders {
                    bottom: true,
                    ..Borders::NONE
                }),
                Cell::new(2, 0, CellKind::Number, "3").with_style(7),
                Cell::new(2, 1, CellKind::Text, "note"),
            ],
            Vec::new(),
        )
    }

    #[test]
    fn occupancy_ignores_blank_values() {
        let grid = grid();
        let model = GridModel::build(&grid);
        assert!(model.is_occupied(0, 0));
        assert!(!model.is_occupied(0, 2)); // whitespace-only cell
        assert!(!model.is_occupied(2, 2)); // no cell delivered
        assert_eq!(model.row_fill(0, 0, 2), 2);
        assert_eq!(model.col_fill(0, 0, 2), 3);
    }

    #[test]
    fn clusters_assigned_in_first_appearance_order() {
        let grid = grid();
        let model = GridModel::build(&grid);
        assert_eq!(model.cluster(0, 0), 1); // signature 40 seen first
        assert_eq!(model.cluster(0, 1), 1);
        assert_eq!(model.cluster(2, 0), 2); // signature 7 seen second
        assert_eq!(model.cluster(1, 0), 0); // unstyled
        assert_eq!(model.dominant_cluster(0, 2, 0, 2), Some(0));
        assert_eq!(model.dominant_cluster(0, 0, 0, 2), Some(1));
    }

    #[test]
    fn dominant_kind_per_column() {
        let grid = grid();
        let model = GridModel::build(&grid);
        assert_eq!(model.dominant_kind(0, 1, 2), Some(CellKind::Number));
        assert_eq!(model.dominant_kind(1, 0, 2), Some(CellKind::Text)); // 2 text vs 1 number
        assert_eq!(model.dominant_kind(2, 1, 2), None);
    }

    #[test]
    fn border_edges_come_from_either_side() {
        let grid = grid();
        let model = GridModel::build(&grid);
        assert!(model.edge_below(1, 1));
        assert!(!model.edge_below(0, 0));
        assert!(!model.full_border_below(1, 0, 2));
        assert!(model.full_border_below(1, 1, 1));
    }

    #[test]
    fn merged_text_resolves_anchor() {
        let grid = Grid::new(
            "s",
            2,
            2,
            vec![Cell::new(0, 0, CellKind::Text, "span").with_merge(0)],
            vec![crate::grid::MergedRange { r0: 0, r1: 0, c0: 0, c1: 1 }],
        );
        let model = GridModel::build(&grid);
        assert_eq!(model.merged_text(0, 1), Some("span"));
        assert_eq!(model.text(0, 1), None);
        assert_eq!(model.box_density(0, 1, 0, 1), 0.25);
    }
}
