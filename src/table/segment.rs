use crate::config::ParserConfig;
use crate::grid::model::GridModel;
use crate::table::header;
use crate::table::Block;
use std::collections::VecDeque;

/// Splits a grid into candidate table blocks: hole-tolerant connected
/// components first, then a description-length comparison that decides
/// whether a component is really several tables.
pub struct Segmenter<'a> {
    config: &'a ParserConfig,
}

/// Working rectangle during segmentation, inclusive bounds.
#[derive(Copy, Clone, Debug, PartialEq)]
struct Rect {
    r0: usize,
    r1: usize,
    c0: usize,
    c1: usize,
}

impl Rect {
    fn intersects(&self, other: &Rect) -> bool {
        self.r0 <= other.r1 && other.r0 <= self.r1 && self.c0 <= other.c1 && other.c0 <= self.c1
    }

    fn union(&self, other: &Rect) -> Rect {
        Rect {
            r0: self.r0.min(other.r0),
            r1: self.r1.max(other.r1),
            c0: self.c0.min(other.c0),
            c1: self.c1.max(other.c1),
        }
    }

    fn height(&self) -> usize {
        self.r1 - self.r0 + 1
    }

    fn width(&self) -> usize {
        self.c1 - self.c0 + 1
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Axis {
    Row,
    Col,
}

/// A candidate cut through a rectangle: an empty row/column run, or a
/// full-span border line (`len == 0`). `start` is the first row/column of
/// the lower/right part.
#[derive(Copy, Clone, Debug)]
struct Cut {
    axis: Axis,
    start: usize,
    len: usize,
    border: bool,
}

impl Cut {
    /// Gap length with a bonus for a border line along the cut.
    fn strength(&self) -> f64 {
        self.len as f64 + if self.border { 0.5 } else { 0.0 }
    }
}

impl<'a> Segmenter<'a> {
    pub fn new(config: &'a ParserConfig) -> Self {
        Segmenter { config }
    }

    /// Produces the ordered block sequence for one sheet. Zero blocks is a
    /// legitimate result, not an error.
    pub fn segment(&self, model: &GridModel) -> Vec<Block> {
        if model.rows() == 0 || model.cols() == 0 {
            return Vec::new();
        }
        let components = Self::union_overlapping(self.components(model));
        let mut blocks = Vec::new();
        for rect in self.split_regions(model, components) {
            if rect.height() < self.config.min_block_height || rect.width() < self.config.min_block_width {
                continue;
            }
            let mut block = Block::measure(model, rect.r0, rect.r1, rect.c0, rect.c1);
            if block.density < self.config.density_threshold {
                let header_like = (rect.r0..=rect.r1).any(|r| {
                    header::row_score(model, r, rect.r1, rect.c0, rect.c1, self.config)
                        >= self.config.header_threshold
                });
                if !header_like {
                    continue;
                }
                block.low_confidence = true;
            }
            blocks.push(block);
        }
        blocks.sort_by_key(|block| (block.r0, block.c0));
        blocks
    }

    /// Flood fill over occupied cells. The neighbor window extends
    /// `hole_tolerance + 1` positions on each axis, so runs of up to
    /// `hole_tolerance` empty rows/columns do not break a component.
    fn components(&self, model: &GridModel) -> Vec<Rect> {
        let rows = model.rows();
        let cols = model.cols();
        let reach = (self.config.hole_tolerance + 1) as isize;
        let mut visited = vec![false; rows * cols];
        let mut components = Vec::new();
        for r in 0..rows {
            for c in 0..cols {
                if !model.is_occupied(r, c) || visited[r * cols + c] {
                    continue;
                }
                let mut rect = Rect { r0: r, r1: r, c0: c, c1: c };
                let mut queue = VecDeque::from([(r, c)]);
                visited[r * cols + c] = true;
                while let Some((cr, cc)) = queue.pop_front() {
                    rect.r0 = rect.r0.min(cr);
                    rect.r1 = rect.r1.max(cr);
                    rect.c0 = rect.c0.min(cc);
                    rect.c1 = rect.c1.max(cc);
                    for dr in -reach..=reach {
                        for dc in -reach..=reach {
                            if dr == 0 && dc == 0 {
                                continue;
                            }
                            let (nr, nc) = (cr as isize + dr, cc as isize + dc);
                            if nr < 0 || nc < 0 || nr >= rows as isize || nc >= cols as isize {
                                continue;
                            }
                            let (nr, nc) = (nr as usize, nc as usize);
                            if model.is_occupied(nr, nc) && !visited[nr * cols + nc] {
                                visited[nr * cols + nc] = true;
                                queue.push_back((nr, nc));
                            }
                        }
                    }
                }
                components.push(rect);
            }
        }
        components
    }

    /// Unions components whose bounding boxes intersect (disjoint cell
    /// sets can still produce overlapping boxes), keeping the emitted
    /// block set pairwise non-overlapping.
    fn union_overlapping(mut rects: Vec<Rect>) -> Vec<Rect> {
        let mut merged = true;
        while merged {
            merged = false;
            'outer: for i in 0..rects.len() {
                for j in (i + 1)..rects.len() {
                    if rects[i].intersects(&rects[j]) {
                        let other = rects.swap_remove(j);
                        rects[i] = rects[i].union(&other);
                        merged = true;
                        break 'outer;
                    }
                }
            }
        }
        rects
    }

    /// Applies the MDL split decision with an explicit work stack instead
    /// of recursing: children are pushed back until no beneficial split
    /// remains.
    fn split_regions(&self, model: &GridModel, components: Vec<Rect>) -> Vec<Rect> {
        let mut stack = components;
        let mut done = Vec::new();
        while let Some(rect) = stack.pop() {
            match self.best_split(model, &rect) {
                Some((first, second)) => {
                    stack.push(first);
                    stack.push(second);
                }
                None => done.push(rect),
            }
        }
        done
    }

    /// Evaluates candidate cuts from the strongest discontinuity inward and
    /// returns the first split that reduces total description cost.
    fn best_split(&self, model: &GridModel, rect: &Rect) -> Option<(Rect, Rect)> {
        let whole = self.cost(model, rect);
        for cut in self.candidate_cuts(model, rect) {
            let Some((first, second)) = self.apply_cut(model, rect, &cut) else {
                continue;
            };
            if first.height() < self.config.min_block_height
                || second.height() < self.config.min_block_height
                || first.width() < self.config.min_block_width
                || second.width() < self.config.min_block_width
            {
                continue;
            }
            let split = self.cost(model, &first) + self.cost(model, &second) + self.config.boundary_cost;
            if split < whole - self.config.split_benefit_threshold {
                return Some((first, second));
            }
        }
        None
    }

    /// Region description cost: sparsity plus occupancy irregularity plus
    /// the fixed per-block overhead.
    fn cost(&self, model: &GridModel, rect: &Rect) -> f64 {
        let (sparsity_w, entropy_w, overhead) = self.config.mdl_weights;
        let density = model.box_density(rect.r0, rect.r1, rect.c0, rect.c1);
        sparsity_w * (1.0 - density) + entropy_w * self.occupancy_entropy(model, rect) + overhead
    }

    /// Mean binary entropy of the per-row and per-column fill fractions.
    /// Regular regions (rows either full or empty) cost nothing; ragged
    /// ones approach 1.
    fn occupancy_entropy(&self, model: &GridModel, rect: &Rect) -> f64 {
        fn binary_entropy(p: f64) -> f64 {
            if p <= 0.0 || p >= 1.0 {
                0.0
            } else {
                -(p * p.log2() + (1.0 - p) * (1.0 - p).log2())
            }
        }
        let width = rect.width() as f64;
        let height = rect.height() as f64;
        let rows: f64 = (rect.r0..=rect.r1)
            .map(|r| binary_entropy(model.row_fill(r, rect.c0, rect.c1) as f64 / width))
            .sum();
        let cols: f64 = (rect.c0..=rect.c1)
            .map(|c| binary_entropy(model.col_fill(c, rect.r0, rect.r1) as f64 / height))
            .sum();
        (rows + cols) / (rect.height() + rect.width()) as f64
    }

    /// Collects empty-run and border-line cuts, strongest first. Row cuts
    /// win ties over column cuts, earlier positions over later ones, so
    /// the scan order is deterministic.
    fn candidate_cuts(&self, model: &GridModel, rect: &Rect) -> Vec<Cut> {
        let mut cuts = Vec::new();
        let mut run_start = None;
        for r in rect.r0..=rect.r1 {
            if model.row_fill(r, rect.c0, rect.c1) == 0 {
                run_start.get_or_insert(r);
            } else if let Some(start) = run_start.take() {
                cuts.push(Cut {
                    axis: Axis::Row,
                    start,
                    len: r - start,
                    border: model.full_border_below(r - 1, rect.c0, rect.c1),
                });
            }
        }
        let mut run_start = None;
        for c in rect.c0..=rect.c1 {
            if model.col_fill(c, rect.r0, rect.r1) == 0 {
                run_start.get_or_insert(c);
            } else if let Some(start) = run_start.take() {
                cuts.push(Cut {
                    axis: Axis::Col,
                    start,
                    len: c - start,
                    border: model.full_border_right(c - 1, rect.r0, rect.r1),
                });
            }
        }
        for r in rect.r0..rect.r1 {
            if model.row_fill(r, rect.c0, rect.c1) > 0
                && model.row_fill(r + 1, rect.c0, rect.c1) > 0
                && model.full_border_below(r, rect.c0, rect.c1)
            {
                cuts.push(Cut { axis: Axis::Row, start: r + 1, len: 0, border: true });
            }
        }
        for c in rect.c0..rect.c1 {
            if model.col_fill(c, rect.r0, rect.r1) > 0
                && model.col_fill(c + 1, rect.r0, rect.r1) > 0
                && model.full_border_right(c, rect.r0, rect.r1)
            {
                cuts.push(Cut { axis: Axis::Col, start: c + 1, len: 0, border: true });
            }
        }
        cuts.sort_by(|a, b| {
            b.strength()
                .total_cmp(&a.strength())
                .then_with(|| (a.axis == Axis::Col).cmp(&(b.axis == Axis::Col)))
                .then_with(|| a.start.cmp(&b.start))
        });
        cuts
    }

    /// Splits a rectangle at a cut and shrinks both parts to their
    /// occupied extent. `None` if either side ends up empty.
    fn apply_cut(&self, model: &GridModel, rect: &Rect, cut: &Cut) -> Option<(Rect, Rect)> {
        let (a, b) = match cut.axis {
            Axis::Row => (
                Rect { r1: cut.start - 1, ..*rect },
                Rect { r0: cut.start + cut.len, ..*rect },
            ),
            Axis::Col => (
                Rect { c1: cut.start - 1, ..*rect },
                Rect { c0: cut.start + cut.len, ..*rect },
            ),
        };
        Some((Self::tighten(model, &a)?, Self::tighten(model, &b)?))
    }

    /// Shrinks a rectangle to the bounding box of its occupied cells.
    fn tighten(model: &GridModel, rect: &Rect) -> Option<Rect> {
        let mut tight: Option<Rect> = None;
        for r in rect.r0..=rect.r1 {
            for c in rect.c0..=rect.c1 {
                if model.is_occupied(r, c) {
                    tight = Some(match tight {
                        Some(t) => Rect {
                            r0: t.r0.min(r),
                            r1: t.r1.max(r),
                            c0: t.c0.min(c),
                            c1: t.c1.max(c),
                        },
                        None => Rect { r0: r, r1: r, c0: c, c1: c },
                    });
                }
            }
        }
        tight
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::cell::Cell;
    use crate::grid::cell::CellKind;
    use crate::grid::Grid;
    use pretty_assertions::assert_eq;

    fn number(row: usize, col: usize) -> Cell {
        Cell::new(row, col, CellKind::Number, "1")
    }

    fn text(row: usize, col: usize, value: &str) -> Cell {
        Cell::new(row, col, CellKind::Text, value)
    }

    fn build(rows: usize, cols: usize, cells: Vec<Cell>) -> Grid {
        Grid::new("s", rows, cols, cells, Vec::new())
    }

    fn dense(r0: usize, r1: usize, c0: usize, c1: usize) -> Vec<Cell> {
        let mut cells = Vec::new();
        for r in r0..=r1 {
            for c in c0..=c1 {
                cells.push(number(r, c));
            }
        }
        cells
    }

    fn boxes(blocks: &[Block]) -> Vec<(usize, usize, usize, usize)> {
        blocks.iter().map(|b| (b.r0, b.r1, b.c0, b.c1)).collect()
    }

    #[test]
    fn single_blank_row_within_tolerance_keeps_one_block() {
        // 10x5, fully dense except row 5, hole_tolerance = 1
        let mut cells = dense(0, 4, 0, 4);
        cells.extend(dense(6, 9, 0, 4));
        let grid = build(10, 5, cells);
        let model = GridModel::build(&grid);
        let config = ParserConfig::default();
        let blocks = Segmenter::new(&config).segment(&model);
        assert_eq!(boxes(&blocks), vec![(0, 9, 0, 4)]);
        assert_eq!(blocks[0].holes_spanned, 1);
    }

    #[test]
    fn two_blank_rows_beyond_tolerance_split_in_two() {
        let mut cells = dense(0, 4, 0, 4);
        cells.extend(dense(7, 9, 0, 4));
        let grid = build(10, 5, cells);
        let model = GridModel::build(&grid);
        let config = ParserConfig::default();
        let blocks = Segmenter::new(&config).segment(&model);
        assert_eq!(boxes(&blocks), vec![(0, 4, 0, 4), (7, 9, 0, 4)]);
    }

    #[test]
    fn hole_tolerance_boundary_is_exact() {
        // Gap of exactly `hole_tolerance` rows stays connected; one more splits.
        let config = ParserConfig {
            hole_tolerance: 2,
            ..ParserConfig::default()
        };
        let mut cells = dense(0, 3, 0, 3);
        cells.extend(dense(6, 9, 0, 3));
        let grid = build(10, 4, cells);
        let model = GridModel::build(&grid);
        let blocks = Segmenter::new(&config).segment(&model);
        assert_eq!(boxes(&blocks), vec![(0, 9, 0, 3)]);

        let mut cells = dense(0, 3, 0, 3);
        cells.extend(dense(7, 10, 0, 3));
        let grid = build(11, 4, cells);
        let model = GridModel::build(&grid);
        let blocks = Segmenter::new(&config).segment(&model);
        assert_eq!(boxes(&blocks), vec![(0, 3, 0, 3), (7, 10, 0, 3)]);
    }

    #[test]
    fn wide_column_gap_splits_side_by_side_tables() {
        let mut cells = dense(0, 5, 0, 3);
        cells.extend(dense(0, 5, 7, 10));
        let grid = build(6, 11, cells);
        let model = GridModel::build(&grid);
        let config = ParserConfig::default();
        let blocks = Segmenter::new(&config).segment(&model);
        assert_eq!(boxes(&blocks), vec![(0, 5, 0, 3), (0, 5, 7, 10)]);
    }

    #[test]
    fn mdl_separates_title_corner_from_table() {
        // A small 2x2 title area one blank row above a 7x10 table stays one
        // connected component but costs less as two blocks.
        let mut cells = vec![
            text(0, 0, "report"),
            text(0, 1, "2024"),
            text(1, 0, "region"),
            text(1, 1, "east"),
        ];
        cells.extend(dense(3, 9, 0, 9));
        let grid = build(10, 10, cells);
        let model = GridModel::build(&grid);
        let config = ParserConfig::default();
        let blocks = Segmenter::new(&config).segment(&model);
        assert_eq!(boxes(&blocks), vec![(0, 1, 0, 1), (3, 9, 0, 9)]);
    }

    #[test]
    fn sparse_scatter_is_discarded_as_noise() {
        let grid = build(
            8,
            8,
            vec![number(0, 0), number(3, 4), number(7, 7), number(5, 1)],
        );
        let model = GridModel::build(&grid);
        let config = ParserConfig::default();
        let blocks = Segmenter::new(&config).segment(&model);
        assert_eq!(blocks, Vec::new());
    }

    #[test]
    fn sparse_block_with_header_row_is_kept_low_confidence() {
        // Full text row on top, two stray cells below: density 7/25 < 0.3
        // but the header row rescues the block.
        let mut cells: Vec<Cell> = (0..5).map(|c| text(0, c, "name")).collect();
        cells.push(number(2, 0));
        cells.push(number(4, 1));
        let grid = build(5, 5, cells);
        let model = GridModel::build(&grid);
        let config = ParserConfig::default();
        let blocks = Segmenter::new(&config).segment(&model);
        assert_eq!(blocks.len(), 1);
        assert!(blocks[0].low_confidence);
        assert!(blocks[0].density < config.density_threshold);
    }

    #[test]
    fn blocks_are_ordered_and_non_overlapping() {
        let mut cells = dense(0, 3, 0, 2);
        cells.extend(dense(0, 3, 6, 8));
        cells.extend(dense(7, 10, 0, 2));
        cells.extend(dense(7, 10, 6, 8));
        let grid = build(11, 9, cells);
        let model = GridModel::build(&grid);
        let config = ParserConfig::default();
        let blocks = Segmenter::new(&config).segment(&model);
        assert_eq!(
            boxes(&blocks),
            vec![(0, 3, 0, 2), (0, 3, 6, 8), (7, 10, 0, 2), (7, 10, 6, 8)]
        );
        for i in 0..blocks.len() {
            for j in (i + 1)..blocks.len() {
                assert!(!blocks[i].overlaps(&blocks[j]));
            }
        }
    }

    #[test]
    fn empty_grid_yields_empty_result() {
        let grid = build(0, 0, Vec::new());
        let model = GridModel::build(&grid);
        let config = ParserConfig::default();
        assert_eq!(Segmenter::new(&config).segment(&model), Vec::new());
    }
}
