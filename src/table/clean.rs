use crate::grid::model::GridModel;
use crate::table::Block;
use crate::table::HeaderSpec;
use regex::Regex;

/// Share of columns that must repeat a header text before a data row is
/// treated as a restated header.
const MID_HEADER_SIMILARITY: f64 = 0.7;

/// How far into the data region a unit annotation line may sit.
const UNIT_SCAN_ROWS: usize = 10;

/// How many leading block columns a unit annotation line may occupy.
const UNIT_SCAN_COLS: usize = 5;

/// Finds data rows that restate the header, as long tables often repeat it
/// at page boundaries. A row qualifies when at least 70% of the block's
/// columns hold a text equal to that column's header text.
pub(crate) fn repeated_header_rows(
    model: &GridModel,
    block: &Block,
    header: &HeaderSpec,
) -> Vec<usize> {
    let Some((h0, h1)) = header.rows else {
        return Vec::new();
    };
    let mut dropped = Vec::new();
    for r in (h1 + 1)..=block.r1 {
        if model.row_fill(r, block.c0, block.c1) == 0 {
            continue;
        }
        let matching = (block.c0..=block.c1)
            .filter(|&c| match model.merged_text(r, c) {
                Some(text) => (h0..=h1).any(|hr| model.merged_text(hr, c) == Some(text)),
                None => false,
            })
            .count();
        if matching as f64 / block.width() as f64 >= MID_HEADER_SIMILARITY {
            dropped.push(r);
        }
    }
    dropped
}

/// Scans the top of the data region for a unit annotation line such as
/// "单位：万元" or "Unit: USD" and returns its trimmed text.
pub(crate) fn extract_unit_line(
    model: &GridModel,
    block: &Block,
    data_start: usize,
    patterns: &[Regex],
) -> Option<String> {
    if data_start > block.r1 {
        return None;
    }
    let r1 = block.r1.min(data_start + UNIT_SCAN_ROWS - 1);
    let c1 = block.c1.min(block.c0 + UNIT_SCAN_COLS - 1);
    for r in data_start..=r1 {
        for c in block.c0..=c1 {
            if let Some(text) = model.merged_text(r, c) {
                if patterns.iter().any(|pattern| pattern.is_match(text)) {
                    return Some(text.to_owned());
                }
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ParserConfig;
    use crate::grid::cell::Cell;
    use crate::grid::cell::CellKind;
    use crate::grid::Grid;
    use pretty_assertions::assert_eq;

    fn text(row: usize, col: usize, value: &str) -> Cell {
        Cell::new(row, col, CellKind::Text, value)
    }

    fn number(row: usize, col: usize) -> Cell {
        Cell::new(row, col, CellKind::Number, "7")
    }

    fn header_spec() -> HeaderSpec {
        HeaderSpec {
            rows: Some((0, 0)),
            leaf_names: vec!["name".to_owned(), "count".to_owned(), "share".to_owned()],
            ambiguous: false,
        }
    }

    #[test]
    fn restated_header_rows_are_found() {
        let mut cells = vec![text(0, 0, "name"), text(0, 1, "count"), text(0, 2, "share")];
        for r in 1..4 {
            cells.push(text(r, 0, "x"));
            cells.push(number(r, 1));
            cells.push(number(r, 2));
        }
        cells.push(text(4, 0, "name"));
        cells.push(text(4, 1, "count"));
        cells.push(text(4, 2, "share"));
        cells.push(text(5, 0, "y"));
        cells.push(number(5, 1));
        cells.push(number(5, 2));
        let grid = Grid::new("s", 6, 3, cells, Vec::new());
        let model = GridModel::build(&grid);
        let block = Block::measure(&model, 0, 5, 0, 2);
        assert_eq!(repeated_header_rows(&model, &block, &header_spec()), vec![4]);
    }

    #[test]
    fn partial_repetition_below_the_bar_is_kept() {
        // 2 of 3 columns repeat the header text; that is below 70%.
        let mut cells = vec![text(0, 0, "name"), text(0, 1, "count"), text(0, 2, "share")];
        cells.push(text(1, 0, "name"));
        cells.push(text(1, 1, "count"));
        cells.push(number(1, 2));
        cells.push(text(2, 0, "z"));
        cells.push(number(2, 1));
        cells.push(number(2, 2));
        let grid = Grid::new("s", 3, 3, cells, Vec::new());
        let model = GridModel::build(&grid);
        let block = Block::measure(&model, 0, 2, 0, 2);
        assert_eq!(repeated_header_rows(&model, &block, &header_spec()), Vec::<usize>::new());
    }

    #[test]
    fn ambiguous_header_drops_nothing() {
        let grid = Grid::new("s", 2, 2, vec![number(0, 0), number(1, 1)], Vec::new());
        let model = GridModel::build(&grid);
        let block = Block::measure(&model, 0, 1, 0, 1);
        let header = HeaderSpec {
            rows: None,
            leaf_names: vec!["column_1".to_owned(), "column_2".to_owned()],
            ambiguous: true,
        };
        assert_eq!(repeated_header_rows(&model, &block, &header), Vec::<usize>::new());
    }

    #[test]
    fn unit_line_is_extracted_from_the_data_top() {
        let cells = vec![
            text(0, 0, "name"),
            text(0, 1, "amount"),
            text(1, 0, "单位：万元"),
            text(2, 0, "x"),
            number(2, 1),
        ];
        let grid = Grid::new("s", 3, 2, cells, Vec::new());
        let model = GridModel::build(&grid);
        let block = Block::measure(&model, 0, 2, 0, 1);
        let patterns = ParserConfig::default().compile_unit_patterns().unwrap();
        assert_eq!(
            extract_unit_line(&model, &block, 1, &patterns),
            Some("单位：万元".to_owned())
        );
    }

    #[test]
    fn english_unit_annotation_matches_case_insensitively() {
        let cells = vec![
            text(0, 0, "name"),
            text(1, 0, "UNIT: USD"),
            text(2, 0, "x"),
        ];
        let grid = Grid::new("s", 3, 1, cells, Vec::new());
        let model = GridModel::build(&grid);
        let block = Block::measure(&model, 0, 2, 0, 0);
        let patterns = ParserConfig::default().compile_unit_patterns().unwrap();
        assert_eq!(
            extract_unit_line(&model, &block, 1, &patterns),
            Some("UNIT: USD".to_owned())
        );
    }

    #[test]
    fn absent_unit_line_yields_none() {
        let cells = vec![text(0, 0, "name"), text(1, 0, "x"), text(2, 0, "y")];
        let grid = Grid::new("s", 3, 1, cells, Vec::new());
        let model = GridModel::build(&grid);
        let block = Block::measure(&model, 0, 2, 0, 0);
        let patterns = ParserConfig::default().compile_unit_patterns().unwrap();
        assert_eq!(extract_unit_line(&model, &block, 1, &patterns), None);
    }
}
