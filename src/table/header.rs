use crate::config::ParserConfig;
use crate::grid::cell::CellKind;
use crate::grid::model::GridModel;
use crate::table::Block;
use crate::table::HeaderSpec;
use std::collections::HashMap;

/// Classifies the leading rows of a block as header rows and flattens
/// multi-level headers into one leaf name per column.
pub struct HeaderParser<'a> {
    config: &'a ParserConfig,
}

/// Header-likeness score of one row: text ratio up, numeric ratio down,
/// style distinction from the rows below up. Rows with no occupied cell
/// score zero so blank leading rows never classify as header.
pub(crate) fn row_score(
    model: &GridModel,
    row: usize,
    block_r1: usize,
    c0: usize,
    c1: usize,
    config: &ParserConfig,
) -> f64 {
    let nonempty = model.row_fill(row, c0, c1);
    if nonempty == 0 {
        return 0.0;
    }
    let mut text = 0usize;
    let mut numeric = 0usize;
    for c in c0..=c1 {
        if model.is_occupied(row, c) {
            match model.kind(row, c) {
                CellKind::Text => text += 1,
                CellKind::Number => numeric += 1,
                _ => (),
            }
        }
    }
    let (w_text, w_nonnumeric, w_style) = config.header_weights;
    let text_ratio = text as f64 / nonempty as f64;
    let numeric_ratio = numeric as f64 / nonempty as f64;
    w_text * text_ratio
        + w_nonnumeric * (1.0 - numeric_ratio)
        + w_style * style_intensity(model, row, block_r1, c0, c1)
}

/// Fraction of the row's occupied cells whose style cluster differs from
/// the dominant cluster of the rows below it inside the block.
fn style_intensity(model: &GridModel, row: usize, block_r1: usize, c0: usize, c1: usize) -> f64 {
    if row >= block_r1 {
        return 0.0;
    }
    let Some(dominant) = model.dominant_cluster(row + 1, block_r1, c0, c1) else {
        return 0.0;
    };
    let mut occupied = 0usize;
    let mut distinct = 0usize;
    for c in c0..=c1 {
        if model.is_occupied(row, c) {
            occupied += 1;
            if model.cluster(row, c) != dominant {
                distinct += 1;
            }
        }
    }
    if occupied == 0 {
        0.0
    } else {
        distinct as f64 / occupied as f64
    }
}

impl<'a> HeaderParser<'a> {
    pub fn new(config: &'a ParserConfig) -> Self {
        HeaderParser { config }
    }

    /// Returns the header classification for a block. Header rows are a
    /// contiguous prefix: the first row scoring below the threshold (or
    /// reaching the row cap) terminates the header region. Zero qualifying
    /// rows is not an error; the block gets synthetic positional names and
    /// the ambiguity flag.
    pub fn parse(&self, model: &GridModel, block: &Block) -> HeaderSpec {
        let mut last = None;
        for row in block.r0..=block.r1 {
            if row - block.r0 >= self.config.max_header_rows {
                break;
            }
            let score = row_score(model, row, block.r1, block.c0, block.c1, self.config);
            if score >= self.config.header_threshold {
                last = Some(row);
            } else {
                break;
            }
        }
        match last {
            Some(last) => HeaderSpec {
                rows: Some((block.r0, last)),
                leaf_names: self.leaf_names(model, block, last),
                ambiguous: false,
            },
            None => HeaderSpec {
                rows: None,
                leaf_names: Self::disambiguate(
                    (0..block.width()).map(|offset| format!("column_{}", offset + 1)).collect(),
                ),
                ambiguous: true,
            },
        }
    }

    /// Flattens the header rows into one name per column. Merged header
    /// cells contribute their anchor text to every column they span; blank
    /// levels and texts already on the column's path are skipped.
    fn leaf_names(&self, model: &GridModel, block: &Block, last_header_row: usize) -> Vec<String> {
        let mut names = Vec::with_capacity(block.width());
        for c in block.c0..=block.c1 {
            let mut path = Vec::<&str>::new();
            for r in block.r0..=last_header_row {
                if let Some(text) = model.merged_text(r, c) {
                    if !path.contains(&text) {
                        path.push(text);
                    }
                }
            }
            let name = match path.last() {
                None => format!("column_{}", c - block.c0 + 1),
                Some(leaf) if self.config.keep_leaf_only => (*leaf).to_owned(),
                Some(_) => path.join(&self.config.header_separator),
            };
            names.push(name);
        }
        Self::disambiguate(names)
    }

    /// Appends positional suffixes to the second and later occurrences of a
    /// duplicate name; the leftmost column keeps the unsuffixed name.
    fn disambiguate(names: Vec<String>) -> Vec<String> {
        let mut seen = HashMap::<String, usize>::new();
        names
            .into_iter()
            .map(|name| {
                let count = seen.entry(name.clone()).or_insert(0);
                *count += 1;
                if *count == 1 {
                    name
                } else {
                    format!("{}_{}", name, count)
                }
            })
            .collect()
    }
}
