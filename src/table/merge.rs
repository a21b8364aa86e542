use crate::config::ParserConfig;
use crate::grid::model::GridModel;
use crate::table::header::HeaderParser;
use crate::table::Block;
use crate::table::HeaderSpec;
use serde::Serialize;
use std::collections::BTreeSet;

/// Decides whether vertically stacked blocks are fragments of one table
/// and reassembles them. Candidates are evaluated top to bottom; a merged
/// result is re-evaluated against the next fragment below it.
pub struct MergeEngine<'a> {
    config: &'a ParserConfig,
}

/// One table after the merge pass, possibly assembled from several blocks.
pub(crate) struct MergeOutcome {
    pub block: Block,
    pub header: HeaderSpec,
    pub merged_from: usize,
}

/// One evaluated merge candidate, kept for the event log.
#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
pub struct MergeDecision {
    /// Position of the upper table's first fragment in the segmented sequence
    pub upper: usize,
    /// Position of the lower fragment in the segmented sequence
    pub lower: usize,
    pub gain: f64,
    pub merged: bool,
}

struct Fragment {
    block: Block,
    header: HeaderSpec,
    first: usize,
    merged_from: usize,
}

impl<'a> MergeEngine<'a> {
    pub fn new(config: &'a ParserConfig) -> Self {
        MergeEngine { config }
    }

    /// Runs the merge chain over the segmented blocks of one sheet, given
    /// in segmentation order with their headers. Returns the surviving
    /// tables in that order plus every candidate decision taken.
    pub(crate) fn merge_chain(
        &self,
        model: &GridModel,
        parts: Vec<(Block, HeaderSpec)>,
    ) -> (Vec<MergeOutcome>, Vec<MergeDecision>) {
        let mut fragments: Vec<Option<Fragment>> = parts
            .into_iter()
            .enumerate()
            .map(|(index, (block, header))| {
                Some(Fragment { block, header, first: index, merged_from: 1 })
            })
            .collect();

        let mut outcomes = Vec::new();
        let mut decisions = Vec::new();
        for i in 0..fragments.len() {
            let Some(mut acc) = fragments[i].take() else {
                continue;
            };
            loop {
                let mut candidate = None;
                for (j, slot) in fragments.iter().enumerate().skip(i + 1) {
                    if let Some(part) = slot {
                        if self.stackable(&acc.block, &part.block) {
                            candidate = Some((j, part.first, self.gain(model, &acc.block, &part.block)));
                            break;
                        }
                    }
                }
                let Some((j, lower, gain)) = candidate else {
                    break;
                };
                let merged = gain > self.config.merge_threshold;
                decisions.push(MergeDecision { upper: acc.first, lower, gain, merged });
                if !merged {
                    break;
                }
                if let Some(part) = fragments[j].take() {
                    acc = self.fuse(model, acc, part);
                }
            }
            outcomes.push(MergeOutcome {
                block: acc.block,
                header: acc.header,
                merged_from: acc.merged_from,
            });
        }
        (outcomes, decisions)
    }

    /// A candidate pair is vertically stacked with overlapping column spans
    /// and separated by at most `hole_tolerance + 1` rows.
    fn stackable(&self, upper: &Block, lower: &Block) -> bool {
        upper.r1 < lower.r0
            && lower.r0 - upper.r1 - 1 <= self.config.hole_tolerance + 1
            && upper.c0 <= lower.c1
            && lower.c0 <= upper.c1
    }

    /// Weighted merge gain: column alignment and type agreement pull the
    /// pair together, a density jump or a drawn separator pushes it apart.
    fn gain(&self, model: &GridModel, upper: &Block, lower: &Block) -> f64 {
        let weights = &self.config.merge_weights;
        weights.alignment * Self::alignment(model, upper, lower)
            + weights.type_consistency * Self::type_consistency(model, upper, lower)
            - weights.density_delta * (upper.density - lower.density).abs()
            - weights.structural_break * Self::structural_break(model, upper, lower)
    }

    /// Jaccard similarity of the two blocks' column boundary sets. A
    /// boundary is the block's first column, the column after its last,
    /// and every fully empty internal column.
    fn alignment(model: &GridModel, upper: &Block, lower: &Block) -> f64 {
        let a = Self::column_boundaries(model, upper);
        let b = Self::column_boundaries(model, lower);
        let shared = a.intersection(&b).count();
        let total = a.union(&b).count();
        shared as f64 / total.max(1) as f64
    }

    fn column_boundaries(model: &GridModel, block: &Block) -> BTreeSet<usize> {
        let mut boundaries = BTreeSet::from([block.c0, block.c1 + 1]);
        for c in block.c0..=block.c1 {
            if model.col_fill(c, block.r0, block.r1) == 0 {
                boundaries.insert(c);
            }
        }
        boundaries
    }

    /// Share of shared columns whose dominant value kind agrees in both
    /// blocks. Columns empty on either side count against the pair.
    fn type_consistency(model: &GridModel, upper: &Block, lower: &Block) -> f64 {
        let c0 = upper.c0.max(lower.c0);
        let c1 = upper.c1.min(lower.c1);
        let matching = (c0..=c1)
            .filter(|&c| {
                let above = model.dominant_kind(c, upper.r0, upper.r1);
                above.is_some() && above == model.dominant_kind(c, lower.r0, lower.r1)
            })
            .count();
        matching as f64 / (c1 - c0 + 1) as f64
    }

    /// A drawn line under the upper block or a styled band filling the gap
    /// marks an intentional separation.
    fn structural_break(model: &GridModel, upper: &Block, lower: &Block) -> f64 {
        let c0 = upper.c0.min(lower.c0);
        let c1 = upper.c1.max(lower.c1);
        if model.full_border_below(upper.r1, c0, c1) {
            return 1.0;
        }
        if upper.r1 + 1 < lower.r0 {
            if let Some(gap) = model.dominant_cluster(upper.r1 + 1, lower.r0 - 1, c0, c1) {
                let above = model.dominant_cluster(upper.r0, upper.r1, upper.c0, upper.c1);
                let below = model.dominant_cluster(lower.r0, lower.r1, lower.c0, lower.c1);
                if Some(gap) != above && Some(gap) != below {
                    return 1.0;
                }
            }
        }
        0.0
    }

    /// Joins two fragments over their union bounding box. The upper
    /// fragment's header survives; when the union widens the table or the
    /// upper header was ambiguous, the header is re-derived over the
    /// merged block so names stay one per column.
    fn fuse(&self, model: &GridModel, upper: Fragment, lower: Fragment) -> Fragment {
        let mut block = Block::measure(
            model,
            upper.block.r0.min(lower.block.r0),
            upper.block.r1.max(lower.block.r1),
            upper.block.c0.min(lower.block.c0),
            upper.block.c1.max(lower.block.c1),
        );
        block.low_confidence = upper.block.low_confidence || lower.block.low_confidence;
        let header = if !upper.header.ambiguous && upper.header.leaf_names.len() == block.width() {
            upper.header
        } else {
            HeaderParser::new(self.config).parse(model, &block)
        };
        Fragment {
            block,
            header,
            first: upper.first,
            merged_from: upper.merged_from + lower.merged_from,
        }
    }
}
