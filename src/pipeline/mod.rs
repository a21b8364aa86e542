//! # Pipeline Module
//!
//! The per-sheet orchestrator: segmentation, header detection, the merge
//! chain, cleaning and scoring wired together, plus the parallel multi-sheet
//! runner with per-sheet fault isolation.
use crate::config::ParserConfig;
use crate::error::SheetTablesError;
use crate::grid::model::GridModel;
use crate::grid::Grid;
use crate::grid::GridError;
use crate::logging::EventSink;
use crate::logging::LogEvent;
use crate::logging::LogLevel;
use crate::table::clean;
use crate::table::header::HeaderParser;
use crate::table::merge::MergeEngine;
use crate::table::segment::Segmenter;
use crate::table::Block;
use crate::table::HeaderSpec;
use crate::table::TableFlag;
use crate::table::TableMeta;
use crate::table::TableScore;
use glob::Pattern;
use glob::PatternError;
use rayon::prelude::*;
use regex::Regex;
use serde::Serialize;
use thiserror::Error;

/// Selects which sheets of a workbook the runner processes.
#[derive(Clone, Debug, Default)]
pub struct SheetFilter {
    patterns: Option<Vec<Pattern>>,
    limit: Option<usize>,
}

impl SheetFilter {
    /// Accepts every sheet.
    pub fn all() -> Self {
        Self::default()
    }

    /// Accepts sheets whose name matches any of the glob patterns.
    pub fn matching<S: AsRef<str>>(patterns: &[S]) -> Result<Self, PatternError> {
        let patterns = patterns
            .iter()
            .map(|pattern| Pattern::new(pattern.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(SheetFilter {
            patterns: Some(patterns),
            limit: None,
        })
    }

    /// Caps the number of accepted sheets, in workbook order.
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Returns true if a sheet name passes the filter.
    pub fn accept(&self, name: &str) -> bool {
        match &self.patterns {
            Some(patterns) => patterns.iter().any(|pattern| pattern.matches(name)),
            None => true,
        }
    }
}

/// All tables recognized on one sheet, in block-segmentation order.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SheetTables {
    pub sheet: String,
    pub tables: Vec<TableMeta>,
}

/// A sheet that could not be processed. Never aborts sibling sheets.
#[derive(Error, Debug)]
#[error("sheet '{sheet}': {source}")]
pub struct SheetFailure {
    pub sheet: String,
    pub source: GridError,
}

/// Outcome of a multi-sheet run, one entry per accepted sheet in workbook
/// order regardless of worker scheduling.
#[derive(Debug)]
pub struct RunReport {
    pub sheets: Vec<Result<SheetTables, SheetFailure>>,
}

impl RunReport {
    /// Iterates all recognized tables across the successful sheets.
    pub fn tables(&self) -> impl Iterator<Item = &TableMeta> {
        self.sheets
            .iter()
            .filter_map(|sheet| sheet.as_ref().ok())
            .flat_map(|sheet| sheet.tables.iter())
    }

    /// Sheets that failed validation.
    pub fn failures(&self) -> impl Iterator<Item = &SheetFailure> {
        self.sheets.iter().filter_map(|sheet| sheet.as_ref().err())
    }
}

/// The structure-recognition engine. Holds the validated configuration and
/// the event sink; one instance serves any number of sheets, concurrently.
pub struct Engine<'a> {
    config: ParserConfig,
    sink: &'a dyn EventSink,
    unit_patterns: Vec<Regex>,
}

impl<'a> Engine<'a> {
    /// Creates an engine after validating the configuration.
    pub fn new(config: ParserConfig, sink: &'a dyn EventSink) -> Result<Self, SheetTablesError> {
        config.validate()?;
        let unit_patterns = config.compile_unit_patterns()?;
        Ok(Engine {
            config,
            sink,
            unit_patterns,
        })
    }

    /// Recognizes the tables of a single grid.
    pub fn parse_grid(&self, grid: &Grid) -> Result<SheetTables, SheetTablesError> {
        Ok(self.parse_sheet(grid)?)
    }

    /// Runs the accepted sheets of a workbook in parallel. Output order
    /// follows workbook order; a failed sheet occupies its slot as an error.
    pub fn parse_grids(&self, grids: &[Grid], filter: &SheetFilter) -> RunReport {
        let accepted: Vec<&Grid> = grids
            .iter()
            .filter(|grid| filter.accept(grid.name()))
            .take(filter.limit.unwrap_or(usize::MAX))
            .collect();
        let sheets = accepted
            .par_iter()
            .map(|grid| {
                self.parse_sheet(grid).map_err(|source| SheetFailure {
                    sheet: grid.name().to_owned(),
                    source,
                })
            })
            .collect();
        RunReport { sheets }
    }

    fn parse_sheet(&self, grid: &Grid) -> Result<SheetTables, GridError> {
        if let Err(err) = grid.validate() {
            self.sink.emit(
                LogEvent::new("sheet.error")
                    .level(LogLevel::Error)
                    .sheet(grid.name())
                    .message(&err.to_string()),
            );
            return Err(err);
        }
        let model = GridModel::build(grid);
        let blocks = Segmenter::new(&self.config).segment(&model);
        if blocks.is_empty() {
            self.sink.emit(LogEvent::new("sheet.empty").sheet(grid.name()));
            return Ok(SheetTables {
                sheet: grid.name().to_owned(),
                tables: Vec::new(),
            });
        }
        self.sink.emit(
            LogEvent::new("split.blocks")
                .sheet(grid.name())
                .metric("count", blocks.len()),
        );

        let header_parser = HeaderParser::new(&self.config);
        let parts: Vec<(Block, HeaderSpec)> = blocks
            .iter()
            .enumerate()
            .map(|(index, block)| {
                let header = header_parser.parse(&model, block);
                self.sink.emit(
                    LogEvent::new("header.detect")
                        .sheet(grid.name())
                        .block(&format!("b{}", index + 1))
                        .metric("header_rows", header.header_row_count())
                        .metric("leaf_cols", header.leaf_names.len()),
                );
                (*block, header)
            })
            .collect();

        let (outcomes, decisions) = MergeEngine::new(&self.config).merge_chain(&model, parts);
        for decision in &decisions {
            self.sink.emit(
                LogEvent::new("merge.decision")
                    .sheet(grid.name())
                    .metric("blocks", format!("b{}+b{}", decision.upper + 1, decision.lower + 1))
                    .metric("gain", decision.gain)
                    .metric("merged", decision.merged),
            );
        }

        let mut tables = Vec::new();
        for outcome in outcomes {
            let block = outcome.block;
            let header = outcome.header;
            let data_start = header.rows.map(|(_, last)| last + 1).unwrap_or(block.r0);
            let dropped_rows = clean::repeated_header_rows(&model, &block, &header);
            if !dropped_rows.is_empty() {
                self.sink.emit(
                    LogEvent::new("clean.mid_headers")
                        .level(LogLevel::Warn)
                        .sheet(grid.name())
                        .metric("count", dropped_rows.len()),
                );
            }
            let units = clean::extract_unit_line(&model, &block, data_start, &self.unit_patterns);

            let mut flags = Vec::new();
            if block.low_confidence {
                flags.push(TableFlag::LowDensity);
            }
            if header.ambiguous {
                flags.push(TableFlag::HeaderAmbiguous);
            }
            if !dropped_rows.is_empty() {
                flags.push(TableFlag::MidHeadersRemoved);
            }
            if outcome.merged_from > 1 {
                flags.push(TableFlag::MergedFragments);
            }

            let score = TableScore::measure(&model, &block, &header);
            tables.push(TableMeta {
                sheet: grid.name().to_owned(),
                data_rows: (data_start <= block.r1).then_some((data_start, block.r1)),
                dropped_rows,
                units,
                score,
                is_main: false,
                merged_from: outcome.merged_from,
                flags,
                block,
                header,
            });
        }

        // Highest total wins; earlier tables win ties.
        if !tables.is_empty() {
            let mut best = 0;
            for index in 1..tables.len() {
                if tables[index].score.total > tables[best].score.total {
                    best = index;
                }
            }
            tables[best].is_main = true;
        }
        Ok(SheetTables {
            sheet: grid.name().to_owned(),
            tables,
        })
    }
}
