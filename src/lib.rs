//! # Sheet Tables
//!
//! Structure recognition for spreadsheet grids: finds the table regions on
//! a sheet, detects and flattens multi-level headers, reassembles tables
//! split by blank bands, and ranks the results.
//!
//! The crate does not read workbook files. Callers build a [`Grid`] from
//! whatever cell source they have and hand it to an [`Engine`]:
//!
//! ```
//! use sheet_tables::{Cell, CellKind, Engine, Grid, NullSink, ParserConfig};
//!
//! let grid = Grid::new(
//!     "Sheet1",
//!     3,
//!     2,
//!     vec![
//!         Cell::new(0, 0, CellKind::Text, "name"),
//!         Cell::new(0, 1, CellKind::Text, "count"),
//!         Cell::new(1, 0, CellKind::Text, "apples"),
//!         Cell::new(1, 1, CellKind::Number, "12"),
//!         Cell::new(2, 0, CellKind::Text, "pears"),
//!         Cell::new(2, 1, CellKind::Number, "7"),
//!     ],
//!     Vec::new(),
//! );
//! let sink = NullSink;
//! let engine = Engine::new(ParserConfig::default(), &sink)?;
//! let result = engine.parse_grid(&grid)?;
//! assert_eq!(result.tables.len(), 1);
//! assert_eq!(result.tables[0].header.leaf_names, vec!["name", "count"]);
//! # Ok::<(), sheet_tables::SheetTablesError>(())
//! ```
pub mod config;
pub mod error;
pub mod grid;
pub mod logging;
pub mod pipeline;
pub mod table;

pub use crate::config::MergeWeights;
pub use crate::config::ParserConfig;
pub use crate::error::SheetTablesError;
pub use crate::grid::cell::Borders;
pub use crate::grid::cell::Cell;
pub use crate::grid::cell::CellKind;
pub use crate::grid::Grid;
pub use crate::grid::GridError;
pub use crate::grid::MergedRange;
pub use crate::logging::EventSink;
pub use crate::logging::JsonLinesSink;
pub use crate::logging::LogEvent;
pub use crate::logging::LogLevel;
pub use crate::logging::MemorySink;
pub use crate::logging::NullSink;
pub use crate::pipeline::Engine;
pub use crate::pipeline::RunReport;
pub use crate::pipeline::SheetFailure;
pub use crate::pipeline::SheetFilter;
pub use crate::pipeline::SheetTables;
pub use crate::table::Block;
pub use crate::table::HeaderSpec;
pub use crate::table::TableFlag;
pub use crate::table::TableMeta;
pub use crate::table::TableScore;
