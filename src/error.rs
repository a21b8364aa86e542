use crate::config::ConfigError;
use crate::grid::GridError;
use thiserror::Error;

/// All errors surfaced by the crate's public entry points.
#[derive(Error, Debug)]
pub enum SheetTablesError {
    /// Invalid configuration value, detected before any sheet work
    #[error("{0}")]
    Config(#[from] ConfigError),

    /// Incoming grid violated its own contract
    #[error("{0}")]
    Grid(#[from] GridError),
}
