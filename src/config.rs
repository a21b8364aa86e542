use regex::Regex;
use thiserror::Error;

/// Errors raised for invalid configuration values.
/// Raised once, before any sheet processing begins, and aborts the run.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("'{name}' must be at least 1")]
    NonPositive { name: &'static str },

    #[error("'{name}' must be within {min}..={max}, got {value}")]
    OutOfRange { name: &'static str, value: f64, min: f64, max: f64 },

    #[error("'{name}' must be a finite non-negative number, got {value}")]
    NotFinite { name: &'static str, value: f64 },

    #[error("invalid unit line pattern '{pattern}': {source}")]
    InvalidUnitPattern { pattern: String, source: regex::Error },
}

/// Weights of the four block-merge signals.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct MergeWeights {
    /// Reward for coinciding column boundaries
    pub alignment: f64,
    /// Reward for matching dominant column types
    pub type_consistency: f64,
    /// Penalty for occupancy density jumps
    pub density_delta: f64,
    /// Penalty for a border/style discontinuity spanning the gap
    pub structural_break: f64,
}

/// Tunable parameters for the structure-recognition pipeline.
/// All values have defaults; [`ParserConfig::validate`] checks them before
/// any sheet work starts.
#[derive(Clone, Debug)]
pub struct ParserConfig {
    /// Minimum height for an emitted block
    pub min_block_height: usize,
    /// Minimum width for an emitted block
    pub min_block_width: usize,
    /// Max run of empty rows/columns treated as still-connected
    pub hole_tolerance: usize,
    /// Blocks below this occupancy density are noise unless header-like
    pub density_threshold: f64,
    /// Maximum number of rows classified as header
    pub max_header_rows: usize,
    /// Minimum row score for header classification
    pub header_threshold: f64,
    /// Header row score weights: text ratio, non-numeric ratio, style intensity
    pub header_weights: (f64, f64, f64),
    /// Separator joining multi-level header texts into a leaf name
    pub header_separator: String,
    /// Keep only the deepest non-empty header level per column
    pub keep_leaf_only: bool,
    /// MDL region cost weights: sparsity, occupancy entropy, per-block overhead
    pub mdl_weights: (f64, f64, f64),
    /// Fixed cost charged for the cut itself in a split comparison
    pub boundary_cost: f64,
    /// Minimum cost reduction required to accept a split
    pub split_benefit_threshold: f64,
    /// Weights of the block-merge gain function
    pub merge_weights: MergeWeights,
    /// Minimum gain required to merge two blocks; ties do not merge
    pub merge_threshold: f64,
    /// Regex patterns recognizing unit annotation lines near the data top
    pub unit_line_patterns: Vec<String>,
}

impl Default for ParserConfig {
    fn default() -> Self {
        ParserConfig {
            min_block_height: 2,
            min_block_width: 1,
            hole_tolerance: 1,
            density_threshold: 0.3,
            max_header_rows: 3,
            header_threshold: 0.4,
            header_weights: (0.4, 0.3, 0.3),
            header_separator: "/".to_owned(),
            keep_leaf_only: false,
            mdl_weights: (1.0, 0.5, 0.25),
            boundary_cost: 0.05,
            split_benefit_threshold: 0.1,
            merge_weights: MergeWeights {
                alignment: 0.4,
                type_consistency: 0.3,
                density_delta: 0.2,
                structural_break: 0.3,
            },
            merge_threshold: 0.5,
            unit_line_patterns: vec![
                r"^\s*单位[:：]\s*\S".to_owned(),
                r"^\s*[（(]\s*单位.*[)）]\s*$".to_owned(),
                r"(?i)^\s*unit\s*:\s*\S".to_owned(),
            ],
        }
    }
}

impl ParserConfig {
    /// Validates all parameter values. Invalid values are a configuration
    /// fault, not a per-sheet runtime error.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_block_height == 0 {
            return Err(ConfigError::NonPositive { name: "min_block_height" });
        }
        if self.min_block_width == 0 {
            return Err(ConfigError::NonPositive { name: "min_block_width" });
        }
        if self.max_header_rows == 0 {
            return Err(ConfigError::NonPositive { name: "max_header_rows" });
        }
        Self::check_fraction("density_threshold", self.density_threshold)?;
        Self::check_weight("header_threshold", self.header_threshold)?;
        Self::check_weight("header_weights.text", self.header_weights.0)?;
        Self::check_weight("header_weights.nonnumeric", self.header_weights.1)?;
        Self::check_weight("header_weights.style", self.header_weights.2)?;
        Self::check_weight("mdl_weights.sparsity", self.mdl_weights.0)?;
        Self::check_weight("mdl_weights.entropy", self.mdl_weights.1)?;
        Self::check_weight("mdl_weights.overhead", self.mdl_weights.2)?;
        Self::check_weight("boundary_cost", self.boundary_cost)?;
        Self::check_weight("split_benefit_threshold", self.split_benefit_threshold)?;
        Self::check_weight("merge_weights.alignment", self.merge_weights.alignment)?;
        Self::check_weight("merge_weights.type_consistency", self.merge_weights.type_consistency)?;
        Self::check_weight("merge_weights.density_delta", self.merge_weights.density_delta)?;
        Self::check_weight("merge_weights.structural_break", self.merge_weights.structural_break)?;
        Self::check_weight("merge_threshold", self.merge_threshold)?;
        self.compile_unit_patterns()?;
        Ok(())
    }

    /// Compiles the unit line patterns, surfacing the first bad one.
    pub(crate) fn compile_unit_patterns(&self) -> Result<Vec<Regex>, ConfigError> {
        self.unit_line_patterns
            .iter()
            .map(|pattern| {
                Regex::new(pattern).map_err(|source| ConfigError::InvalidUnitPattern {
                    pattern: pattern.to_owned(),
                    source,
                })
            })
            .collect()
    }

    fn check_fraction(name: &'static str, value: f64) -> Result<(), ConfigError> {
        if !value.is_finite() || !(0.0..=1.0).contains(&value) {
            return Err(ConfigError::OutOfRange { name, value, min: 0.0, max: 1.0 });
        }
        Ok(())
    }

    fn check_weight(name: &'static str, value: f64) -> Result<(), ConfigError> {
        if !value.is_finite() || value < 0.0 {
            return Err(ConfigError::NotFinite { name, value });
        }
        Ok(())
    }
}
