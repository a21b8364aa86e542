use serde::Serialize;

/// Cell value kinds relevant to structure recognition.
/// Decided once while the grid is built; downstream components never re-infer them.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CellKind {
    #[default]
    Empty,
    /// Free text values
    Text,
    /// Numeric values (integers, decimals, percentages)
    Number,
    /// Date or time values
    Date,
    /// Anything else (booleans, error literals, rich objects)
    Other,
}

impl CellKind {
    /// Returns the string representation used in log events.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::Text => "text",
            Self::Number => "number",
            Self::Date => "date",
            Self::Other => "other",
        }
    }
}

/// Border flags for the four sides of a cell.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Borders {
    pub top: bool,
    pub right: bool,
    pub bottom: bool,
    pub left: bool,
}

impl Borders {
    /// No borders on any side.
    pub const NONE: Borders = Borders {
        top: false,
        right: false,
        bottom: false,
        left: false,
    };

    /// Borders on all four sides.
    pub const ALL: Borders = Borders {
        top: true,
        right: true,
        bottom: true,
        left: true,
    };
}

/// A single cell in a sheet grid with position, kind, value and visual attributes.
/// Immutable once the grid has been built from the source reader.
#[derive(Clone, Debug, PartialEq)]
pub struct Cell {
    /// Row index (0-based)
    pub row: usize,
    /// Column index (0-based)
    pub col: usize,
    /// Cell value kind
    pub kind: CellKind,
    /// Cell value as string
    pub value: String,
    /// Opaque style signature grouping cells that share font/fill/alignment
    pub style: Option<u32>,
    /// Border flags per side
    pub borders: Borders,
    /// Index into the grid's merged-range table, absent if not merged
    pub merge: Option<usize>,
}

impl Cell {
    /// Creates a plain cell with no style, borders or merge membership.
    pub fn new(row: usize, col: usize, kind: CellKind, value: impl Into<String>) -> Self {
        Cell {
            row,
            col,
            kind,
            value: value.into(),
            style: None,
            borders: Borders::NONE,
            merge: None,
        }
    }

    /// Attaches a style signature.
    pub fn with_style(mut self, style: u32) -> Self {
        self.style = Some(style);
        self
    }

    /// Attaches border flags.
    pub fn with_borders(mut self, borders: Borders) -> Self {
        self.borders = borders;
        self
    }

    /// Marks the cell as a member of a merged range.
    pub fn with_merge(mut self, index: usize) -> Self {
        self.merge = Some(index);
        self
    }

    /// Returns true if the cell holds no usable value.
    pub fn is_blank(&self) -> bool {
        self.kind == CellKind::Empty || self.value.trim().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_detection() {
        assert!(Cell::new(0, 0, CellKind::Empty, "").is_blank());
        assert!(Cell::new(0, 0, CellKind::Text, "   ").is_blank());
        assert!(!Cell::new(0, 0, CellKind::Text, "name").is_blank());
        assert!(!Cell::new(0, 0, CellKind::Number, "42").is_blank());
    }

    #[test]
    fn builder_attributes() {
        let cell = Cell::new(2, 3, CellKind::Text, "title")
            .with_style(7)
            .with_borders(Borders::ALL)
            .with_merge(0);
        assert_eq!(cell.style, Some(7));
        assert_eq!(cell.borders, Borders::ALL);
        assert_eq!(cell.merge, Some(0));
    }
}
