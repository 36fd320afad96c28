//! Common types for Gomoku: stone colors, cell states and move errors.

/// Color of a stone. Black always moves first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "std", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "std", serde(rename_all = "lowercase"))]
pub enum Stone {
    Black,
    White,
}

impl Stone {
    /// The color that moves after this one.
    pub const fn opponent(self) -> Stone {
        match self {
            Stone::Black => Stone::White,
            Stone::White => Stone::Black,
        }
    }

    /// Lowercase name used in player-facing text.
    pub const fn name(self) -> &'static str {
        match self {
            Stone::Black => "black",
            Stone::White => "white",
        }
    }
}

impl core::fmt::Display for Stone {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

/// State of a single intersection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Cell {
    #[default]
    Empty,
    Stone(Stone),
}

impl Cell {
    pub const fn is_empty(self) -> bool {
        matches!(self, Cell::Empty)
    }

    pub const fn stone(self) -> Option<Stone> {
        match self {
            Cell::Empty => None,
            Cell::Stone(s) => Some(s),
        }
    }
}

/// Reasons the board refuses a move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveError {
    /// Coordinate lies outside the board.
    OutOfBounds,
    /// Intersection already holds a stone.
    Occupied,
}

impl core::fmt::Display for MoveError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            MoveError::OutOfBounds => write!(f, "Coordinate is outside the board"),
            MoveError::Occupied => write!(f, "That intersection is already taken"),
        }
    }
}
