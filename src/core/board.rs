//! Game board state: a fixed 15x15 grid with incremental win detection.

use crate::core::common::{Cell, MoveError, Stone};
use crate::core::config::{AXES, BOARD_SIZE, TOTAL_CELLS, WIN_LENGTH};
use core::fmt;

/// Main board state: cell contents plus the last move played.
#[derive(Clone, PartialEq, Eq)]
pub struct Board {
    cells: [[Cell; BOARD_SIZE]; BOARD_SIZE],
    last_move: Option<(usize, usize)>,
    stones: usize,
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

impl Board {
    /// Create an empty board.
    pub fn new() -> Self {
        Board {
            cells: [[Cell::Empty; BOARD_SIZE]; BOARD_SIZE],
            last_move: None,
            stones: 0,
        }
    }

    /// Place `stone` at row `x`, column `y`.
    ///
    /// Rejected moves leave the board untouched.
    pub fn apply_move(&mut self, x: usize, y: usize, stone: Stone) -> Result<(), MoveError> {
        if x >= BOARD_SIZE || y >= BOARD_SIZE {
            return Err(MoveError::OutOfBounds);
        }
        if !self.cells[x][y].is_empty() {
            return Err(MoveError::Occupied);
        }
        self.cells[x][y] = Cell::Stone(stone);
        self.last_move = Some((x, y));
        self.stones += 1;
        Ok(())
    }

    /// Returns `true` when the stone at (x, y) belongs to a run of at least
    /// `WIN_LENGTH` along any axis. Empty and out-of-range cells never win.
    pub fn check_win(&self, x: usize, y: usize) -> bool {
        let Some(stone) = self.cell(x, y).and_then(Cell::stone) else {
            return false;
        };
        AXES.iter().any(|&(dx, dy)| {
            let run = 1 + self.count_run(x, y, dx, dy, stone) + self.count_run(x, y, -dx, -dy, stone);
            run >= WIN_LENGTH
        })
    }

    /// Count same-colored stones walking from (x, y) in one direction,
    /// excluding the starting cell.
    fn count_run(&self, x: usize, y: usize, dx: isize, dy: isize, stone: Stone) -> usize {
        let mut count = 0;
        let (mut cx, mut cy) = (x as isize + dx, y as isize + dy);
        while let Some(Cell::Stone(s)) = self.cell_signed(cx, cy) {
            if s != stone {
                break;
            }
            count += 1;
            cx += dx;
            cy += dy;
        }
        count
    }

    fn cell_signed(&self, x: isize, y: isize) -> Option<Cell> {
        if x < 0 || y < 0 {
            return None;
        }
        self.cell(x as usize, y as usize)
    }

    /// Clear every intersection and the last-move marker.
    pub fn reset(&mut self) {
        self.cells = [[Cell::Empty; BOARD_SIZE]; BOARD_SIZE];
        self.last_move = None;
        self.stones = 0;
    }

    /// Cell at (x, y), or `None` when out of range.
    pub fn cell(&self, x: usize, y: usize) -> Option<Cell> {
        self.cells.get(x).and_then(|row| row.get(y)).copied()
    }

    /// Coordinate of the most recent move.
    pub fn last_move(&self) -> Option<(usize, usize)> {
        self.last_move
    }

    /// Number of stones on the board.
    pub fn stones(&self) -> usize {
        self.stones
    }

    pub fn is_empty(&self) -> bool {
        self.stones == 0
    }

    pub fn is_full(&self) -> bool {
        self.stones == TOTAL_CELLS
    }

    /// Rows of the grid, top to bottom.
    pub fn rows(&self) -> impl Iterator<Item = &[Cell; BOARD_SIZE]> {
        self.cells.iter()
    }
}

impl fmt::Debug for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Board {{ stones: {}, last_move: {:?} }}", self.stones, self.last_move)?;
        for row in self.cells.iter() {
            for cell in row.iter() {
                let c = match cell {
                    Cell::Empty => '.',
                    Cell::Stone(Stone::Black) => 'X',
                    Cell::Stone(Stone::White) => 'O',
                };
                write!(f, "{}", c)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
