/// Side length of the square board.
pub const BOARD_SIZE: usize = 15;

/// Number of consecutive stones needed to win.
pub const WIN_LENGTH: usize = 5;

/// Total number of intersections on the board.
pub const TOTAL_CELLS: usize = BOARD_SIZE * BOARD_SIZE;

/// The four axes checked for a winning run. The opposite direction of each
/// axis is obtained by negating the step.
pub const AXES: [(isize, isize); 4] = [(0, 1), (1, 0), (1, 1), (1, -1)];
