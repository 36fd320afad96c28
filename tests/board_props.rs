use gomoku::{Board, Cell, Stone, BOARD_SIZE, WIN_LENGTH};
use proptest::prelude::*;
use rand::{rngs::SmallRng, Rng, SeedableRng};

/// Play `moves` random legal moves, alternating colors.
fn random_board(seed: u64, moves: usize) -> Board {
    let mut rng = SmallRng::seed_from_u64(seed);
    let mut board = Board::new();
    let mut stone = Stone::Black;
    for _ in 0..moves {
        let x = rng.random_range(0..BOARD_SIZE);
        let y = rng.random_range(0..BOARD_SIZE);
        if board.apply_move(x, y, stone).is_ok() {
            stone = stone.opponent();
        }
    }
    board
}

/// Scan every line through (x, y) cell by cell.
fn brute_force_win(board: &Board, x: usize, y: usize) -> bool {
    let Some(Cell::Stone(stone)) = board.cell(x, y) else {
        return false;
    };
    let owns = |r: isize, c: isize| {
        r >= 0
            && c >= 0
            && board.cell(r as usize, c as usize) == Some(Cell::Stone(stone))
    };
    for (dx, dy) in [(0isize, 1isize), (1, 0), (1, 1), (1, -1)] {
        for start in -(WIN_LENGTH as isize - 1)..=0 {
            let all = (0..WIN_LENGTH as isize).all(|k| {
                owns(x as isize + (start + k) * dx, y as isize + (start + k) * dy)
            });
            if all {
                return true;
            }
        }
    }
    false
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn check_win_matches_brute_force(seed in any::<u64>(), moves in 0usize..160) {
        let board = random_board(seed, moves);
        for x in 0..BOARD_SIZE {
            for y in 0..BOARD_SIZE {
                prop_assert_eq!(board.check_win(x, y), brute_force_win(&board, x, y));
            }
        }
    }

    #[test]
    fn stones_never_change_once_placed(seed in any::<u64>(), moves in 1usize..120) {
        let mut rng = SmallRng::seed_from_u64(seed);
        let mut board = Board::new();
        let mut stone = Stone::Black;
        for _ in 0..moves {
            let before = board.clone();
            let x = rng.random_range(0..BOARD_SIZE);
            let y = rng.random_range(0..BOARD_SIZE);
            let result = board.apply_move(x, y, stone);
            for r in 0..BOARD_SIZE {
                for c in 0..BOARD_SIZE {
                    if let Some(Cell::Stone(s)) = before.cell(r, c) {
                        prop_assert_eq!(board.cell(r, c), Some(Cell::Stone(s)));
                    }
                }
            }
            match result {
                Ok(()) => {
                    prop_assert_eq!(board.stones(), before.stones() + 1);
                    stone = stone.opponent();
                }
                Err(_) => prop_assert_eq!(&board, &before),
            }
        }
    }
}
