//! Text rendering for boards, room listings and help.
//!
//! Pure formatting over data the core exposes; nothing here touches locks.

use std::collections::BTreeMap;
use std::fmt::Write;

use crate::core::{Board, Cell, Stone, BOARD_SIZE};
use crate::session::{PhaseLabel, SessionId, SessionSnapshot};

pub const RESET: &str = "\x1b[0m";
pub const BOLD: &str = "\x1b[1m";
pub const RED: &str = "\x1b[31m";
pub const GREEN: &str = "\x1b[32m";
pub const YELLOW: &str = "\x1b[33m";
pub const BLUE: &str = "\x1b[34m";
pub const CYAN: &str = "\x1b[36m";
pub const WHITE: &str = "\x1b[37m";
const LAST_MOVE_BG: &str = "\x1b[41m";

pub fn paint(text: &str, color: &str) -> String {
    format!("{}{}{}", color, text, RESET)
}

pub fn info(text: &str) -> String {
    paint(text, BLUE)
}

pub fn success(text: &str) -> String {
    paint(text, GREEN)
}

pub fn warn(text: &str) -> String {
    paint(text, YELLOW)
}

pub fn error(text: &str) -> String {
    paint(text, RED)
}

pub fn bold(text: &str) -> String {
    paint(text, BOLD)
}

fn grid_char(row: usize, col: usize) -> &'static str {
    let last = BOARD_SIZE - 1;
    match (row, col) {
        (0, 0) => "┌─",
        (0, c) if c == last => "┐ ",
        (0, _) => "┬─",
        (r, 0) if r == last => "└─",
        (r, c) if r == last && c == last => "┘ ",
        (r, _) if r == last => "┴─",
        (_, 0) => "├─",
        (_, c) if c == last => "┤ ",
        _ => "┼─",
    }
}

/// Render the board with hex coordinates, box-drawing grid and the last move
/// highlighted.
pub fn render_board(board: &Board) -> String {
    let mut out = String::with_capacity(BOARD_SIZE * BOARD_SIZE * 16);
    out.push_str("  ");
    for col in 0..BOARD_SIZE {
        let _ = write!(out, "{:X} ", col);
    }
    out.push('\n');

    let last = board.last_move();
    for (row, cells) in board.rows().enumerate() {
        let _ = write!(out, "{:X} ", row);
        for (col, cell) in cells.iter().enumerate() {
            match cell {
                Cell::Empty => out.push_str(&paint(grid_char(row, col), YELLOW)),
                Cell::Stone(stone) => {
                    let (symbol, color) = match stone {
                        Stone::Black => ("●", CYAN),
                        Stone::White => ("○", WHITE),
                    };
                    if last == Some((row, col)) {
                        let _ = write!(out, "{}{}{}{}", LAST_MOVE_BG, color, symbol, RESET);
                    } else {
                        out.push_str(&paint(symbol, color));
                    }
                    if col == BOARD_SIZE - 1 {
                        out.push(' ');
                    } else {
                        out.push_str(&paint("─", YELLOW));
                    }
                }
            }
        }
        out.push('\n');
    }
    out
}

/// One line per session: id, status and occupancy.
pub fn render_room_list(sessions: &BTreeMap<SessionId, SessionSnapshot>) -> String {
    let mut out = paint("\n==== Rooms ====\n", CYAN);
    for (id, snap) in sessions {
        let (status, color) = match snap.phase {
            PhaseLabel::InProgress => ("playing ", RED),
            PhaseLabel::Finished => ("finished", YELLOW),
            PhaseLabel::Ready => ("full    ", RED),
            PhaseLabel::Waiting => ("waiting ", YELLOW),
            PhaseLabel::Empty => ("free    ", GREEN),
        };
        let _ = write!(
            out,
            "{} {} {} {}",
            paint(&format!("[{:02}]", id), BOLD),
            paint(status, color),
            paint(&format!("({}/2)", snap.player_count()), WHITE),
            snap.name
        );
        if !snap.players.is_empty() {
            let _ = write!(out, " - {}", snap.players.join(", "));
        }
        out.push('\n');
    }
    out.push_str(&paint("===============\n", CYAN));
    out
}

pub fn render_help() -> String {
    let mut out = paint("\n================ Gomoku help ================\n", CYAN);
    let mut section = |title: &str, rows: &[(&str, &str)]| {
        let _ = write!(out, "\n{}\n", bold(&format!("[ {} ]", title)));
        for (cmd, text) in rows {
            let _ = writeln!(out, "  {:<28} - {}", paint(cmd, YELLOW), text);
        }
    };
    section(
        "Rooms",
        &[
            ("ls rooms", "list rooms"),
            ("enter room <id>", "enter a room (e.g. enter room 1)"),
            ("leave", "leave the current room"),
            ("match", "wait for an automatic opponent"),
            ("cancel", "stop waiting for a match"),
        ],
    );
    section(
        "Game",
        &[
            ("start", "start the game"),
            ("put <x> <y>", "place a stone (0-E or 0-14, e.g. put 7 7)"),
            ("again", "play another round"),
            ("board", "show the board"),
        ],
    );
    section(
        "System",
        &[
            ("whoami", "show your name, color and reconnect token"),
            ("help", "show this help"),
            ("quit", "disconnect"),
        ],
    );
    out.push_str(&paint("\n=============================================\n", CYAN));
    out
}
