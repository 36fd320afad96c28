//! Core gomoku board engine (no_std compatible)
//!
//! This module contains the pure board logic with zero external dependencies.
//! Sessions, players and networking live in the std-only modules that wrap it.

pub mod board;
pub mod common;
pub mod config;

// Re-export commonly used types
pub use board::Board;
pub use common::{Cell, MoveError, Stone};
pub use config::*;
