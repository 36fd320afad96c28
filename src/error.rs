#![cfg(feature = "std")]

use crate::core::MoveError;
use crate::session::SessionId;

/// Why a session, queue or registry operation was refused.
///
/// These are ordinary outcomes, not faults. The `Display` text is what the
/// requesting player gets to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Rejection {
    #[error("Invalid move: {0}")]
    InvalidMove(MoveError),
    #[error("It is not your turn, wait for your opponent")]
    NotYourTurn,
    #[error("The room is full")]
    SessionFull,
    #[error("You are not in that room")]
    NotInSession,
    #[error("You are already in a room, leave it first")]
    AlreadyInSession,
    #[error("The game has not started yet")]
    GameNotStarted,
    #[error("The game is over, type `again` to play another round")]
    GameOver,
    #[error("The game has already started")]
    AlreadyStarted,
    #[error("Two players are needed to start")]
    NotEnoughPlayers,
    #[error("You are already waiting for a match")]
    AlreadyQueued,
    #[error("You are not waiting for a match")]
    NotQueued,
    #[error("Room {0} does not exist")]
    UnknownSession(SessionId),
    #[error("No game is waiting for that reconnect token")]
    UnknownToken,
}

impl From<MoveError> for Rejection {
    fn from(err: MoveError) -> Self {
        Rejection::InvalidMove(err)
    }
}
