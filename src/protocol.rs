#![cfg(feature = "std")]

//! Line commands accepted from clients.

use std::str::FromStr;

use uuid::Uuid;

use crate::core::BOARD_SIZE;
use crate::session::SessionId;

/// Commands a connected player can send, one per line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    ListRooms,
    Enter(SessionId),
    Leave,
    Start,
    Again,
    Put { x: usize, y: usize },
    Match,
    Cancel,
    Board,
    WhoAmI,
    Help,
    Quit,
}

/// First line of a connection: a new name or a reconnect request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Login {
    Name(String),
    Reconnect(Uuid),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("Empty command")]
    Empty,
    #[error("Unknown command `{0}`, type `help` for a list")]
    Unknown(String),
    #[error("Usage: {0}")]
    Usage(&'static str),
    #[error("Invalid coordinate `{0}`: use 0-14, 0-E or 0x0-0xE")]
    Coordinate(String),
    #[error("Invalid room id `{0}`")]
    RoomId(String),
    #[error("Invalid reconnect token `{0}`")]
    Token(String),
    #[error("Names must be 1-24 characters without spaces")]
    Name,
}

/// Longest accepted player name.
pub const MAX_NAME_LEN: usize = 24;

/// Parse a board coordinate: decimal `0-14`, a single hex digit `0-E`, or a
/// `0x`-prefixed hex digit. Case-insensitive.
pub fn parse_coordinate(token: &str) -> Result<usize, ParseError> {
    let bad = || ParseError::Coordinate(token.to_string());
    let t = token.trim();
    let value = if let Some(hex) = t.strip_prefix("0x").or_else(|| t.strip_prefix("0X")) {
        if hex.len() != 1 {
            return Err(bad());
        }
        usize::from_str_radix(hex, 16).map_err(|_| bad())?
    } else if t.len() == 1 {
        usize::from_str_radix(t, 16).map_err(|_| bad())?
    } else if !t.is_empty() && t.bytes().all(|b| b.is_ascii_digit()) {
        t.parse::<usize>().map_err(|_| bad())?
    } else {
        return Err(bad());
    };
    if value >= BOARD_SIZE {
        return Err(bad());
    }
    Ok(value)
}

impl FromStr for Command {
    type Err = ParseError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = line.split_whitespace().collect();
        let Some(head) = parts.first() else {
            return Err(ParseError::Empty);
        };
        let args = &parts[1..];
        match head.to_ascii_lowercase().as_str() {
            "ls" | "rooms" | "list" => match args {
                [] | ["rooms"] => Ok(Command::ListRooms),
                _ => Err(ParseError::Usage("ls rooms")),
            },
            "enter" | "join" => {
                let id = match args {
                    ["room", id] | [id] => *id,
                    _ => return Err(ParseError::Usage("enter room <id>")),
                };
                id.parse()
                    .map(Command::Enter)
                    .map_err(|_| ParseError::RoomId(id.to_string()))
            }
            "leave" => Ok(Command::Leave),
            "start" | "ready" => Ok(Command::Start),
            "again" | "restart" => Ok(Command::Again),
            "put" => match args {
                [x, y] => Ok(Command::Put {
                    x: parse_coordinate(x)?,
                    y: parse_coordinate(y)?,
                }),
                _ => Err(ParseError::Usage("put <x> <y>")),
            },
            "match" => Ok(Command::Match),
            "cancel" => Ok(Command::Cancel),
            "board" => Ok(Command::Board),
            "whoami" => Ok(Command::WhoAmI),
            "help" | "?" => Ok(Command::Help),
            "quit" | "exit" => Ok(Command::Quit),
            other => Err(ParseError::Unknown(other.to_string())),
        }
    }
}

impl FromStr for Login {
    type Err = ParseError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = line.split_whitespace().collect();
        match parts.as_slice() {
            ["reconnect", token] => Uuid::parse_str(token)
                .map(Login::Reconnect)
                .map_err(|_| ParseError::Token(token.to_string())),
            ["reconnect"] => Err(ParseError::Usage("reconnect <token>")),
            [name] if name.chars().count() <= MAX_NAME_LEN => Ok(Login::Name(name.to_string())),
            _ => Err(ParseError::Name),
        }
    }
}
