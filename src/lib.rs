#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(not(feature = "std"))]
extern crate alloc;
#[cfg(feature = "std")]
extern crate std;

pub mod core;
#[cfg(feature = "std")]
pub mod config;
#[cfg(feature = "std")]
pub mod error;
#[cfg(feature = "std")]
pub mod liveness;
#[cfg(feature = "std")]
pub mod logging;
#[cfg(feature = "std")]
pub mod matchmaker;
#[cfg(feature = "std")]
pub mod player;
#[cfg(feature = "std")]
pub mod protocol;
#[cfg(feature = "std")]
pub mod registry;
#[cfg(feature = "std")]
pub mod render;
#[cfg(feature = "std")]
pub mod server;
#[cfg(feature = "std")]
pub mod session;
#[cfg(feature = "std")]
pub mod transport;

pub use crate::core::*;
#[cfg(feature = "std")]
pub use config::ServerConfig;
#[cfg(feature = "std")]
pub use error::Rejection;
#[cfg(feature = "std")]
pub use liveness::{LivenessSummary, LivenessSweeper};
#[cfg(feature = "std")]
pub use logging::{init_logging, timestamp};
#[cfg(feature = "std")]
pub use matchmaker::Matchmaker;
#[cfg(feature = "std")]
pub use player::PlayerHandle;
#[cfg(feature = "std")]
pub use protocol::{parse_coordinate, Command, Login, ParseError};
#[cfg(feature = "std")]
pub use registry::Registry;
#[cfg(feature = "std")]
pub use server::{Connection, GameServer};
#[cfg(feature = "std")]
pub use session::{
    Departure, MoveOutcome, Outcome, Phase, PhaseLabel, Session, SessionId, SessionSnapshot,
    SweepReport, WinReason,
};
#[cfg(feature = "std")]
pub use transport::in_memory::{InMemoryTransport, RecordingSink};
#[cfg(feature = "std")]
pub use transport::tcp::TcpTransport;
#[cfg(feature = "std")]
pub use transport::{ChannelSink, MessageSink, Transport};
