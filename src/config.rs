#![cfg(feature = "std")]

use std::time::Duration;

/// Default listen address.
pub const DEFAULT_BIND: &str = "0.0.0.0:8888";

/// Rooms created at startup and kept while empty.
pub const DEFAULT_STANDING_ROOMS: usize = 10;

/// How often the matchmaker pairs queued players (1 second).
pub const DEFAULT_MATCH_INTERVAL: Duration = Duration::from_secs(1);

/// How often sessions are checked for disconnected players (5 seconds).
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(5);

/// Disconnected time after which a running game is forfeited (60 seconds).
pub const DEFAULT_DISCONNECT_TIMEOUT: Duration = Duration::from_secs(60);

/// Silence after which a connection is treated as dropped (10 minutes).
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(600);

/// Server tunables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub bind: String,
    pub standing_rooms: usize,
    pub match_interval: Duration,
    pub sweep_interval: Duration,
    pub disconnect_timeout: Duration,
    pub idle_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
            standing_rooms: DEFAULT_STANDING_ROOMS,
            match_interval: DEFAULT_MATCH_INTERVAL,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
            disconnect_timeout: DEFAULT_DISCONNECT_TIMEOUT,
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
        }
    }
}
