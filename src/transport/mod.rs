//! Line transports and player message sinks.
//!
//! A [`Transport`] carries text lines between the server and one client. A
//! [`MessageSink`] is the fire-and-forget outbound half a [`PlayerHandle`]
//! holds, so sessions and the matchmaker can reach a player without touching
//! its connection.
//!
//! [`PlayerHandle`]: crate::player::PlayerHandle

use std::fmt;

use tokio::sync::mpsc;

#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    /// Write one message. Multi-line text is written as-is followed by a newline.
    async fn send(&mut self, text: &str) -> anyhow::Result<()>;

    /// Read the next line without its terminator.
    ///
    /// Implementations must be cancel safe: the connection handler races this
    /// against outbound messages in `tokio::select!`.
    async fn recv(&mut self) -> anyhow::Result<String>;
}

/// Outbound message delivery for one player.
pub trait MessageSink: Send + Sync + fmt::Debug {
    /// Queue `text` for delivery. Never blocks.
    fn send(&self, text: &str) -> anyhow::Result<()>;

    /// Whether the underlying transport can still deliver.
    fn is_open(&self) -> bool;
}

/// Sink feeding a connection task through an unbounded channel. It closes
/// when the task drops its receiver.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<String>,
}

impl ChannelSink {
    /// Create a sink and the receiver its connection task drains.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl MessageSink for ChannelSink {
    fn send(&self, text: &str) -> anyhow::Result<()> {
        self.tx
            .send(text.to_string())
            .map_err(|_| anyhow::anyhow!("Connection task has gone away"))
    }

    fn is_open(&self) -> bool {
        !self.tx.is_closed()
    }
}

pub mod in_memory;
pub mod tcp;
