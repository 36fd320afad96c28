//! Server-side player identity, decoupled from any single connection.
//!
//! A [`PlayerHandle`] survives its transport: when a client drops and comes
//! back with its reconnect token, the same handle is rebound to the new sink
//! and keeps its color, room and turn.

use std::fmt;
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use uuid::Uuid;

use crate::core::Stone;
use crate::session::Session;
use crate::transport::MessageSink;

/// Transport-facing state. Written by the connection task, the reconnect
/// path and read by liveness sweeps, so it has its own lock.
struct Link {
    sink: Arc<dyn MessageSink>,
    connected: bool,
    disconnected_at: Option<Instant>,
    last_activity: Instant,
}

/// Game-facing state. Only sessions write it, while holding their own lock.
#[derive(Default)]
struct Seat {
    color: Option<Stone>,
    session: Weak<Session>,
}

pub struct PlayerHandle {
    name: String,
    token: Uuid,
    link: Mutex<Link>,
    seat: Mutex<Seat>,
}

impl PlayerHandle {
    pub fn new(name: impl Into<String>, sink: Arc<dyn MessageSink>) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            token: Uuid::new_v4(),
            link: Mutex::new(Link {
                sink,
                connected: true,
                disconnected_at: None,
                last_activity: Instant::now(),
            }),
            seat: Mutex::new(Seat::default()),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Identity token a client presents to reconnect.
    pub fn token(&self) -> Uuid {
        self.token
    }

    /// Deliver `text` to the player. Failures mark the player disconnected
    /// and are otherwise swallowed: delivery is fire-and-forget.
    pub fn send(&self, text: &str) {
        let mut link = self.link.lock();
        if let Err(e) = link.sink.send(text) {
            log::debug!("delivery to {} failed: {}", self.name, e);
            if link.connected {
                link.connected = false;
                link.disconnected_at = Some(Instant::now());
            }
        }
    }

    /// Liveness check used by the matchmaker and the disconnect sweep.
    pub fn is_connected(&self) -> bool {
        let link = self.link.lock();
        link.connected && link.sink.is_open()
    }

    /// Record inbound activity from the client.
    pub fn touch(&self) {
        self.link.lock().last_activity = Instant::now();
    }

    pub fn last_activity(&self) -> Instant {
        self.link.lock().last_activity
    }

    /// Mark the transport as gone. The first call wins; the disconnect clock
    /// is not restarted by later calls.
    pub fn mark_disconnected(&self) {
        self.mark_disconnected_at(Instant::now());
    }

    pub fn mark_disconnected_at(&self, at: Instant) {
        let mut link = self.link.lock();
        if link.connected || link.disconnected_at.is_none() {
            link.connected = false;
            link.disconnected_at = Some(at);
        }
    }

    /// How long the player has been disconnected as of `now`, or `None` when
    /// the transport is usable. A sink found closed without an explicit
    /// disconnect starts the clock at `now`.
    pub fn disconnected_for(&self, now: Instant) -> Option<Duration> {
        let mut link = self.link.lock();
        if link.connected && link.sink.is_open() {
            return None;
        }
        link.connected = false;
        let since = *link.disconnected_at.get_or_insert(now);
        Some(now.saturating_duration_since(since))
    }

    /// Mark the player disconnected if `sink` is still the bound transport.
    /// Returns `false` when a reconnect has already replaced it.
    pub fn release_sink(&self, sink: &Weak<dyn MessageSink>) -> bool {
        let mut link = self.link.lock();
        if !Weak::ptr_eq(sink, &Arc::downgrade(&link.sink)) {
            return false;
        }
        if link.connected {
            link.connected = false;
            link.disconnected_at = Some(Instant::now());
        }
        true
    }

    /// Swap in a new transport and mark the player live again.
    pub fn rebind(&self, sink: Arc<dyn MessageSink>) {
        let mut link = self.link.lock();
        link.sink = sink;
        link.connected = true;
        link.disconnected_at = None;
        link.last_activity = Instant::now();
    }

    pub fn color(&self) -> Option<Stone> {
        self.seat.lock().color
    }

    pub(crate) fn set_color(&self, color: Option<Stone>) {
        self.seat.lock().color = color;
    }

    /// The session this player currently sits in, if it still exists.
    pub fn current_session(&self) -> Option<Arc<Session>> {
        self.seat.lock().session.upgrade()
    }

    pub fn has_session(&self) -> bool {
        self.current_session().is_some()
    }

    /// Point the back-reference at `session` unless the player already sits
    /// in a live one.
    pub(crate) fn claim_session(&self, session: &Arc<Session>) -> bool {
        let mut seat = self.seat.lock();
        if seat.session.upgrade().is_some() {
            return false;
        }
        seat.session = Arc::downgrade(session);
        true
    }

    pub(crate) fn set_session(&self, session: Option<&Arc<Session>>) {
        let mut seat = self.seat.lock();
        seat.session = session.map(Arc::downgrade).unwrap_or_default();
        if session.is_none() {
            seat.color = None;
        }
    }
}

impl fmt::Debug for PlayerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlayerHandle")
            .field("name", &self.name)
            .field("token", &self.token)
            .field("color", &self.color())
            .field("connected", &self.is_connected())
            .finish()
    }
}

/// Handles compare by identity, never by name: two clients may pick the
/// same name.
pub fn same_player(a: &Arc<PlayerHandle>, b: &Arc<PlayerHandle>) -> bool {
    Arc::ptr_eq(a, b)
}
