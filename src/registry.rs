//! Owns every live session and hands out identifiers.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use uuid::Uuid;

use crate::error::Rejection;
use crate::player::PlayerHandle;
use crate::session::{Session, SessionId, SessionSnapshot};
use crate::transport::MessageSink;

/// Concurrent session table. Lookups and inserts shard across the map, so
/// unrelated rooms never serialize on a single lock.
pub struct Registry {
    sessions: DashMap<SessionId, Arc<Session>>,
    next_id: AtomicU64,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    /// An empty registry; ids start at 1.
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    /// A registry pre-populated with `count` standing rooms.
    pub fn with_standing_sessions(count: usize) -> Self {
        let registry = Self::new();
        for _ in 0..count {
            registry.create_standing_session();
        }
        registry
    }

    /// Reserve the next session id without registering anything under it.
    pub fn next_session_id(&self) -> SessionId {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Create a session that is reclaimed once empty.
    pub fn create_session(&self, name: Option<String>) -> Arc<Session> {
        let id = self.next_session_id();
        let session = Session::new(id, name.unwrap_or_else(|| format!("Room {}", id)));
        self.insert_session(session.clone());
        session
    }

    /// Register a session built elsewhere, typically one whose players were
    /// seated before it became visible to [`reclaim_empty`](Self::reclaim_empty).
    /// Its id must come from [`next_session_id`](Self::next_session_id).
    pub fn insert_session(&self, session: Arc<Session>) {
        log::info!("created room {} ({})", session.id(), session.name());
        self.sessions.insert(session.id(), session);
    }

    /// Create a session that stays registered while empty.
    pub fn create_standing_session(&self) -> Arc<Session> {
        let id = self.next_session_id();
        let session = Session::standing(id, format!("Room {}", id));
        self.sessions.insert(id, session.clone());
        log::debug!("created standing room {}", id);
        session
    }

    pub fn get_session(&self, id: SessionId) -> Option<Arc<Session>> {
        self.sessions.get(&id).map(|entry| entry.value().clone())
    }

    /// Like [`get_session`](Self::get_session), as a rejection for callers
    /// that report back to a player.
    pub fn require_session(&self, id: SessionId) -> Result<Arc<Session>, Rejection> {
        self.get_session(id).ok_or(Rejection::UnknownSession(id))
    }

    /// Snapshot of every session, ordered by id.
    pub fn list_sessions(&self) -> BTreeMap<SessionId, SessionSnapshot> {
        self.sessions()
            .into_iter()
            .map(|s| (s.id(), s.snapshot()))
            .collect()
    }

    /// Current sessions. Cloned out so callers never hold a map shard while
    /// taking a session lock.
    pub fn sessions(&self) -> Vec<Arc<Session>> {
        self.sessions.iter().map(|entry| entry.value().clone()).collect()
    }

    pub fn remove_session(&self, id: SessionId) -> Option<Arc<Session>> {
        let removed = self.sessions.remove(&id).map(|(_, s)| s);
        if removed.is_some() {
            log::info!("removed room {}", id);
        }
        removed
    }

    /// Drop empty sessions that are not standing rooms.
    pub fn reclaim_empty(&self) -> Vec<SessionId> {
        let mut reclaimed = Vec::new();
        for session in self.sessions() {
            if session.is_standing() || session.player_count() > 0 {
                continue;
            }
            let id = session.id();
            // Re-check under the shard lock: a player may have just joined.
            if self
                .sessions
                .remove_if(&id, |_, s| s.player_count() == 0)
                .is_some()
            {
                log::info!("reclaimed empty room {}", id);
                reclaimed.push(id);
            }
        }
        reclaimed
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Seated player owning `token`, in any session.
    pub fn find_by_token(&self, token: Uuid) -> Option<Arc<PlayerHandle>> {
        self.sessions()
            .into_iter()
            .flat_map(|s| s.players())
            .find(|p| p.token() == token)
    }

    /// Rebind the player owning `token` to `sink`, wherever it is seated.
    pub fn reconnect(
        &self,
        token: Uuid,
        sink: Arc<dyn MessageSink>,
    ) -> Result<(Arc<Session>, Arc<PlayerHandle>), Rejection> {
        for session in self.sessions() {
            match session.reconnect_player(token, sink.clone()) {
                Ok(player) => return Ok((session, player)),
                Err(Rejection::UnknownToken) => continue,
                Err(e) => return Err(e),
            }
        }
        Err(Rejection::UnknownToken)
    }
}
