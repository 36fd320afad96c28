//! Automatic pairing of waiting players.
//!
//! Players queue in arrival order; a periodic sweep pairs them two at a time
//! into fresh sessions and starts the game straight away.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, MissedTickBehavior};

use crate::error::Rejection;
use crate::player::{same_player, PlayerHandle};
use crate::registry::Registry;
use crate::render;
use crate::session::{Session, SessionId};

pub struct Matchmaker {
    queue: Mutex<VecDeque<Arc<PlayerHandle>>>,
    /// Held for a whole sweep so two sweeps never dequeue concurrently.
    sweep_lock: Mutex<()>,
    registry: Arc<Registry>,
}

impl Matchmaker {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            sweep_lock: Mutex::new(()),
            registry,
        }
    }

    /// Append `player` to the queue and return the new queue length.
    pub fn join_queue(&self, player: &Arc<PlayerHandle>) -> Result<usize, Rejection> {
        if player.has_session() {
            return Err(Rejection::AlreadyInSession);
        }
        let mut queue = self.queue.lock();
        if queue.iter().any(|p| same_player(p, player)) {
            return Err(Rejection::AlreadyQueued);
        }
        queue.push_back(player.clone());
        log::info!("{} joined the match queue ({} waiting)", player.name(), queue.len());
        Ok(queue.len())
    }

    pub fn leave_queue(&self, player: &Arc<PlayerHandle>) -> Result<(), Rejection> {
        let mut queue = self.queue.lock();
        let idx = queue
            .iter()
            .position(|p| same_player(p, player))
            .ok_or(Rejection::NotQueued)?;
        queue.remove(idx);
        log::info!("{} left the match queue", player.name());
        Ok(())
    }

    pub fn is_queued(&self, player: &Arc<PlayerHandle>) -> bool {
        self.queue.lock().iter().any(|p| same_player(p, player))
    }

    pub fn queue_len(&self) -> usize {
        self.queue.lock().len()
    }

    fn pop_pair(&self) -> Option<(Arc<PlayerHandle>, Arc<PlayerHandle>)> {
        let mut queue = self.queue.lock();
        if queue.len() < 2 {
            return None;
        }
        let a = queue.pop_front()?;
        let b = queue.pop_front()?;
        Some((a, b))
    }

    /// Put players back at the head of the queue, keeping their order.
    fn requeue_front(&self, players: &[Arc<PlayerHandle>]) {
        let mut queue = self.queue.lock();
        for p in players.iter().rev() {
            if !queue.iter().any(|q| same_player(q, p)) {
                queue.push_front(p.clone());
            }
        }
    }

    fn is_valid(player: &Arc<PlayerHandle>) -> bool {
        player.is_connected() && !player.has_session()
    }

    /// Requeue the players of a failed match that may still be matched. A
    /// player who took a seat elsewhere in the meantime is dropped.
    fn requeue_valid(&self, players: &[Arc<PlayerHandle>]) {
        let survivors: Vec<_> = players.iter().filter(|p| Self::is_valid(p)).cloned().collect();
        for p in players.iter().filter(|p| !Self::is_valid(p)) {
            log::debug!("dropping {} from the match queue", p.name());
        }
        self.requeue_front(&survivors);
    }

    /// Pair queued players until fewer than two remain. Returns the ids of
    /// the sessions created.
    pub fn sweep(&self) -> Vec<SessionId> {
        let _guard = self.sweep_lock.lock();
        let mut created = Vec::new();
        while let Some((a, b)) = self.pop_pair() {
            match (Self::is_valid(&a), Self::is_valid(&b)) {
                (true, true) => match self.create_match(&a, &b) {
                    Ok(session) => created.push(session.id()),
                    Err(e) => {
                        log::warn!("matching {} with {} failed: {}", a.name(), b.name(), e);
                        self.requeue_valid(&[a, b]);
                        break;
                    }
                },
                (true, false) => {
                    log::debug!("dropping {} from the match queue", b.name());
                    self.requeue_front(&[a]);
                }
                (false, true) => {
                    log::debug!("dropping {} from the match queue", a.name());
                    self.requeue_front(&[b]);
                }
                (false, false) => {
                    log::debug!("dropping {} and {} from the match queue", a.name(), b.name());
                }
            }
        }
        created
    }

    /// Create a session for `a` and `b`, seat both and start the game. The
    /// session is registered only once the game is running, so an empty
    /// sweep can never reclaim it half-built. On failure it is discarded and
    /// whichever player it seated is unseated.
    pub fn create_match(
        &self,
        a: &Arc<PlayerHandle>,
        b: &Arc<PlayerHandle>,
    ) -> Result<Arc<Session>, Rejection> {
        let session = Session::new(
            self.registry.next_session_id(),
            format!("{} vs {}", a.name(), b.name()),
        );

        let started = session
            .add_player(a)
            .and_then(|()| session.add_player(b))
            .and_then(|()| session.start_game());

        let (black, white) = match started {
            Ok(colors) => colors,
            Err(e) => {
                let _ = session.remove_player(a);
                let _ = session.remove_player(b);
                return Err(e);
            }
        };
        self.registry.insert_session(session.clone());

        log::info!(
            "matched {} with {} in room {}",
            a.name(),
            b.name(),
            session.id()
        );
        for (me, other) in [(a, b), (b, a)] {
            me.send(&render::success(&format!(
                "Match found! Opponent: {}, room {} [{}]",
                other.name(),
                session.id(),
                session.name()
            )));
            let color = if Arc::ptr_eq(me, &black) { "black" } else { "white" };
            me.send(&render::success(&format!("The game starts now. You play {}.", color)));
        }
        let board = session.render_board();
        black.send(&board);
        white.send(&board);
        black.send(&render::info("You are black, make the first move!"));
        Ok(session)
    }

    /// Run [`sweep`](Self::sweep) every `period` until `shutdown` flips to true.
    pub fn spawn(self: Arc<Self>, period: Duration, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let created = self.sweep();
                        if !created.is_empty() {
                            log::debug!("match sweep created rooms {:?}", created);
                        }
                    }
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break;
                        }
                    }
                }
            }
            log::info!("matchmaker stopped");
        })
    }
}
