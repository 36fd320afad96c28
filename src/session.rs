//! A two-player room: slots, board, lifecycle phase and turn.
//!
//! Everything mutable sits behind one mutex per session, so unrelated games
//! never contend. Messages produced while the lock is held are collected and
//! delivered after it is released.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use rand::Rng;
use serde::Serialize;
use uuid::Uuid;

use crate::core::{Board, Stone};
use crate::error::Rejection;
use crate::player::{same_player, PlayerHandle};
use crate::render::render_board;
use crate::transport::MessageSink;

pub type SessionId = u64;

/// How a finished game was decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WinReason {
    FiveInARow,
    Forfeit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Win { winner: Stone, by: WinReason },
    Draw,
}

/// Session lifecycle. The turn color only exists while a game is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Empty,
    Waiting,
    Ready,
    InProgress { turn: Stone },
    Finished { outcome: Outcome },
}

/// Data-free phase tag for listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseLabel {
    Empty,
    Waiting,
    Ready,
    InProgress,
    Finished,
}

impl Phase {
    pub fn label(&self) -> PhaseLabel {
        match self {
            Phase::Empty => PhaseLabel::Empty,
            Phase::Waiting => PhaseLabel::Waiting,
            Phase::Ready => PhaseLabel::Ready,
            Phase::InProgress { .. } => PhaseLabel::InProgress,
            Phase::Finished { .. } => PhaseLabel::Finished,
        }
    }

    fn for_occupancy(count: usize) -> Phase {
        match count {
            0 => Phase::Empty,
            1 => Phase::Waiting,
            _ => Phase::Ready,
        }
    }
}

/// Result of a successful move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    /// Game continues; `next` is to move.
    Continue { next: Stone },
    /// The mover completed five in a row.
    Win { winner: Stone },
    /// The board filled up without a winner.
    Draw,
}

/// What happened when a player left.
#[derive(Debug, Default)]
pub struct Departure {
    /// Occupant still seated after the removal.
    pub remaining: Option<Arc<PlayerHandle>>,
    /// Set when leaving forfeited a running game.
    pub forfeit_winner: Option<Arc<PlayerHandle>>,
}

/// What a liveness sweep did to one session.
#[derive(Debug, Default)]
pub struct SweepReport {
    /// Players removed because they stayed disconnected past the timeout.
    pub timed_out: Vec<Arc<PlayerHandle>>,
    /// Winners awarded a forfeit by this sweep.
    pub forfeit_winners: Vec<Arc<PlayerHandle>>,
    /// Disconnected players still within the grace period.
    pub awaiting_reconnect: Vec<Arc<PlayerHandle>>,
}

/// Listing entry for one session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
    pub id: SessionId,
    pub name: String,
    pub phase: PhaseLabel,
    pub players: Vec<String>,
    pub standing: bool,
}

impl SessionSnapshot {
    pub fn player_count(&self) -> usize {
        self.players.len()
    }
}

type Outbox = Vec<(Arc<PlayerHandle>, String)>;

struct State {
    slots: [Option<Arc<PlayerHandle>>; 2],
    board: Board,
    phase: Phase,
    /// Whether the opponent was already told slot `i` is reconnecting.
    reconnect_notice: [bool; 2],
}

impl State {
    fn occupied(&self) -> usize {
        self.slots.iter().flatten().count()
    }

    fn slot_of(&self, player: &Arc<PlayerHandle>) -> Option<usize> {
        self.slots
            .iter()
            .position(|s| s.as_ref().is_some_and(|p| same_player(p, player)))
    }

    fn holder_of(&self, stone: Stone) -> Option<Arc<PlayerHandle>> {
        self.slots
            .iter()
            .flatten()
            .find(|p| p.color() == Some(stone))
            .cloned()
    }

    /// Clear `idx` and settle the phase. A running game is forfeited to
    /// whoever is left. Otherwise the room drops back to waiting and the
    /// remaining player loses the color of the previous game.
    fn vacate(&mut self, idx: usize) -> Departure {
        let Some(leaver) = self.slots[idx].take() else {
            return Departure::default();
        };
        leaver.set_session(None);
        self.reconnect_notice[idx] = false;

        let remaining = self.slots[1 - idx].clone();
        let mut forfeit_winner = None;
        match self.phase {
            Phase::InProgress { .. } => {
                let winner_color = remaining.as_ref().and_then(|p| p.color());
                self.phase = Phase::Finished {
                    outcome: match winner_color {
                        Some(winner) => Outcome::Win {
                            winner,
                            by: WinReason::Forfeit,
                        },
                        None => Outcome::Draw,
                    },
                };
                forfeit_winner = remaining.clone();
            }
            _ => {
                if let Some(p) = &remaining {
                    p.set_color(None);
                }
                self.phase = Phase::for_occupancy(self.occupied());
            }
        }
        Departure {
            remaining,
            forfeit_winner,
        }
    }

    fn apply(&mut self, x: usize, y: usize, stone: Stone) -> Result<(), Rejection> {
        match self.phase {
            Phase::InProgress { turn } if turn == stone => {}
            Phase::InProgress { .. } => return Err(Rejection::NotYourTurn),
            Phase::Finished { .. } => return Err(Rejection::GameOver),
            _ => return Err(Rejection::GameNotStarted),
        }
        self.board.apply_move(x, y, stone)?;
        self.phase = Phase::InProgress {
            turn: stone.opponent(),
        };
        Ok(())
    }

    fn violation(&self) -> Option<&'static str> {
        if let (Some(a), Some(b)) = (&self.slots[0], &self.slots[1]) {
            if same_player(a, b) {
                return Some("one player holds both slots");
            }
        }
        if let Phase::InProgress { .. } = self.phase {
            if self.occupied() != 2 {
                return Some("game running without two players");
            }
            if self.slots.iter().flatten().any(|p| p.color().is_none()) {
                return Some("seated player has no color during a game");
            }
        }
        if let Phase::Empty | Phase::Waiting | Phase::Ready = self.phase {
            if self.slots.iter().flatten().any(|p| p.color().is_some()) {
                return Some("seated player keeps a color outside a game");
            }
        }
        None
    }

    /// Should never fire under correct locking. Debug builds stop here;
    /// release builds log and end the game instead of playing on.
    fn enforce_invariants(&mut self, id: SessionId) {
        let violation = self.violation();
        debug_assert!(
            violation.is_none(),
            "session {} invariant violated: {:?}",
            id,
            violation
        );
        if let Some(what) = violation {
            log::error!("session {} invariant violated: {}, ending game", id, what);
            self.phase = Phase::Finished {
                outcome: Outcome::Draw,
            };
        }
    }
}

pub struct Session {
    id: SessionId,
    name: String,
    standing: bool,
    state: Mutex<State>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("standing", &self.standing)
            .field("phase", &self.phase())
            .finish()
    }
}

impl Session {
    pub fn new(id: SessionId, name: impl Into<String>) -> Arc<Self> {
        Self::build(id, name.into(), false)
    }

    /// A session the registry keeps even while empty.
    pub fn standing(id: SessionId, name: impl Into<String>) -> Arc<Self> {
        Self::build(id, name.into(), true)
    }

    fn build(id: SessionId, name: String, standing: bool) -> Arc<Self> {
        Arc::new(Self {
            id,
            name,
            standing,
            state: Mutex::new(State {
                slots: [None, None],
                board: Board::new(),
                phase: Phase::Empty,
                reconnect_notice: [false; 2],
            }),
        })
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_standing(&self) -> bool {
        self.standing
    }

    /// Seat `player` in the first free slot. Does not start the game.
    pub fn add_player(self: &Arc<Self>, player: &Arc<PlayerHandle>) -> Result<(), Rejection> {
        let mut state = self.state.lock();
        if state.slot_of(player).is_some() {
            return Err(Rejection::AlreadyInSession);
        }
        let Some(free) = state.slots.iter().position(Option::is_none) else {
            return Err(Rejection::SessionFull);
        };
        if !player.claim_session(self) {
            return Err(Rejection::AlreadyInSession);
        }
        state.slots[free] = Some(player.clone());
        state.reconnect_notice[free] = false;
        if !matches!(state.phase, Phase::Finished { .. }) {
            state.phase = Phase::for_occupancy(state.occupied());
        }
        state.enforce_invariants(self.id);
        log::info!("{} joined room {} ({})", player.name(), self.id, self.name);
        Ok(())
    }

    /// Vacate the slot held by `player`. Leaving a running game forfeits it.
    pub fn remove_player(&self, player: &Arc<PlayerHandle>) -> Result<Departure, Rejection> {
        let mut state = self.state.lock();
        let idx = state.slot_of(player).ok_or(Rejection::NotInSession)?;
        let departure = state.vacate(idx);
        state.enforce_invariants(self.id);
        log::info!("{} left room {}", player.name(), self.id);
        if let Some(winner) = &departure.forfeit_winner {
            log::info!("room {}: {} wins by forfeit", self.id, winner.name());
        }
        Ok(departure)
    }

    /// Start (or restart) with a fair coin flip for colors.
    /// Returns `(black, white)`.
    pub fn start_game(&self) -> Result<(Arc<PlayerHandle>, Arc<PlayerHandle>), Rejection> {
        self.start_game_with(&mut rand::rng())
    }

    pub fn start_game_with<R: Rng>(
        &self,
        rng: &mut R,
    ) -> Result<(Arc<PlayerHandle>, Arc<PlayerHandle>), Rejection> {
        let mut state = self.state.lock();
        if let Phase::InProgress { .. } = state.phase {
            return Err(Rejection::AlreadyStarted);
        }
        let (Some(a), Some(b)) = (state.slots[0].clone(), state.slots[1].clone()) else {
            return Err(Rejection::NotEnoughPlayers);
        };
        let (black, white) = if rng.random_bool(0.5) { (a, b) } else { (b, a) };
        black.set_color(Some(Stone::Black));
        white.set_color(Some(Stone::White));
        state.board.reset();
        state.phase = Phase::InProgress { turn: Stone::Black };
        state.enforce_invariants(self.id);
        log::info!(
            "room {} game started ({} black vs {} white)",
            self.id,
            black.name(),
            white.name()
        );
        Ok((black, white))
    }

    /// Place a stone for `stone` if it is that color's turn.
    /// A rejected move does not consume the turn.
    pub fn make_move(&self, x: usize, y: usize, stone: Stone) -> Result<(), Rejection> {
        self.state.lock().apply(x, y, stone)
    }

    pub fn check_win(&self, x: usize, y: usize) -> bool {
        self.state.lock().board.check_win(x, y)
    }

    /// Conclude a running game with `outcome`.
    pub fn finish(&self, outcome: Outcome) -> Result<(), Rejection> {
        let mut state = self.state.lock();
        match state.phase {
            Phase::InProgress { .. } => {
                state.phase = Phase::Finished { outcome };
                Ok(())
            }
            Phase::Finished { .. } => Err(Rejection::GameOver),
            _ => Err(Rejection::GameNotStarted),
        }
    }

    /// Move, win check and game end in one critical section, so nothing can
    /// be played between a winning stone and the end of the game.
    pub fn play(&self, x: usize, y: usize, stone: Stone) -> Result<MoveOutcome, Rejection> {
        let mut state = self.state.lock();
        Self::play_locked(&mut state, x, y, stone)
    }

    /// [`play`](Self::play) on behalf of a seated player, using their color.
    pub fn play_as(
        &self,
        player: &Arc<PlayerHandle>,
        x: usize,
        y: usize,
    ) -> Result<MoveOutcome, Rejection> {
        let mut state = self.state.lock();
        if state.slot_of(player).is_none() {
            return Err(Rejection::NotInSession);
        }
        let Some(stone) = player.color() else {
            return Err(match state.phase {
                Phase::Finished { .. } => Rejection::GameOver,
                _ => Rejection::GameNotStarted,
            });
        };
        let outcome = Self::play_locked(&mut state, x, y, stone)?;
        log::debug!("room {}: {} played ({}, {})", self.id, player.name(), x, y);
        Ok(outcome)
    }

    fn play_locked(
        state: &mut State,
        x: usize,
        y: usize,
        stone: Stone,
    ) -> Result<MoveOutcome, Rejection> {
        state.apply(x, y, stone)?;
        let outcome = if state.board.check_win(x, y) {
            state.phase = Phase::Finished {
                outcome: Outcome::Win {
                    winner: stone,
                    by: WinReason::FiveInARow,
                },
            };
            MoveOutcome::Win { winner: stone }
        } else if state.board.is_full() {
            state.phase = Phase::Finished {
                outcome: Outcome::Draw,
            };
            MoveOutcome::Draw
        } else {
            MoveOutcome::Continue {
                next: stone.opponent(),
            }
        };
        Ok(outcome)
    }

    /// Check every seated player's transport. Players gone longer than
    /// `timeout` are removed (forfeiting a running game); the opponent of a
    /// player still inside the grace period is told once that they may come
    /// back.
    pub fn sweep_liveness(&self, now: Instant, timeout: Duration) -> SweepReport {
        let mut report = SweepReport::default();
        let mut outbox: Outbox = Vec::new();
        {
            let mut state = self.state.lock();
            let gone: [Option<Duration>; 2] = [0, 1].map(|idx| {
                state.slots[idx]
                    .as_ref()
                    .and_then(|p| p.disconnected_for(now))
            });
            let expired = |idx: usize| gone[idx].is_some_and(|d| d >= timeout);
            // Nobody is left to claim a forfeit.
            if expired(0) && expired(1) {
                if let Phase::InProgress { .. } = state.phase {
                    log::info!("room {}: both players timed out, game drawn", self.id);
                    state.phase = Phase::Finished {
                        outcome: Outcome::Draw,
                    };
                }
            }
            for idx in 0..2 {
                let Some(player) = state.slots[idx].clone() else {
                    continue;
                };
                let Some(gone_for) = gone[idx] else {
                    continue;
                };
                if expired(idx) {
                    let departure = state.vacate(idx);
                    log::info!(
                        "room {}: {} timed out after {:?} disconnected",
                        self.id,
                        player.name(),
                        gone_for
                    );
                    if let Some(winner) = departure.forfeit_winner {
                        outbox.push((
                            winner.clone(),
                            format!("{} did not come back. You win by forfeit!", player.name()),
                        ));
                        report.forfeit_winners.push(winner);
                    } else if let Some(remaining) = departure.remaining.filter(|_| !expired(1 - idx)) {
                        outbox.push((remaining, format!("{} left the room", player.name())));
                    }
                    report.timed_out.push(player);
                } else {
                    if !state.reconnect_notice[idx] {
                        if let Some(other) = state.slots[1 - idx].clone() {
                            outbox.push((
                                other,
                                format!(
                                    "{} lost connection, waiting for them to reconnect...",
                                    player.name()
                                ),
                            ));
                        }
                        state.reconnect_notice[idx] = true;
                    }
                    report.awaiting_reconnect.push(player);
                }
            }
            state.enforce_invariants(self.id);
        }
        deliver(outbox);
        report
    }

    /// Rebind the seated player owning `token` to a new transport. Color,
    /// slot and turn are untouched.
    pub fn reconnect_player(
        &self,
        token: Uuid,
        sink: Arc<dyn MessageSink>,
    ) -> Result<Arc<PlayerHandle>, Rejection> {
        let mut outbox: Outbox = Vec::new();
        let player = {
            let mut state = self.state.lock();
            let idx = state
                .slots
                .iter()
                .position(|s| s.as_ref().is_some_and(|p| p.token() == token))
                .ok_or(Rejection::UnknownToken)?;
            let player = state.slots[idx].clone().ok_or(Rejection::UnknownToken)?;
            player.rebind(sink);
            state.reconnect_notice[idx] = false;
            if let Some(other) = state.slots[1 - idx].clone() {
                outbox.push((other, format!("{} reconnected", player.name())));
            }
            player
        };
        log::info!("{} reconnected to room {}", player.name(), self.id);
        deliver(outbox);
        Ok(player)
    }

    /// Send `text` to everyone seated.
    pub fn broadcast(&self, text: &str) {
        for p in self.players() {
            p.send(text);
        }
    }

    pub fn player_count(&self) -> usize {
        self.state.lock().occupied()
    }

    pub fn phase(&self) -> Phase {
        self.state.lock().phase
    }

    pub fn is_game_started(&self) -> bool {
        matches!(self.phase(), Phase::InProgress { .. })
    }

    pub fn is_game_over(&self) -> bool {
        matches!(self.phase(), Phase::Finished { .. })
    }

    pub fn outcome(&self) -> Option<Outcome> {
        match self.phase() {
            Phase::Finished { outcome } => Some(outcome),
            _ => None,
        }
    }

    /// Color to move, while a game is running.
    pub fn current_turn(&self) -> Option<Stone> {
        match self.phase() {
            Phase::InProgress { turn } => Some(turn),
            _ => None,
        }
    }

    /// Seated players in slot order.
    pub fn players(&self) -> Vec<Arc<PlayerHandle>> {
        self.state.lock().slots.iter().flatten().cloned().collect()
    }

    /// Slot A and slot B as they are.
    pub fn slots(&self) -> [Option<Arc<PlayerHandle>>; 2] {
        self.state.lock().slots.clone()
    }

    pub fn contains(&self, player: &Arc<PlayerHandle>) -> bool {
        self.state.lock().slot_of(player).is_some()
    }

    /// The other seated player.
    pub fn opponent_of(&self, player: &Arc<PlayerHandle>) -> Option<Arc<PlayerHandle>> {
        let state = self.state.lock();
        let idx = state.slot_of(player)?;
        state.slots[1 - idx].clone()
    }

    /// Seated player holding `stone`, while colors are assigned.
    pub fn player_with(&self, stone: Stone) -> Option<Arc<PlayerHandle>> {
        self.state.lock().holder_of(stone)
    }

    /// Copy of the board, taken under the lock.
    pub fn board(&self) -> Board {
        self.state.lock().board.clone()
    }

    /// Render the board under the lock so no half-applied move is shown.
    pub fn render_board(&self) -> String {
        render_board(&self.state.lock().board)
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let state = self.state.lock();
        SessionSnapshot {
            id: self.id,
            name: self.name.clone(),
            phase: state.phase.label(),
            players: state.slots.iter().flatten().map(|p| p.name().to_string()).collect(),
            standing: self.standing,
        }
    }
}

fn deliver(outbox: Outbox) {
    for (player, text) in outbox {
        player.send(&text);
    }
}
