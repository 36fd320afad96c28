//! TCP accept loop and per-connection command handling.
//!
//! Each connection runs in its own task. It resolves a [`PlayerHandle`],
//! then turns command lines into session, registry and matchmaker calls.
//! Everything addressed to the player, including direct replies, flows
//! through the player's [`ChannelSink`], so a reconnect can swap the
//! connection without losing message order.

use std::sync::{Arc, Weak};

use tokio::net::TcpListener;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};

use crate::config::ServerConfig;
use crate::core::Stone;
use crate::error::Rejection;
use crate::liveness::LivenessSweeper;
use crate::matchmaker::Matchmaker;
use crate::player::PlayerHandle;
use crate::protocol::{Command, Login};
use crate::registry::Registry;
use crate::render;
use crate::session::{MoveOutcome, Phase, Session};
use crate::transport::tcp::TcpTransport;
use crate::transport::{ChannelSink, MessageSink, Transport};

pub struct GameServer {
    config: ServerConfig,
    registry: Arc<Registry>,
    matchmaker: Arc<Matchmaker>,
    shutdown: watch::Sender<bool>,
}

impl GameServer {
    pub fn new(config: ServerConfig) -> Self {
        let registry = Arc::new(Registry::with_standing_sessions(config.standing_rooms));
        let matchmaker = Arc::new(Matchmaker::new(registry.clone()));
        let (shutdown, _) = watch::channel(false);
        Self {
            config,
            registry,
            matchmaker,
            shutdown,
        }
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn matchmaker(&self) -> &Arc<Matchmaker> {
        &self.matchmaker
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Start the matchmaker and liveness sweeps.
    pub fn spawn_background(&self) -> Vec<JoinHandle<()>> {
        let sweeper = LivenessSweeper::new(self.registry.clone(), self.config.disconnect_timeout);
        vec![
            self.matchmaker
                .clone()
                .spawn(self.config.match_interval, self.shutdown.subscribe()),
            sweeper.spawn(self.config.sweep_interval, self.shutdown.subscribe()),
        ]
    }

    /// Ask background tasks and the accept loop to stop.
    pub fn shutdown(&self) {
        let _ = self.shutdown.send(true);
    }

    /// Handler for one client connection.
    pub fn connection(&self) -> Connection {
        Connection {
            registry: self.registry.clone(),
            matchmaker: self.matchmaker.clone(),
            idle_timeout: self.config.idle_timeout,
        }
    }

    /// Accept clients until shut down.
    pub async fn run(&self, listener: TcpListener) -> anyhow::Result<()> {
        let mut shutdown = self.shutdown.subscribe();
        log::info!("gomoku server listening on {}", listener.local_addr()?);
        loop {
            tokio::select! {
                accepted = listener.accept() => {
                    let (stream, addr) = match accepted {
                        Ok(pair) => pair,
                        Err(e) => {
                            log::warn!("accept failed: {}", e);
                            continue;
                        }
                    };
                    log::info!("client connected from {}", addr);
                    let connection = self.connection();
                    tokio::spawn(async move {
                        if let Err(e) = connection.run(TcpTransport::new(stream)).await {
                            log::debug!("connection {} ended: {}", addr, e);
                        }
                        log::info!("client {} disconnected", addr);
                    });
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        Ok(())
    }

    /// Bind, start background work and serve until shut down.
    pub async fn serve(self) -> anyhow::Result<()> {
        let listener = TcpListener::bind(&self.config.bind).await?;
        let background = self.spawn_background();
        let result = self.run(listener).await;
        self.shutdown();
        for task in background {
            let _ = task.await;
        }
        result
    }
}

/// How a connection's command loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Exit {
    /// Player typed `quit`.
    Quit,
    /// Read or write failed, or the client went quiet too long.
    Dropped,
    /// Another connection reconnected as this player.
    Superseded,
}

enum Flow {
    Continue,
    Quit,
}

/// A logged-in player and the receiving end of its sink.
struct Bound {
    player: Arc<PlayerHandle>,
    outbound: mpsc::UnboundedReceiver<String>,
    sink: Weak<dyn MessageSink>,
}

pub struct Connection {
    registry: Arc<Registry>,
    matchmaker: Arc<Matchmaker>,
    idle_timeout: std::time::Duration,
}

impl Connection {
    pub async fn run<T: Transport>(self, mut transport: T) -> anyhow::Result<()> {
        let Bound {
            player,
            mut outbound,
            sink,
        } = self.login(&mut transport).await?;
        let exit = self.command_loop(&mut transport, &player, &mut outbound).await;
        drop(outbound);
        self.cleanup(&player, &sink, exit);
        Ok(())
    }

    /// Ask for a name or a reconnect token until one is accepted.
    async fn login<T: Transport>(&self, transport: &mut T) -> anyhow::Result<Bound> {
        transport
            .send(&render::info("Enter your name (or `reconnect <token>`):"))
            .await?;
        loop {
            let line = transport.recv().await?;
            let login = match line.parse::<Login>() {
                Ok(login) => login,
                Err(e) => {
                    transport.send(&render::error(&e.to_string())).await?;
                    continue;
                }
            };
            let (channel, outbound) = ChannelSink::new();
            let sink: Arc<dyn MessageSink> = Arc::new(channel);
            let weak = Arc::downgrade(&sink);
            match login {
                Login::Name(name) => {
                    let player = PlayerHandle::new(name, sink);
                    log::info!("player {} logged in", player.name());
                    player.send(&format!(
                        "{} {}",
                        render::success(&format!("Welcome {}!", player.name())),
                        render::info("Type `ls rooms` to list rooms, `match` to find an opponent or `help`.")
                    ));
                    player.send(&render::info(&format!(
                        "Your reconnect token is {}",
                        player.token()
                    )));
                    return Ok(Bound {
                        player,
                        outbound,
                        sink: weak,
                    });
                }
                Login::Reconnect(token) => match self.registry.reconnect(token, sink) {
                    Ok((session, player)) => {
                        player.send(&render::success(&format!(
                            "Welcome back {}, you are in room {}",
                            player.name(),
                            session.id()
                        )));
                        player.send(&session.render_board());
                        player.send(&render::info(&describe_turn(&session, &player)));
                        return Ok(Bound {
                            player,
                            outbound,
                            sink: weak,
                        });
                    }
                    Err(e) => {
                        transport.send(&render::error(&e.to_string())).await?;
                    }
                },
            }
        }
    }

    async fn command_loop<T: Transport>(
        &self,
        transport: &mut T,
        player: &Arc<PlayerHandle>,
        outbound: &mut mpsc::UnboundedReceiver<String>,
    ) -> Exit {
        let mut deadline = Instant::now() + self.idle_timeout;
        loop {
            tokio::select! {
                out = outbound.recv() => {
                    let Some(text) = out else {
                        return Exit::Superseded;
                    };
                    if transport.send(&text).await.is_err() {
                        return Exit::Dropped;
                    }
                }
                line = transport.recv() => {
                    let Ok(line) = line else {
                        return Exit::Dropped;
                    };
                    deadline = Instant::now() + self.idle_timeout;
                    player.touch();
                    if line.trim().is_empty() {
                        continue;
                    }
                    log::debug!("{}: {}", player.name(), line.trim());
                    let flow = match line.parse::<Command>() {
                        Ok(cmd) => self.dispatch(player, cmd).unwrap_or_else(|rejection| {
                            player.send(&render::error(&rejection.to_string()));
                            Flow::Continue
                        }),
                        Err(e) => {
                            player.send(&render::error(&e.to_string()));
                            Flow::Continue
                        }
                    };
                    if let Flow::Quit = flow {
                        while let Ok(text) = outbound.try_recv() {
                            let _ = transport.send(&text).await;
                        }
                        return Exit::Quit;
                    }
                }
                _ = sleep_until(deadline) => {
                    log::info!("{} idle for {:?}, dropping connection", player.name(), self.idle_timeout);
                    let _ = transport
                        .send(&render::warn("Idle for too long, disconnecting"))
                        .await;
                    return Exit::Dropped;
                }
            }
        }
    }

    fn dispatch(&self, player: &Arc<PlayerHandle>, cmd: Command) -> Result<Flow, Rejection> {
        match cmd {
            Command::ListRooms => {
                player.send(&render::render_room_list(&self.registry.list_sessions()));
            }
            Command::Enter(id) => self.enter(player, id)?,
            Command::Leave => self.leave(player)?,
            Command::Start | Command::Again => self.start(player)?,
            Command::Put { x, y } => self.put(player, x, y)?,
            Command::Match => {
                let waiting = self.matchmaker.join_queue(player)?;
                player.send(&render::info(&format!(
                    "Joined the match queue, {} player(s) waiting...",
                    waiting
                )));
            }
            Command::Cancel => {
                self.matchmaker.leave_queue(player)?;
                player.send(&render::info("Left the match queue"));
            }
            Command::Board => {
                let session = current_session(player)?;
                player.send(&session.render_board());
            }
            Command::WhoAmI => player.send(&whoami(player)),
            Command::Help => player.send(&render::render_help()),
            Command::Quit => {
                player.send(&render::info("Goodbye!"));
                return Ok(Flow::Quit);
            }
        }
        Ok(Flow::Continue)
    }

    fn enter(&self, player: &Arc<PlayerHandle>, id: u64) -> Result<(), Rejection> {
        if player.has_session() {
            return Err(Rejection::AlreadyInSession);
        }
        let session = self.registry.require_session(id)?;
        session.add_player(player)?;
        if self.matchmaker.leave_queue(player).is_ok() {
            player.send(&render::info("Left the match queue"));
        }
        player.send(&render::success(&format!("Entered room {}", id)));
        match session.opponent_of(player) {
            Some(other) => {
                other.send(&render::info(&format!("{} entered the room", player.name())));
                session.broadcast(&render::info("Both players are here, type `start` to begin"));
            }
            None => player.send(&render::info("Waiting for an opponent...")),
        }
        Ok(())
    }

    fn leave(&self, player: &Arc<PlayerHandle>) -> Result<(), Rejection> {
        let session = current_session(player)?;
        let departure = session.remove_player(player)?;
        player.send(&render::success(&format!("Left room {}", session.id())));
        if let Some(winner) = departure.forfeit_winner {
            winner.send(&render::success(&format!(
                "{} left the game. You win by forfeit!",
                player.name()
            )));
        } else if let Some(remaining) = departure.remaining {
            remaining.send(&render::info(&format!(
                "{} left the room, waiting for another player...",
                player.name()
            )));
        }
        Ok(())
    }

    fn start(&self, player: &Arc<PlayerHandle>) -> Result<(), Rejection> {
        let session = current_session(player)?;
        let (black, white) = session.start_game()?;
        let board = session.render_board();
        for (p, color) in [(&black, Stone::Black), (&white, Stone::White)] {
            p.send(&render::success(&format!("Game started! You play {}.", color)));
            p.send(&board);
        }
        black.send(&render::info("You are black, make the first move!"));
        Ok(())
    }

    fn put(&self, player: &Arc<PlayerHandle>, x: usize, y: usize) -> Result<(), Rejection> {
        let session = current_session(player)?;
        let outcome = session.play_as(player, x, y)?;
        session.broadcast(&session.render_board());
        match outcome {
            MoveOutcome::Continue { next } => {
                if let Some(p) = session.player_with(next) {
                    p.send(&render::info("Your turn"));
                }
            }
            MoveOutcome::Win { .. } => {
                log::info!("room {}: {} wins", session.id(), player.name());
                session.broadcast(&render::success(&render::bold(&format!(
                    "Game over! {} wins!\nType `leave` to leave the room or `again` to play another round",
                    player.name()
                ))));
            }
            MoveOutcome::Draw => {
                log::info!("room {}: draw", session.id());
                session.broadcast(&render::info(
                    "Game over, the board is full: it's a draw!\nType `again` to play another round",
                ));
            }
        }
        Ok(())
    }

    /// Leave the queue, then either give up the seat or hold it for a
    /// reconnect while a game is running. Nothing is touched once another
    /// connection has taken over the player.
    fn cleanup(&self, player: &Arc<PlayerHandle>, sink: &Weak<dyn MessageSink>, exit: Exit) {
        if exit == Exit::Superseded || !player.release_sink(sink) {
            log::info!("{} continues on a new connection", player.name());
            return;
        }
        let _ = self.matchmaker.leave_queue(player);
        let Some(session) = player.current_session() else {
            return;
        };
        if exit == Exit::Dropped && session.is_game_started() {
            log::info!(
                "{} dropped mid-game in room {}, holding the seat",
                player.name(),
                session.id()
            );
            return;
        }
        if self.leave(player).is_err() {
            log::debug!("{} was no longer seated in room {}", player.name(), session.id());
        }
    }
}

fn current_session(player: &Arc<PlayerHandle>) -> Result<Arc<Session>, Rejection> {
    player.current_session().ok_or(Rejection::NotInSession)
}

fn describe_turn(session: &Session, player: &Arc<PlayerHandle>) -> String {
    match session.phase() {
        Phase::InProgress { turn } if Some(turn) == player.color() => {
            format!("You play {}. It is your turn.", turn)
        }
        Phase::InProgress { turn } => format!(
            "You play {}. Waiting for {} to move.",
            turn.opponent(),
            turn
        ),
        Phase::Finished { .. } => "The game is over, type `again` for another round.".to_string(),
        _ => "The game has not started yet.".to_string(),
    }
}

fn whoami(player: &Arc<PlayerHandle>) -> String {
    let room = player
        .current_session()
        .map(|s| format!("room {} [{}]", s.id(), s.name()))
        .unwrap_or_else(|| "no room".to_string());
    let color = player.color().map(|c| c.name()).unwrap_or("none");
    format!(
        "name: {}\ncolor: {}\nroom: {}\nreconnect token: {}",
        player.name(),
        color,
        room,
        player.token()
    )
}
