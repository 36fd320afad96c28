//! One background task that checks every session for disconnected players.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, MissedTickBehavior};

use crate::registry::Registry;
use crate::session::SessionId;

/// Totals for one pass over the registry.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LivenessSummary {
    pub timed_out: usize,
    pub forfeits: usize,
    pub awaiting_reconnect: usize,
    pub reclaimed: Vec<SessionId>,
}

pub struct LivenessSweeper {
    registry: Arc<Registry>,
    timeout: Duration,
}

impl LivenessSweeper {
    pub fn new(registry: Arc<Registry>, timeout: Duration) -> Self {
        Self { registry, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Sweep each session as of `now`, then drop empty matchmade rooms.
    pub fn sweep_once(&self, now: Instant) -> LivenessSummary {
        let mut summary = LivenessSummary::default();
        for session in self.registry.sessions() {
            let report = session.sweep_liveness(now, self.timeout);
            summary.timed_out += report.timed_out.len();
            summary.forfeits += report.forfeit_winners.len();
            summary.awaiting_reconnect += report.awaiting_reconnect.len();
        }
        summary.reclaimed = self.registry.reclaim_empty();
        summary
    }

    /// Sweep every `period` until `shutdown` flips to true.
    pub fn spawn(self, period: Duration, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let summary = self.sweep_once(Instant::now());
                        if summary.timed_out > 0 || !summary.reclaimed.is_empty() {
                            log::info!(
                                "liveness sweep: {} timed out, {} forfeits, {} rooms reclaimed",
                                summary.timed_out,
                                summary.forfeits,
                                summary.reclaimed.len()
                            );
                        }
                    }
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break;
                        }
                    }
                }
            }
            log::info!("liveness sweeper stopped");
        })
    }
}
