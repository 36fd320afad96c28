use std::sync::Arc;
use std::time::{Duration, Instant};

use gomoku::{
    LivenessSweeper, Outcome, PlayerHandle, RecordingSink, Registry, Rejection, Session, Stone,
    WinReason,
};
use rand::rngs::SmallRng;
use rand::SeedableRng;

const TIMEOUT: Duration = Duration::from_secs(60);

struct Seated {
    session: Arc<Session>,
    black: Arc<PlayerHandle>,
    white: Arc<PlayerHandle>,
    black_sink: Arc<RecordingSink>,
    white_sink: Arc<RecordingSink>,
}

fn seat_and_start(session: Arc<Session>) -> Seated {
    let sink_a = Arc::new(RecordingSink::new());
    let sink_b = Arc::new(RecordingSink::new());
    let a = PlayerHandle::new("alice", sink_a.clone());
    let b = PlayerHandle::new("bob", sink_b.clone());
    session.add_player(&a).unwrap();
    session.add_player(&b).unwrap();
    let (black, white) = session
        .start_game_with(&mut SmallRng::seed_from_u64(11))
        .unwrap();
    let (black_sink, white_sink) = if Arc::ptr_eq(&black, &a) {
        (sink_a, sink_b)
    } else {
        (sink_b, sink_a)
    };
    Seated {
        session,
        black,
        white,
        black_sink,
        white_sink,
    }
}

fn count(sink: &RecordingSink, needle: &str) -> usize {
    sink.messages().iter().filter(|m| m.contains(needle)).count()
}

#[test]
fn test_timeout_forfeits_without_any_move() {
    let g = seat_and_start(Session::new(1, "room"));
    let t0 = Instant::now();
    g.black.mark_disconnected_at(t0);

    let report = g.session.sweep_liveness(t0 + Duration::from_secs(61), TIMEOUT);
    assert_eq!(report.timed_out.len(), 1);
    assert!(Arc::ptr_eq(&report.timed_out[0], &g.black));
    assert!(Arc::ptr_eq(&report.forfeit_winners[0], &g.white));
    assert_eq!(
        g.session.outcome(),
        Some(Outcome::Win {
            winner: Stone::White,
            by: WinReason::Forfeit
        })
    );
    assert!(!g.black.has_session());
    assert!(g
        .white_sink
        .received(&format!("{} did not come back", g.black.name())));
    assert!(g.white_sink.received("You win by forfeit"));
}

#[test]
fn test_both_players_timing_out_is_no_forfeit() {
    let g = seat_and_start(Session::new(1, "room"));
    g.session.play_as(&g.black, 7, 7).unwrap();
    let t0 = Instant::now();
    g.white.mark_disconnected_at(t0);
    g.black.mark_disconnected_at(t0 + Duration::from_secs(10));

    let report = g.session.sweep_liveness(t0 + Duration::from_secs(100), TIMEOUT);
    assert_eq!(report.timed_out.len(), 2);
    assert!(report.forfeit_winners.is_empty());
    assert_eq!(g.session.player_count(), 0);
    for sink in [&g.black_sink, &g.white_sink] {
        assert_eq!(count(sink, "You win by forfeit"), 0);
        assert_eq!(count(sink, "left the room"), 0);
    }
    assert_eq!(g.black.color(), None);
    assert_eq!(g.white.color(), None);
}

#[test]
fn test_one_timeout_while_the_other_waits_still_forfeits() {
    let g = seat_and_start(Session::new(1, "room"));
    let t0 = Instant::now();
    g.white.mark_disconnected_at(t0);
    g.black.mark_disconnected_at(t0 + Duration::from_secs(50));

    let report = g.session.sweep_liveness(t0 + Duration::from_secs(70), TIMEOUT);
    assert!(Arc::ptr_eq(&report.timed_out[0], &g.white));
    assert!(Arc::ptr_eq(&report.forfeit_winners[0], &g.black));
    assert!(Arc::ptr_eq(&report.awaiting_reconnect[0], &g.black));
    assert_eq!(
        g.session.outcome(),
        Some(Outcome::Win {
            winner: Stone::Black,
            by: WinReason::Forfeit
        })
    );
}

#[test]
fn test_grace_period_notice_is_sent_once() {
    let g = seat_and_start(Session::new(1, "room"));
    let t0 = Instant::now();
    g.white.mark_disconnected_at(t0);

    for secs in [5, 10, 30] {
        let report = g.session.sweep_liveness(t0 + Duration::from_secs(secs), TIMEOUT);
        assert!(report.timed_out.is_empty());
        assert_eq!(report.awaiting_reconnect.len(), 1);
    }
    assert_eq!(count(&g.black_sink, "waiting for them to reconnect"), 1);
    assert!(g.session.is_game_started());
}

#[test]
fn test_disconnect_clock_keeps_first_timestamp() {
    let g = seat_and_start(Session::new(1, "room"));
    let t0 = Instant::now();
    g.white.mark_disconnected_at(t0);
    g.white.mark_disconnected_at(t0 + Duration::from_secs(50));
    assert_eq!(
        g.white.disconnected_for(t0 + Duration::from_secs(60)),
        Some(Duration::from_secs(60))
    );
}

#[test]
fn test_closed_sink_is_noticed_by_the_sweep() {
    let g = seat_and_start(Session::new(1, "room"));
    let t0 = Instant::now();
    g.black_sink.close();
    assert!(!g.black.is_connected());

    let first = g.session.sweep_liveness(t0, TIMEOUT);
    assert_eq!(first.awaiting_reconnect.len(), 1);
    let later = g.session.sweep_liveness(t0 + TIMEOUT + Duration::from_secs(1), TIMEOUT);
    assert_eq!(later.timed_out.len(), 1);
    assert!(g.session.is_game_over());
}

#[test]
fn test_reconnect_restores_color_seat_and_turn() {
    let g = seat_and_start(Session::new(1, "room"));
    g.session.play_as(&g.black, 7, 7).unwrap();
    let t0 = Instant::now();
    g.white.mark_disconnected_at(t0);
    g.session.sweep_liveness(t0 + Duration::from_secs(5), TIMEOUT);

    let fresh = Arc::new(RecordingSink::new());
    let back = g.session.reconnect_player(g.white.token(), fresh.clone()).unwrap();
    assert!(Arc::ptr_eq(&back, &g.white));
    assert!(g.white.is_connected());
    assert_eq!(g.white.color(), Some(Stone::White));
    assert_eq!(g.session.current_turn(), Some(Stone::White));
    assert!(g.black_sink.received("reconnected"));

    // the old clock no longer applies
    let report = g.session.sweep_liveness(t0 + Duration::from_secs(600), TIMEOUT);
    assert!(report.timed_out.is_empty());
    assert!(report.awaiting_reconnect.is_empty());

    g.session.play_as(&g.white, 7, 8).unwrap();
    g.white.send("hello");
    assert!(fresh.received("hello"));
    assert!(!g.white_sink.received("hello"));
}

#[test]
fn test_wrong_token_leaves_session_untouched() {
    let g = seat_and_start(Session::new(1, "room"));
    g.white.mark_disconnected_at(Instant::now());
    let before = g.session.phase();

    let err = g
        .session
        .reconnect_player(uuid::Uuid::new_v4(), Arc::new(RecordingSink::new()))
        .unwrap_err();
    assert_eq!(err, Rejection::UnknownToken);
    assert_eq!(g.session.phase(), before);
    assert!(!g.white.is_connected());
    assert_eq!(g.session.player_count(), 2);
}

#[test]
fn test_sweeper_forfeits_and_reclaims_abandoned_rooms() {
    let registry = Arc::new(Registry::with_standing_sessions(1));
    let g = seat_and_start(registry.create_session(Some("alice vs bob".to_string())));
    let id = g.session.id();
    let t0 = Instant::now();
    g.black.mark_disconnected_at(t0);
    g.white.mark_disconnected_at(t0);

    let sweeper = LivenessSweeper::new(registry.clone(), TIMEOUT);
    assert_eq!(sweeper.timeout(), TIMEOUT);
    let early = sweeper.sweep_once(t0 + Duration::from_secs(1));
    assert_eq!(early.awaiting_reconnect, 2);
    assert!(early.reclaimed.is_empty());

    let summary = sweeper.sweep_once(t0 + Duration::from_secs(120));
    assert_eq!(summary.timed_out, 2);
    assert_eq!(summary.forfeits, 0);
    assert_eq!(summary.reclaimed, vec![id]);
    assert!(registry.get_session(id).is_none());
    assert!(registry.get_session(1).is_some());
}
