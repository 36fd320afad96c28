use std::sync::{Arc, Barrier};

use gomoku::{
    MoveError, MoveOutcome, Outcome, Phase, PlayerHandle, RecordingSink, Rejection, Session,
    Stone, WinReason, BOARD_SIZE,
};
use rand::rngs::SmallRng;
use rand::SeedableRng;

fn player(name: &str) -> (Arc<PlayerHandle>, Arc<RecordingSink>) {
    let sink = Arc::new(RecordingSink::new());
    (PlayerHandle::new(name, sink.clone()), sink)
}

/// Two seated players and a started game. Returns (session, black, white).
fn started(seed: u64) -> (Arc<Session>, Arc<PlayerHandle>, Arc<PlayerHandle>) {
    let session = Session::new(1, "test");
    let (a, _) = player("alice");
    let (b, _) = player("bob");
    session.add_player(&a).unwrap();
    session.add_player(&b).unwrap();
    let (black, white) = session
        .start_game_with(&mut SmallRng::seed_from_u64(seed))
        .unwrap();
    (session, black, white)
}

#[test]
fn test_join_fill_and_leave() {
    let session = Session::new(1, "room");
    let (a, _) = player("a");
    let (b, _) = player("b");
    let (c, _) = player("c");
    assert_eq!(session.phase(), Phase::Empty);

    session.add_player(&a).unwrap();
    assert_eq!(session.phase(), Phase::Waiting);
    assert_eq!(session.add_player(&a).unwrap_err(), Rejection::AlreadyInSession);

    session.add_player(&b).unwrap();
    assert_eq!(session.phase(), Phase::Ready);
    assert_eq!(session.player_count(), 2);
    assert_eq!(session.add_player(&c).unwrap_err(), Rejection::SessionFull);
    assert!(!c.has_session());

    let departure = session.remove_player(&a).unwrap();
    assert!(departure.forfeit_winner.is_none());
    assert!(Arc::ptr_eq(departure.remaining.as_ref().unwrap(), &b));
    assert_eq!(session.phase(), Phase::Waiting);
    assert!(!a.has_session());
    assert_eq!(session.remove_player(&a).unwrap_err(), Rejection::NotInSession);
}

#[test]
fn test_player_cannot_sit_in_two_sessions() {
    let first = Session::new(1, "one");
    let second = Session::new(2, "two");
    let (a, _) = player("a");
    first.add_player(&a).unwrap();
    assert_eq!(second.add_player(&a).unwrap_err(), Rejection::AlreadyInSession);
    assert_eq!(second.player_count(), 0);
    assert_eq!(a.current_session().unwrap().id(), 1);
}

#[test]
fn test_start_needs_two_players() {
    let session = Session::new(1, "room");
    assert_eq!(session.start_game().unwrap_err(), Rejection::NotEnoughPlayers);
    let (a, _) = player("a");
    session.add_player(&a).unwrap();
    assert_eq!(session.start_game().unwrap_err(), Rejection::NotEnoughPlayers);
    assert_eq!(session.phase(), Phase::Waiting);
}

#[test]
fn test_start_assigns_distinct_colors_and_black_moves_first() {
    for seed in 0..8 {
        let (session, black, white) = started(seed);
        assert_eq!(black.color(), Some(Stone::Black));
        assert_eq!(white.color(), Some(Stone::White));
        assert!(!Arc::ptr_eq(&black, &white));
        assert_eq!(session.current_turn(), Some(Stone::Black));
        assert!(session.is_game_started());
        assert_eq!(session.start_game().unwrap_err(), Rejection::AlreadyStarted);
    }
}

#[test]
fn test_turns_alternate_and_rejections_keep_the_turn() {
    let (session, _, _) = started(1);
    assert_eq!(
        session.make_move(7, 7, Stone::White).unwrap_err(),
        Rejection::NotYourTurn
    );
    session.make_move(7, 7, Stone::Black).unwrap();
    assert_eq!(session.current_turn(), Some(Stone::White));

    assert_eq!(
        session.make_move(7, 7, Stone::White).unwrap_err(),
        Rejection::InvalidMove(MoveError::Occupied)
    );
    assert_eq!(
        session.make_move(BOARD_SIZE, 0, Stone::White).unwrap_err(),
        Rejection::InvalidMove(MoveError::OutOfBounds)
    );
    assert_eq!(session.current_turn(), Some(Stone::White));

    session.make_move(7, 8, Stone::White).unwrap();
    assert_eq!(session.current_turn(), Some(Stone::Black));
    assert_eq!(session.board().stones(), 2);
}

#[test]
fn test_move_before_start_is_rejected() {
    let session = Session::new(1, "room");
    let (a, _) = player("a");
    session.add_player(&a).unwrap();
    assert_eq!(
        session.make_move(0, 0, Stone::Black).unwrap_err(),
        Rejection::GameNotStarted
    );
    assert_eq!(session.play_as(&a, 0, 0).unwrap_err(), Rejection::GameNotStarted);

    let (stranger, _) = player("stranger");
    assert_eq!(
        session.play_as(&stranger, 0, 0).unwrap_err(),
        Rejection::NotInSession
    );
}

#[test]
fn test_play_as_finishes_on_five_in_a_row() {
    let (session, black, white) = started(3);
    for y in 0..4 {
        assert_eq!(
            session.play_as(&black, 0, y).unwrap(),
            MoveOutcome::Continue { next: Stone::White }
        );
        session.play_as(&white, 1, y).unwrap();
    }
    assert_eq!(
        session.play_as(&black, 0, 4).unwrap(),
        MoveOutcome::Win { winner: Stone::Black }
    );
    assert!(session.is_game_over());
    assert_eq!(
        session.outcome(),
        Some(Outcome::Win {
            winner: Stone::Black,
            by: WinReason::FiveInARow
        })
    );
    assert!(session.check_win(0, 2));
    assert_eq!(session.play_as(&white, 5, 5).unwrap_err(), Rejection::GameOver);
    assert_eq!(session.finish(Outcome::Draw).unwrap_err(), Rejection::GameOver);
}

#[test]
fn test_again_after_a_win_resets_board_and_turn() {
    let (session, black, white) = started(4);
    for y in 0..4 {
        session.play_as(&black, 0, y).unwrap();
        session.play_as(&white, 1, y).unwrap();
    }
    session.play_as(&black, 0, 4).unwrap();
    assert!(session.is_game_over());

    let (black2, white2) = session.start_game().unwrap();
    assert!(session.board().is_empty());
    assert_eq!(session.current_turn(), Some(Stone::Black));
    assert_eq!(black2.color(), Some(Stone::Black));
    assert_eq!(white2.color(), Some(Stone::White));
}

#[test]
fn test_leaving_a_running_game_forfeits() {
    let (session, black, white) = started(5);
    session.play_as(&black, 7, 7).unwrap();

    let departure = session.remove_player(&black).unwrap();
    assert!(Arc::ptr_eq(departure.forfeit_winner.as_ref().unwrap(), &white));
    assert_eq!(
        session.outcome(),
        Some(Outcome::Win {
            winner: Stone::White,
            by: WinReason::Forfeit
        })
    );
    assert_eq!(black.color(), None);
    assert_eq!(session.player_count(), 1);
    assert_eq!(session.start_game().unwrap_err(), Rejection::NotEnoughPlayers);
}

#[test]
fn test_leaving_a_finished_game_clears_the_remaining_color() {
    let (session, black, white) = started(8);
    for y in 0..4 {
        session.play_as(&black, 0, y).unwrap();
        session.play_as(&white, 1, y).unwrap();
    }
    session.play_as(&black, 0, 4).unwrap();
    assert!(session.is_game_over());
    assert_eq!(white.color(), Some(Stone::White));

    let departure = session.remove_player(&black).unwrap();
    assert!(departure.forfeit_winner.is_none());
    assert_eq!(session.phase(), Phase::Waiting);
    assert_eq!(white.color(), None);
    assert_eq!(black.color(), None);

    let (c, _) = player("carol");
    session.add_player(&c).unwrap();
    assert_eq!(session.phase(), Phase::Ready);
    assert_eq!(white.color(), None);
}

#[test]
fn test_manual_finish() {
    let (session, _, _) = started(6);
    session.finish(Outcome::Draw).unwrap();
    assert_eq!(session.outcome(), Some(Outcome::Draw));
    assert_eq!(
        session.make_move(0, 0, Stone::Black).unwrap_err(),
        Rejection::GameOver
    );
}

/// Color for a board-filling pattern whose longest run in any direction is two.
fn draw_pattern(x: usize, y: usize) -> Stone {
    if ((y + 2 * x) / 2) % 2 == 0 {
        Stone::Black
    } else {
        Stone::White
    }
}

#[test]
fn test_full_board_without_five_is_a_draw() {
    let (session, _, _) = started(7);
    let cells: Vec<(usize, usize)> = (0..BOARD_SIZE)
        .flat_map(|x| (0..BOARD_SIZE).map(move |y| (x, y)))
        .collect();
    let mut blacks = cells.iter().filter(|&&(x, y)| draw_pattern(x, y) == Stone::Black);
    let mut whites = cells.iter().filter(|&&(x, y)| draw_pattern(x, y) == Stone::White);

    let mut last = None;
    loop {
        let Some(&(x, y)) = blacks.next() else { break };
        last = Some(session.play(x, y, Stone::Black).unwrap());
        let Some(&(x, y)) = whites.next() else { break };
        last = Some(session.play(x, y, Stone::White).unwrap());
    }
    assert_eq!(last, Some(MoveOutcome::Draw));
    assert_eq!(session.outcome(), Some(Outcome::Draw));
    assert!(session.board().is_full());
}

#[test]
fn test_concurrent_moves_on_one_turn_apply_once() {
    for _ in 0..32 {
        let (session, _, _) = started(8);
        let barrier = Barrier::new(2);
        let results: Vec<Result<(), Rejection>> = std::thread::scope(|s| {
            let handles: Vec<_> = [(3, 3), (4, 4)]
                .into_iter()
                .map(|(x, y)| {
                    let session = &session;
                    let barrier = &barrier;
                    s.spawn(move || {
                        barrier.wait();
                        session.make_move(x, y, Stone::Black)
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(results.contains(&Err(Rejection::NotYourTurn)));
        assert_eq!(session.board().stones(), 1);
        assert_eq!(session.current_turn(), Some(Stone::White));
    }
}

#[test]
fn test_snapshot_lists_names_and_phase() {
    let (session, _, _) = started(9);
    let snap = session.snapshot();
    assert_eq!(snap.id, 1);
    assert_eq!(snap.player_count(), 2);
    assert!(snap.players.contains(&"alice".to_string()));
    assert_eq!(snap.phase, gomoku::PhaseLabel::InProgress);
    assert!(!snap.standing);
}
