//! End-to-end engine scenarios exercising the dual-threaded search

use std::time::Instant;

use antares_core::board::parse_cell;
use antares_core::{Engine, GameResult, Player};

#[test]
fn empty_board_suggestion_is_legal() {
    let mut engine = Engine::new();
    let reply = engine.suggest_move(Player::White, 0.15);
    let cell = parse_cell(&reply).expect("a cell name");
    assert!(engine.position().cell_is_empty(cell));
}

#[test]
fn immediate_bridge_win_is_found() {
    let mut engine = Engine::new();
    for name in ["a1", "a2", "a3", "a4", "a6", "a7", "a8"] {
        assert_eq!(engine.play_move(Player::White, name), Ok(GameResult::NoneWon));
    }
    for name in ["h8", "i9"] {
        assert_eq!(engine.play_move(Player::Black, name), Ok(GameResult::NoneWon));
    }
    let reply = engine.suggest_move(Player::White, 1.0);
    assert_eq!(reply, "a5");
    assert_eq!(
        engine.play_move(Player::White, &reply),
        Ok(GameResult::WhiteWon)
    );
}

#[test]
fn imminent_ring_is_blocked() {
    let mut engine = Engine::new();
    for name in ["h7", "i8", "i9", "h9", "g8"] {
        assert_eq!(engine.play_move(Player::Black, name), Ok(GameResult::NoneWon));
    }
    for name in ["c3", "d4"] {
        assert_eq!(engine.play_move(Player::White, name), Ok(GameResult::NoneWon));
    }
    let reply = engine.suggest_move(Player::White, 2.0);
    assert_eq!(reply, "g7");
}

#[test]
fn swap_leaves_one_black_stone() {
    let mut engine = Engine::new();
    engine.play_move(Player::White, "a1").unwrap();
    engine.play_move(Player::Black, "swap").unwrap();
    let board = engine.board_string();
    assert_eq!(board.matches('X').count(), 1);
    assert_eq!(board.matches('O').count(), 0);
}

#[test]
fn evaluation_survives_a_move_and_undo() {
    let mut engine = Engine::new();
    engine.play_move(Player::White, "e5").unwrap();
    engine.play_move(Player::Black, "k9").unwrap();
    let before = engine.evaluation(Player::Black);
    engine.play_move(Player::Black, "f6").unwrap();
    assert!(engine.undo());
    assert_eq!(engine.evaluation(Player::Black), before);
}

#[test]
fn short_budget_returns_promptly() {
    let mut engine = Engine::new();
    let start = Instant::now();
    let reply = engine.suggest_move(Player::White, 0.2);
    assert_ne!(reply, "none");
    // The budget plus one evaluator call and the joins, with headroom for
    // debug builds.
    assert!(start.elapsed().as_secs_f64() < 2.0, "{:?}", start.elapsed());
}
