//! Engine operations consumed by the command front-end

use std::fmt;

use crate::board::{cell_name, parse_cell, set_lg_coordinates, Cell, Player};
use crate::eval::{evaluate_for_player, evaluate_goal, GoalSpec};
use crate::position::Position;
use crate::search::{suggest_move, DEFAULT_TT_LOG2_ENTRIES};

/// Outcome of the game as seen by the front-end.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum GameResult {
    NoneWon,
    WhiteWon,
    Draw,
    BlackWon,
}

impl fmt::Display for GameResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GameResult::NoneWon => "none",
            GameResult::WhiteWon => "white",
            GameResult::Draw => "draw",
            GameResult::BlackWon => "black",
        };
        write!(f, "{name}")
    }
}

/// Why a move request was rejected.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum MoveError {
    Malformed,
    Occupied,
}

impl fmt::Display for MoveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MoveError::Malformed => write!(f, "malformed move"),
            MoveError::Occupied => write!(f, "cell is not empty"),
        }
    }
}

/// The playing engine: one position plus the two engine options.
pub struct Engine {
    position: Position,
    has_swapped: bool,
    seconds_per_move: f64,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    pub fn new() -> Engine {
        Engine {
            position: Position::new(),
            has_swapped: false,
            seconds_per_move: 20.0,
        }
    }

    pub fn position(&self) -> &Position {
        &self.position
    }

    /// Rolls the position back to the start and clears the swap flag.
    pub fn reset(&mut self) {
        while self.undo() {}
        self.has_swapped = false;
    }

    /// Pops the last permanent move.
    pub fn undo(&mut self) -> bool {
        self.position.undo_permanent_move()
    }

    /// Accepts `pass`, `swap` (first move only) or a cell name. The engine
    /// state is unchanged when an error is returned.
    pub fn play_move(&mut self, player: Player, text: &str) -> Result<GameResult, MoveError> {
        if text == "pass" {
            return Ok(GameResult::NoneWon);
        }
        if text == "swap" {
            if self.position.move_count() != 1 || self.has_swapped {
                return Err(MoveError::Malformed);
            }
            self.position.swap_players();
            self.has_swapped = true;
            return Ok(GameResult::NoneWon);
        }
        let cell = parse_cell(text).ok_or(MoveError::Malformed)?;
        if !self.position.cell_is_empty(cell) {
            return Err(MoveError::Occupied);
        }
        if self.position.make_permanent_move(player, cell).is_some() {
            return Ok(match player {
                Player::White => GameResult::WhiteWon,
                Player::Black => GameResult::BlackWon,
            });
        }
        if self.board_is_full() {
            return Ok(GameResult::Draw);
        }
        Ok(GameResult::NoneWon)
    }

    /// Thinks for up to `seconds` (the configured default when zero or
    /// negative) and returns the chosen cell name, or `none` when no legal
    /// move exists.
    pub fn suggest_move(&mut self, player: Player, seconds: f64) -> String {
        let budget = if seconds > 0.0 {
            seconds
        } else {
            self.seconds_per_move
        };
        match suggest_move(&self.position, player, budget, DEFAULT_TT_LOG2_ENTRIES) {
            Some(cell) => cell_name(cell),
            None => "none".to_owned(),
        }
    }

    /// Baseline distance of the full evaluation for `player`.
    pub fn evaluation(&self, player: Player) -> i32 {
        evaluate_for_player(&self.position, player).baseline_distance()
    }

    pub fn board_string(&self) -> String {
        self.position.board_string()
    }

    pub fn player_evaluation_string(&self, player: Player) -> String {
        evaluate_for_player(&self.position, player).render(&self.position)
    }

    pub fn partial_evaluation_string(&self, player: Player, goal: &GoalSpec) -> String {
        evaluate_goal(&self.position, player, goal).render(&self.position)
    }

    /// Diagnostic stub kept for the `variant` command.
    pub fn dump_evaluations(&self, variant: &[Cell]) -> bool {
        !variant.is_empty()
    }

    pub fn seconds_per_move(&self) -> f64 {
        self.seconds_per_move
    }

    pub fn set_seconds_per_move(&mut self, seconds: f64) {
        self.seconds_per_move = seconds;
    }

    pub fn set_use_lg_coordinates(&mut self, enabled: bool) {
        set_lg_coordinates(enabled);
    }

    pub fn use_lg_coordinates(&self) -> bool {
        crate::board::lg_coordinates()
    }

    fn board_is_full(&self) -> bool {
        use crate::board::{move_index_to_cell, MoveIndex};
        MoveIndex::all().all(|m| !self.position.cell_is_empty(move_index_to_cell(m)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pass_is_a_no_op() {
        let mut engine = Engine::new();
        assert_eq!(engine.play_move(Player::White, "pass"), Ok(GameResult::NoneWon));
        assert_eq!(engine.position().move_count(), 0);
    }

    #[test]
    fn malformed_moves_leave_state_unchanged() {
        let mut engine = Engine::new();
        assert_eq!(
            engine.play_move(Player::White, "z99"),
            Err(MoveError::Malformed)
        );
        assert_eq!(engine.position().move_count(), 0);
    }

    #[test]
    fn occupied_cells_are_rejected() {
        let mut engine = Engine::new();
        engine.play_move(Player::White, "c3").unwrap();
        assert_eq!(
            engine.play_move(Player::Black, "c3"),
            Err(MoveError::Occupied)
        );
        assert_eq!(engine.position().move_count(), 1);
    }

    #[test]
    fn swap_is_first_move_only() {
        let mut engine = Engine::new();
        assert_eq!(
            engine.play_move(Player::Black, "swap"),
            Err(MoveError::Malformed)
        );
        engine.play_move(Player::White, "c3").unwrap();
        assert_eq!(engine.play_move(Player::Black, "swap"), Ok(GameResult::NoneWon));
        assert_eq!(
            engine.play_move(Player::Black, "swap"),
            Err(MoveError::Malformed)
        );
    }

    #[test]
    fn winning_move_reports_the_winner() {
        let mut engine = Engine::new();
        for name in ["a1", "a2", "a3", "a4", "a5", "a6", "a7"] {
            assert_eq!(engine.play_move(Player::White, name), Ok(GameResult::NoneWon));
        }
        assert_eq!(
            engine.play_move(Player::White, "a8"),
            Ok(GameResult::WhiteWon)
        );
    }

    #[test]
    fn reset_clears_the_board() {
        let mut engine = Engine::new();
        engine.play_move(Player::White, "c3").unwrap();
        engine.play_move(Player::Black, "d4").unwrap();
        engine.reset();
        assert_eq!(engine.position().move_count(), 0);
        assert!(!engine.undo());
    }

    #[test]
    fn evaluation_is_restored_by_undo() {
        let mut engine = Engine::new();
        engine.play_move(Player::White, "d4").unwrap();
        let before = engine.evaluation(Player::White);
        engine.play_move(Player::White, "e5").unwrap();
        assert!(engine.undo());
        assert_eq!(engine.evaluation(Player::White), before);
    }
}
