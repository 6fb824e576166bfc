//! Two-thread search driver
//!
//! One searcher asks what the side to move can achieve, the other what the
//! opponent could achieve if it were to move. Whichever finishes a
//! conclusive iteration first lowers the shared depth cap, winding the
//! other down, and the two root evaluations are combined per cell.

use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::board::{move_index_to_cell, Cell, MoveIndex, Player};
use crate::logger::SearchLog;
use crate::position::Position;

use super::{Searcher, INFINITY_VALUE, MAX_SEARCH_DEPTH, POTENTIAL_SCALE};

/// Searches `position` for `seconds` of wall clock and returns the chosen
/// cell, or `None` when no legal move exists.
pub fn suggest_move(
    position: &Position,
    player: Player,
    seconds: f64,
    tt_log2_entries: u32,
) -> Option<Cell> {
    let log = Arc::new(SearchLog::new());
    let max_depth = Arc::new(AtomicI32::new(MAX_SEARCH_DEPTH));
    let mut attack = Searcher::new(
        log.clone(),
        max_depth.clone(),
        position,
        player,
        tt_log2_entries,
    );
    let mut defend = Searcher::new(
        log.clone(),
        max_depth.clone(),
        position,
        player.opponent(),
        tt_log2_entries,
    );
    let attack_solved = attack.solved_handle();
    let defend_solved = defend.solved_handle();
    let attack_tt = attack.tt_handle();
    let defend_tt = defend.tt_handle();

    std::thread::scope(|scope| {
        scope.spawn(|| attack.search_for_attacker());
        scope.spawn(|| defend.search_for_defender());

        let budget = Duration::from_secs_f64(seconds.max(0.0));
        let start = Instant::now();
        let mut ticks = 0u32;
        while start.elapsed() < budget {
            let remaining = budget.saturating_sub(start.elapsed());
            std::thread::sleep(remaining.min(Duration::from_secs(1)));
            ticks += 1;
            if ticks % 10 == 0 {
                log.log(&format!(
                    "{} {}",
                    attack_tt.num_elements(),
                    defend_tt.num_elements()
                ));
            }
            if attack_solved.load(Ordering::Acquire) && defend_solved.load(Ordering::Acquire) {
                break;
            }
        }
        max_depth.store(0, Ordering::Relaxed);
    });

    let attack_evaluation = attack.position_evaluation();
    let defend_evaluation = defend.position_evaluation();
    let mut best_value = -INFINITY_VALUE;
    let mut best_move: Option<MoveIndex> = None;
    for m in MoveIndex::all() {
        if !position.cell_is_empty(move_index_to_cell(m)) {
            continue;
        }
        let value = defend_evaluation.get(m) - attack_evaluation.get(m);
        if value > best_value {
            best_value = value;
            best_move = Some(m);
        }
    }
    if best_move.is_some() {
        log::debug!(
            "{:.2} moves ahead",
            best_value as f64 / POTENTIAL_SCALE as f64
        );
    }
    best_move.map(move_index_to_cell)
}
