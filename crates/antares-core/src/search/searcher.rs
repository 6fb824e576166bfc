//! Attack/Defend search kernels
//!
//! Two mutually recursive procedures share one transposition table and one
//! move arena per searcher. Values are centi-potentials: smaller is better
//! for the attacker, larger for the defender, and every real move shifts
//! the window by one ply of tempo.

use std::fmt::Write as _;
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use std::sync::Arc;

use crate::board::{
    cell_to_move_index, in_mask_or_twice_adjacent, modify_zobrist_hash, move_index_to_cell,
    on_board, BoardBitmask, Cell, MoveIndex, Player, SIDE_LENGTH,
};
use crate::eval::{evaluate_for_player, PositionEvaluation};
use crate::logger::SearchLog;
use crate::position::{Memento, Position};

use super::{
    compare_asc, compare_desc, CellEval, Kind, MoveArena, SearchRecord, TranspositionTable,
    ATTACKER_PASS_HASH, DEFENDER_PASS_HASH, DRAW, INFINITY_VALUE, LOST, POTENTIAL_SCALE, WON,
};

/// The search was cancelled by the shared depth cap.
#[derive(Debug, Clone, Copy)]
pub struct Interrupted;

type SearchResult = Result<i32, Interrupted>;

/// One side of the dual search, owning its private position copy,
/// transposition table and move arena.
pub struct Searcher {
    log: Arc<SearchLog>,
    max_depth: Arc<AtomicI32>,
    solved: Arc<AtomicBool>,
    attacker: Player,
    defender: Player,
    position: Position,
    evaluation: PositionEvaluation,
    tt: Arc<TranspositionTable>,
    arena: MoveArena,
}

impl Searcher {
    pub fn new(
        log: Arc<SearchLog>,
        max_depth: Arc<AtomicI32>,
        position: &Position,
        attacker: Player,
        tt_log2_entries: u32,
    ) -> Searcher {
        Searcher {
            log,
            max_depth,
            solved: Arc::new(AtomicBool::new(false)),
            attacker,
            defender: attacker.opponent(),
            position: position.clone(),
            evaluation: PositionEvaluation::new(),
            tt: Arc::new(TranspositionTable::new(tt_log2_entries)),
            arena: MoveArena::new(),
        }
    }

    /// Shared flag the driver polls while the thread runs.
    pub fn solved_handle(&self) -> Arc<AtomicBool> {
        self.solved.clone()
    }

    /// Shared table handle the driver reads sizes from.
    pub fn tt_handle(&self) -> Arc<TranspositionTable> {
        self.tt.clone()
    }

    pub fn solved(&self) -> bool {
        self.solved.load(Ordering::Acquire)
    }

    pub fn tt_size(&self) -> usize {
        self.tt.num_elements()
    }

    /// The last published root evaluation.
    pub fn position_evaluation(&self) -> &PositionEvaluation {
        &self.evaluation
    }

    /// Iterative deepening from the attacker's perspective.
    pub fn search_for_attacker(&mut self) {
        let iterations: Result<(), Interrupted> = (|| {
            let mut depth = 0;
            while depth < self.max_depth.load(Ordering::Relaxed) {
                self.attack(0, -INFINITY_VALUE, INFINITY_VALUE, depth, 0, 2 * depth, false)?;
                let main_variation = self.principal_variation(0, self.attacker);
                let pass_variation =
                    self.principal_variation(ATTACKER_PASS_HASH, self.defender);
                self.log.log(&format!(
                    "A{} {} {} |{}",
                    depth,
                    self.tt_size(),
                    main_variation,
                    pass_variation
                ));
                let Some(root) = self.tt.load(0) else { break };
                debug_assert_ne!(root.moves_index, 0);
                let moves = self.arena.get(root.moves_index);
                if moves.is_empty() {
                    break;
                }
                if moves[0].value as i32 <= WON + POTENTIAL_SCALE * depth
                    || moves.len() == 1
                    || moves[1].value as i32 >= DRAW
                {
                    break;
                }
                depth += 1;
            }
            self.max_depth.store(depth + 1, Ordering::Relaxed);
            Ok(())
        })();
        let _ = iterations;
        self.fill_evaluation(0);
        self.solved.store(true, Ordering::Release);
    }

    /// Iterative deepening from the defender's perspective.
    pub fn search_for_defender(&mut self) {
        let iterations: Result<(), Interrupted> = (|| {
            let mut depth = 0;
            while depth < self.max_depth.load(Ordering::Relaxed) {
                self.defend(0, -INFINITY_VALUE, INFINITY_VALUE, depth, 0, 2 * depth)?;
                let main_variation = self.principal_variation(0, self.defender);
                let pass_variation =
                    self.principal_variation(DEFENDER_PASS_HASH, self.attacker);
                self.log.log(&format!(
                    "D{} {} {} |{}",
                    depth,
                    self.tt_size(),
                    main_variation,
                    pass_variation
                ));
                let Some(root) = self.tt.load(0) else { break };
                debug_assert_ne!(root.moves_index, 0);
                let moves = self.arena.get(root.moves_index);
                if moves.is_empty() {
                    break;
                }
                if moves[0].value as i32 >= DRAW
                    || moves.len() == 1
                    || moves[1].value as i32 <= WON + POTENTIAL_SCALE * depth
                {
                    break;
                }
                depth += 1;
            }
            self.max_depth.store(depth + 1, Ordering::Relaxed);
            Ok(())
        })();
        let _ = iterations;
        self.fill_evaluation(0);
        self.solved.store(true, Ordering::Release);
    }

    #[allow(clippy::too_many_arguments)]
    fn attack(
        &mut self,
        hash: u64,
        alpha: i32,
        mut beta: i32,
        depth: i32,
        level: i32,
        max_level: i32,
        last_move_was_defender_pass: bool,
    ) -> SearchResult {
        if depth > self.max_depth.load(Ordering::Relaxed) {
            return Err(Interrupted);
        }
        let tt = self.tt.clone();
        let node = tt.find(hash);
        let mut moves_index = 0;
        if let Some(cell) = node {
            let record = SearchRecord::unpack(cell.load(Ordering::Relaxed));
            if record.depth as i32 == depth
                && (record.kind == Kind::Exact
                    || (record.kind == Kind::Alpha && record.value as i32 <= alpha)
                    || (record.kind == Kind::Beta && record.value as i32 >= beta))
            {
                return Ok(record.value as i32);
            }
            moves_index = record.moves_index;
            debug_assert_ne!(moves_index, 0);
        }
        if moves_index == 0 {
            moves_index = self.expand_moves(self.attacker, level);
        }

        let mut moves = self.arena.checkout(moves_index);
        let outcome = self.attack_over_moves(
            &mut moves,
            hash,
            alpha,
            &mut beta,
            depth,
            level,
            max_level,
            last_move_was_defender_pass,
        );
        self.arena.restore(moves_index, moves);
        let (value, kind) = outcome?;

        let slot = match node {
            Some(cell) => Some(cell),
            None => tt.insert(hash),
        };
        if let Some(cell) = slot {
            cell.store(
                SearchRecord {
                    value: value as i16,
                    kind,
                    depth: depth as u16,
                    moves_index,
                }
                .pack(),
                Ordering::Relaxed,
            );
        }
        Ok(value)
    }

    #[allow(clippy::too_many_arguments)]
    fn attack_over_moves(
        &mut self,
        moves: &mut Vec<CellEval>,
        hash: u64,
        alpha: i32,
        beta: &mut i32,
        depth: i32,
        level: i32,
        max_level: i32,
        last_move_was_defender_pass: bool,
    ) -> Result<(i32, Kind), Interrupted> {
        let mut value = DRAW;
        let kind;
        if depth == 0 || level > max_level {
            let skip = last_move_was_defender_pass as usize;
            if moves.len() > skip {
                let probe = CellEval {
                    cell: Cell::PASS,
                    value: moves[skip].value,
                };
                let mobility = moves
                    .partition_point(|m| compare_asc(m, &probe) != std::cmp::Ordering::Greater);
                debug_assert!(mobility >= 1);
                value = moves[skip].value as i32 - mobility as i32;
            }
            kind = Kind::Exact;
        } else {
            let mut cut = Kind::Beta;
            let mut memento = Memento::default();
            let mut i = 0;
            let mut broke = false;
            while i < moves.len() {
                let cell = moves[i].cell;
                if cell == Cell::PASS {
                    if level == 0 {
                        let v = self.defend(
                            hash.wrapping_add(ATTACKER_PASS_HASH),
                            alpha,
                            *beta,
                            depth,
                            level + 1,
                            max_level,
                        )?;
                        value = v;
                        moves[i].value = v as i16;
                    }
                } else {
                    if self
                        .position
                        .make_move_reversibly(self.attacker, cell, &mut memento)
                        .is_some()
                    {
                        memento.undo_all(&mut self.position);
                        value = WON;
                        moves[i].value = WON as i16;
                        cut = Kind::Alpha;
                        broke = true;
                        break;
                    }
                    let child = self.defend(
                        modify_zobrist_hash(hash, self.attacker, cell_to_move_index(cell)),
                        alpha - POTENTIAL_SCALE,
                        *beta - POTENTIAL_SCALE,
                        depth - 1,
                        level + 1,
                        max_level,
                    );
                    memento.undo_all(&mut self.position);
                    value = child? + POTENTIAL_SCALE;
                    moves[i].value = value as i16;
                }
                if value <= alpha && level > 0 {
                    cut = Kind::Alpha;
                    broke = true;
                    break;
                }
                if value < *beta && level > 0 {
                    cut = Kind::Exact;
                    *beta = value;
                }
                i += 1;
            }
            let touched = if broke { i + 1 } else { i };
            moves[..touched].sort_by(compare_asc);
            value = moves.first().map_or(DRAW, |m| m.value as i32);
            kind = cut;
        }
        Ok((value, kind))
    }

    fn defend(
        &mut self,
        hash: u64,
        alpha: i32,
        beta: i32,
        depth: i32,
        level: i32,
        max_level: i32,
    ) -> SearchResult {
        if depth > self.max_depth.load(Ordering::Relaxed) {
            return Err(Interrupted);
        }
        let tt = self.tt.clone();
        let node = tt.find(hash);
        let mut moves_index = 0;
        if let Some(cell) = node {
            let record = SearchRecord::unpack(cell.load(Ordering::Relaxed));
            if record.depth as i32 == depth
                && (record.kind == Kind::Exact
                    || (record.kind == Kind::Alpha && record.value as i32 <= alpha)
                    || (record.kind == Kind::Beta && record.value as i32 >= beta))
            {
                return Ok(record.value as i32);
            }
            moves_index = record.moves_index;
            debug_assert_ne!(moves_index, 0);
        }
        if moves_index == 0 {
            // The defender's list starts as just the pass child and grows
            // with the attacker's refutations as they are discovered.
            moves_index = self.arena.alloc();
            let mut seed = self.arena.checkout(moves_index);
            seed.push(CellEval::new(Cell::PASS, alpha));
            self.arena.restore(moves_index, seed);
        }

        let mut moves = self.arena.checkout(moves_index);
        let outcome =
            self.defend_over_moves(&mut moves, hash, alpha, beta, depth, level, max_level);
        self.arena.restore(moves_index, moves);
        let (value, kind) = outcome?;

        let slot = match node {
            Some(cell) => Some(cell),
            None => tt.insert(hash),
        };
        if let Some(cell) = slot {
            cell.store(
                SearchRecord {
                    value: value as i16,
                    kind,
                    depth: depth as u16,
                    moves_index,
                }
                .pack(),
                Ordering::Relaxed,
            );
        }
        Ok(value)
    }

    #[allow(clippy::too_many_arguments)]
    fn defend_over_moves(
        &mut self,
        moves: &mut Vec<CellEval>,
        hash: u64,
        mut alpha: i32,
        beta: i32,
        depth: i32,
        level: i32,
        max_level: i32,
    ) -> Result<(i32, Kind), Interrupted> {
        let mut kind = Kind::Alpha;
        let mut memento = Memento::default();
        let mut i = 0;
        let mut broke = false;
        while i < moves.len() {
            let cell = moves[i].cell;
            let value;
            if cell == Cell::PASS {
                value = self.attack(
                    hash.wrapping_add(DEFENDER_PASS_HASH),
                    alpha - POTENTIAL_SCALE,
                    beta - POTENTIAL_SCALE,
                    depth,
                    level + 1,
                    max_level,
                    true,
                )?;
                moves[i].value = value as i16;
                if value < beta {
                    self.append_interesting_moves(
                        hash.wrapping_add(DEFENDER_PASS_HASH),
                        moves,
                    );
                }
            } else {
                if self
                    .position
                    .make_move_reversibly(self.defender, cell, &mut memento)
                    .is_some()
                {
                    memento.undo_all(&mut self.position);
                    value = LOST;
                    moves[i].value = LOST as i16;
                    kind = Kind::Beta;
                    broke = true;
                    break;
                }
                let child = self.attack(
                    modify_zobrist_hash(hash, self.defender, cell_to_move_index(cell)),
                    alpha + POTENTIAL_SCALE,
                    beta + POTENTIAL_SCALE,
                    depth + 1,
                    level + 1,
                    max_level,
                    false,
                );
                memento.undo_all(&mut self.position);
                value = child? - POTENTIAL_SCALE;
                moves[i].value = value as i16;
            }
            if value >= beta && level > 0 {
                kind = Kind::Beta;
                broke = true;
                break;
            }
            if value > alpha && level > 0 {
                kind = Kind::Exact;
                alpha = value;
            }
            i += 1;
        }
        let touched = if broke { i + 1 } else { i };
        moves[..touched].sort_by(compare_desc);
        let value = moves.first().map_or(DRAW, |m| m.value as i32);
        Ok((value, kind))
    }

    /// Adds the attacker's best equal-valued replies behind the pass child,
    /// skipping cells the list already holds.
    fn append_interesting_moves(&self, hash: u64, moves: &mut Vec<CellEval>) {
        let Some(node) = self.tt.load(hash) else {
            return;
        };
        if node.moves_index == 0 {
            return;
        }
        let attacks = self.arena.get(node.moves_index);
        let Some(best) = attacks.first() else { return };
        let size = moves.len();
        for attack in attacks {
            if attack.value > best.value {
                break;
            }
            if !moves[..size].iter().any(|m| m.cell == attack.cell) {
                moves.push(*attack);
            }
        }
    }

    /// Expands candidate moves for `player` into a fresh arena list.
    fn expand_moves(&mut self, player: Player, level: i32) -> u32 {
        let moves_index = self.arena.alloc();
        let mut moves = self.arena.checkout(moves_index);
        let baseline;
        match self.position.move_count() {
            0 => {
                // One canonical hextant is enough for the first move.
                baseline = ((SIDE_LENGTH + 1) * (SIDE_LENGTH + 1) / 3) as i32;
                let middle = SIDE_LENGTH - 1;
                for y in middle..crate::board::GRID_ROWS {
                    for x in middle..=y {
                        if !on_board(x as i32, y as i32) {
                            continue;
                        }
                        let cell = Cell::from_xy(x, y);
                        debug_assert!(self.position.cell_is_empty(cell));
                        moves.push(CellEval::new(cell, POTENTIAL_SCALE * baseline));
                    }
                }
            }
            1 => {
                baseline = ((SIDE_LENGTH + 1) * (SIDE_LENGTH + 1) / 3) as i32;
                for m in MoveIndex::all() {
                    let cell = move_index_to_cell(m);
                    if self.position.cell_is_empty(cell) {
                        moves.push(CellEval::new(cell, POTENTIAL_SCALE * baseline));
                    }
                }
            }
            _ => {
                self.evaluation = evaluate_for_player(&self.position, player);
                baseline = self.evaluation.baseline_distance();
                let own = self.position.player_position(player).stone_mask();
                let opponent = self
                    .position
                    .player_position(player.opponent())
                    .stone_mask();
                let mut neighbor_mask = BoardBitmask::new();
                neighbor_mask.fill_with_neighbor_mask(own, opponent);
                for m in MoveIndex::all() {
                    let cell = move_index_to_cell(m);
                    if !self.position.cell_is_empty(cell) {
                        continue;
                    }
                    let v = self.evaluation.get(m);
                    if v < baseline || in_mask_or_twice_adjacent(cell, &neighbor_mask) {
                        moves.push(CellEval::new(cell, POTENTIAL_SCALE * v));
                    }
                }
            }
        }
        if level == 0 {
            moves.push(CellEval::new(Cell::PASS, POTENTIAL_SCALE * baseline));
        }
        moves.sort_by(compare_asc);
        self.arena.restore(moves_index, moves);
        moves_index
    }

    /// Renders the best line of play from `hash`, up to twenty plies.
    fn principal_variation(&self, mut hash: u64, mut player: Player) -> String {
        let mut out = String::new();
        for _ in 0..20 {
            let Some(node) = self.tt.load(hash) else { break };
            if node.moves_index == 0 {
                break;
            }
            let moves = self.arena.get(node.moves_index);
            let Some(first) = moves.first() else { break };
            if first.cell == Cell::PASS {
                let _ = write!(out, " ({})pass({})", node.value, first.value);
                hash = hash.wrapping_add(if player == self.attacker {
                    ATTACKER_PASS_HASH
                } else {
                    DEFENDER_PASS_HASH
                });
            } else {
                let _ = write!(
                    out,
                    " ({}){}({})",
                    node.value,
                    crate::board::cell_name(first.cell),
                    first.value
                );
                hash = modify_zobrist_hash(hash, player, cell_to_move_index(first.cell));
            }
            player = player.opponent();
        }
        out
    }

    /// Publishes the root move list as a per-cell evaluation: untouched
    /// cells inherit the pass value.
    fn fill_evaluation(&mut self, hash: u64) {
        let Some(root) = self.tt.load(hash) else {
            self.evaluation.set_all_moves_to(LOST);
            return;
        };
        if root.moves_index == 0 {
            self.evaluation.set_all_moves_to(LOST);
            return;
        }
        let moves = self.arena.get(root.moves_index);
        let mut null_value = LOST;
        for m in moves {
            if m.cell == Cell::PASS {
                null_value = m.value as i32;
            }
        }
        self.evaluation.set_all_moves_to(null_value);
        for m in moves {
            if m.cell != Cell::PASS {
                self.evaluation.set(cell_to_move_index(m.cell), m.value as i32);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::parse_cell;
    use crate::search::POTENTIAL_SCALE;

    fn searcher_for(position: &Position, attacker: Player, cap: i32) -> Searcher {
        Searcher::new(
            Arc::new(SearchLog::new()),
            Arc::new(AtomicI32::new(cap)),
            position,
            attacker,
            14,
        )
    }

    #[test]
    fn first_move_expansion_is_hextant_restricted() {
        let position = Position::new();
        let mut searcher = searcher_for(&position, Player::White, 1);
        let id = searcher.expand_moves(Player::White, 0);
        let moves = searcher.arena.get(id);
        let middle = SIDE_LENGTH - 1;
        let mut pass_seen = false;
        for m in moves {
            if m.cell == Cell::PASS {
                pass_seen = true;
                continue;
            }
            assert!(m.cell.y() >= middle);
            assert!(m.cell.x() >= middle && m.cell.x() <= m.cell.y());
        }
        assert!(pass_seen);
        // One sixth of the board, with each mirror boundary shared.
        assert!(moves.len() > SIDE_LENGTH && moves.len() < crate::board::NUM_CELLS / 2);
    }

    #[test]
    fn second_move_expansion_covers_the_board() {
        let mut position = Position::new();
        position.make_permanent_move(Player::White, parse_cell("h8").unwrap());
        let mut searcher = searcher_for(&position, Player::Black, 1);
        let id = searcher.expand_moves(Player::Black, 1);
        let moves = searcher.arena.get(id);
        assert_eq!(moves.len(), crate::board::NUM_CELLS - 1);
        assert!(moves.iter().all(|m| m.cell != Cell::PASS));
    }

    #[test]
    fn empty_board_baseline_after_one_iteration() {
        let position = Position::new();
        let mut searcher = searcher_for(&position, Player::White, 1);
        searcher.search_for_attacker();
        assert!(searcher.solved());
        let expected = POTENTIAL_SCALE * ((SIDE_LENGTH + 1) * (SIDE_LENGTH + 1) / 3) as i32;
        assert_eq!(searcher.position_evaluation().baseline_distance(), expected);
    }

    #[test]
    fn attacker_finds_the_winning_move() {
        let mut position = Position::new();
        for name in ["a1", "a2", "a3", "a4", "a6", "a7", "a8"] {
            position.make_permanent_move(Player::White, parse_cell(name).unwrap());
        }
        for name in ["h8", "i9"] {
            position.make_permanent_move(Player::Black, parse_cell(name).unwrap());
        }
        let mut searcher = searcher_for(&position, Player::White, 3);
        searcher.search_for_attacker();
        let root = searcher.tt.load(0).unwrap();
        let moves = searcher.arena.get(root.moves_index);
        assert_eq!(moves[0].cell, parse_cell("a5").unwrap());
        assert_eq!(moves[0].value as i32, WON);
    }

    #[test]
    fn search_is_deterministic_at_fixed_depth() {
        let mut position = Position::new();
        position.make_permanent_move(Player::White, parse_cell("h8").unwrap());
        position.make_permanent_move(Player::Black, parse_cell("c3").unwrap());
        let run = || {
            let mut searcher = searcher_for(&position, Player::White, 1);
            searcher.search_for_attacker();
            searcher.principal_variation(0, Player::White)
        };
        let a = run();
        let b = run();
        assert_eq!(a, b);
        assert!(!a.is_empty());
    }

    #[test]
    fn cancelled_searcher_still_publishes() {
        let position = Position::new();
        let mut searcher = searcher_for(&position, Player::White, 0);
        searcher.search_for_attacker();
        assert!(searcher.solved());
    }
}
