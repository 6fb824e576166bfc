//! Goal-family evaluation: rings, bridges and forks

use super::{Endpoint, GoalSpec, PositionEvaluation};
use crate::board::{cell_to_move_index, corner_mask, edge_mask, Player};
use crate::position::{
    compute_two_distance, ring_frames, BfsResult, DistanceTarget, PlayerPosition, Position,
    MAX_DISTANCE,
};

/// The three partitions of the six edges into non-adjacent pairs. The set is
/// closed under rotating every edge index by one, which keeps the fork
/// estimate invariant under 60-degree board rotations.
const FORK_PARTITIONS: [[(usize, usize); 3]; 3] = [
    [(0, 3), (2, 4), (1, 5)],
    [(2, 5), (0, 4), (1, 3)],
    [(0, 2), (3, 5), (1, 4)],
];

fn evaluate_ring_frames(
    pp: &PlayerPosition,
    op: &PlayerPosition,
    evaluation: &mut PositionEvaluation,
) {
    for frame in ring_frames(pp, op) {
        for &cell in frame.cells.iter() {
            let m = cell_to_move_index(cell);
            evaluation.set(m, evaluation.get(m).min(frame.cost as i32));
        }
    }
}

fn evaluate_bridge_frames(
    pp: &PlayerPosition,
    op: &PlayerPosition,
    evaluation: &mut PositionEvaluation,
) {
    let mut from_corner: Vec<BfsResult> = vec![BfsResult::default(); 6];
    for (i, bfs) in from_corner.iter_mut().enumerate() {
        compute_two_distance(pp, &DistanceTarget::Corner(i), op, bfs);
    }
    for i in 0..6 {
        for j in i + 1..6 {
            let tmp = PositionEvaluation::from_combination(
                &from_corner[i],
                &from_corner[j],
                corner_mask(i),
                corner_mask(j),
            );
            evaluation.refine_min(&tmp);
        }
    }
}

fn evaluate_fork_frames(
    pp: &PlayerPosition,
    op: &PlayerPosition,
    evaluation: &mut PositionEvaluation,
) {
    if pp.current_chains().next().is_none() {
        return;
    }
    let mut from_edge: Vec<BfsResult> = vec![BfsResult::default(); 6];
    for (j, bfs) in from_edge.iter_mut().enumerate() {
        compute_two_distance(pp, &DistanceTarget::Edge(j), op, bfs);
    }
    let mut from_center = BfsResult::default();
    for chain in pp.current_chains() {
        compute_two_distance(pp, &DistanceTarget::Chain(chain), op, &mut from_center);
        let from_outside: Vec<PositionEvaluation> = (0..6)
            .map(|j| {
                PositionEvaluation::from_combination(
                    &from_center,
                    &from_edge[j],
                    &chain.mask,
                    edge_mask(j),
                )
            })
            .collect();
        let mut best: Option<PositionEvaluation> = None;
        for partition in &FORK_PARTITIONS {
            let mut part: Option<PositionEvaluation> = None;
            for &(a, b) in partition {
                let pair = PositionEvaluation::minimum(&from_outside[a], &from_outside[b]);
                part = Some(match part {
                    None => pair,
                    Some(acc) => PositionEvaluation::saturating_sum(&acc, &pair),
                });
            }
            let part = part.expect("partition is never empty");
            match best.as_mut() {
                None => best = Some(part),
                Some(acc) => acc.refine_min(&part),
            }
        }
        evaluation.refine_min(&best.expect("at least one partition"));
    }
}

/// Evaluates every goal family for `player` and keeps the cellwise minimum.
pub fn evaluate_for_player(position: &Position, player: Player) -> PositionEvaluation {
    let pp = position.player_position(player);
    let op = position.player_position(player.opponent());
    let mut evaluation = PositionEvaluation::new();
    evaluation.set_all_moves_to(MAX_DISTANCE as i32);
    evaluate_fork_frames(pp, op, &mut evaluation);
    evaluate_bridge_frames(pp, op, &mut evaluation);
    evaluate_ring_frames(pp, op, &mut evaluation);
    evaluation
}

/// Evaluates a single named goal for `player`.
pub fn evaluate_goal(position: &Position, player: Player, goal: &GoalSpec) -> PositionEvaluation {
    let pp = position.player_position(player);
    let op = position.player_position(player.opponent());
    let mut evaluation = PositionEvaluation::new();
    evaluation.set_all_moves_to(MAX_DISTANCE as i32);
    match goal {
        GoalSpec::Ring => evaluate_ring_frames(pp, op, &mut evaluation),
        GoalSpec::Bridge => evaluate_bridge_frames(pp, op, &mut evaluation),
        GoalSpec::Fork => evaluate_fork_frames(pp, op, &mut evaluation),
        GoalSpec::Total => return evaluate_for_player(position, player),
        GoalSpec::Pair(a, b) => {
            let ta = endpoint_target(pp, a);
            let tb = endpoint_target(pp, b);
            let mut bfs_a = BfsResult::default();
            let mut bfs_b = BfsResult::default();
            compute_two_distance(pp, &ta, op, &mut bfs_a);
            compute_two_distance(pp, &tb, op, &mut bfs_b);
            evaluation =
                PositionEvaluation::from_combination(&bfs_a, &bfs_b, &ta.mask(), &tb.mask());
        }
    }
    evaluation
}

fn endpoint_target<'a>(pp: &'a PlayerPosition, endpoint: &Endpoint) -> DistanceTarget<'a> {
    match *endpoint {
        Endpoint::Stone(cell) => {
            let id = pp.chain_id_at(cell);
            if id != 0 {
                DistanceTarget::Chain(pp.chain(id))
            } else {
                DistanceTarget::Stone(cell)
            }
        }
        Endpoint::Edge(i) => DistanceTarget::Edge(i),
        Endpoint::Corner(i) => DistanceTarget::Corner(i),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{move_index_to_cell, parse_cell, MoveIndex};
    use crate::position::Position;

    #[test]
    fn empty_board_values_are_saturated() {
        let pos = Position::new();
        let eval = evaluate_for_player(&pos, Player::White);
        for m in MoveIndex::all() {
            let v = eval.get(m);
            assert!((0..=MAX_DISTANCE as i32).contains(&v));
        }
    }

    #[test]
    fn empty_board_ring_baseline_is_six() {
        let pos = Position::new();
        let eval = evaluate_goal(&pos, Player::White, &GoalSpec::Ring);
        assert_eq!(eval.baseline_distance(), 6);
    }

    #[test]
    fn near_ring_needs_one_stone() {
        let mut pos = Position::new();
        for name in ["h7", "i8", "i9", "h9", "g8"] {
            pos.make_permanent_move(Player::White, parse_cell(name).unwrap());
        }
        let eval = evaluate_goal(&pos, Player::White, &GoalSpec::Ring);
        assert_eq!(eval.get(cell_to_move_index(parse_cell("g7").unwrap())), 1);
        assert_eq!(eval.baseline_distance(), 1);
    }

    #[test]
    fn near_bridge_needs_one_stone() {
        let mut pos = Position::new();
        for name in ["a1", "a2", "a3", "a4", "a6", "a7", "a8"] {
            pos.make_permanent_move(Player::White, parse_cell(name).unwrap());
        }
        let eval = evaluate_goal(&pos, Player::White, &GoalSpec::Bridge);
        assert_eq!(eval.get(cell_to_move_index(parse_cell("a5").unwrap())), 1);
    }

    #[test]
    fn blocked_ring_frame_is_discounted() {
        let mut pos = Position::new();
        for name in ["h7", "i8", "i9", "h9", "g8"] {
            pos.make_permanent_move(Player::White, parse_cell(name).unwrap());
        }
        pos.make_permanent_move(Player::Black, parse_cell("g7").unwrap());
        let eval = evaluate_goal(&pos, Player::White, &GoalSpec::Ring);
        assert!(eval.get(cell_to_move_index(parse_cell("h8").unwrap())) > 1);
    }

    #[test]
    fn fork_estimate_is_rotation_invariant() {
        let mut pos = Position::new();
        let mut rotated = Position::new();
        for name in ["d4", "e5", "h6", "c9"] {
            let cell = parse_cell(name).unwrap();
            pos.make_permanent_move(Player::White, cell);
            rotated.make_permanent_move(Player::White, cell.rotated());
        }
        for name in ["f6", "g9"] {
            let cell = parse_cell(name).unwrap();
            pos.make_permanent_move(Player::Black, cell);
            rotated.make_permanent_move(Player::Black, cell.rotated());
        }
        let eval = evaluate_goal(&pos, Player::White, &GoalSpec::Fork);
        let eval_rotated = evaluate_goal(&rotated, Player::White, &GoalSpec::Fork);
        for m in MoveIndex::all() {
            let cell = move_index_to_cell(m);
            assert_eq!(
                eval.get(m),
                eval_rotated.get(cell_to_move_index(cell.rotated())),
                "mismatch at {cell:?}"
            );
        }
    }

    #[test]
    fn evaluation_improves_with_a_friendly_stone() {
        let mut pos = Position::new();
        pos.make_permanent_move(Player::White, parse_cell("d4").unwrap());
        pos.make_permanent_move(Player::Black, parse_cell("l9").unwrap());
        let before = evaluate_for_player(&pos, Player::White).baseline_distance();
        pos.make_permanent_move(Player::White, parse_cell("e5").unwrap());
        let after = evaluate_for_player(&pos, Player::White).baseline_distance();
        assert!(after <= before);
    }
}
