//! Position state: stones, chains, reversible moves and win detection

mod distance;

pub use distance::{compute_two_distance, BfsResult, DistanceTarget, MAX_DISTANCE};

use smallvec::SmallVec;

use crate::board::{
    cell_to_move_index, corner_index_of, edge_index_of, modify_zobrist_hash, neighbors, on_board,
    BoardBitmask, Cell, MoveIndex, Player, GRID_ROWS, NUM_CELLS, SIDE_LENGTH,
};

/// A winning structure completed by a move.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum WinKind {
    Ring,
    Bridge,
    Fork,
}

/// A maximal connected group of like-colored stones.
#[derive(Clone, Debug)]
pub struct ChainData {
    pub mask: BoardBitmask,
    /// Bit `i` set when the chain touches corner `i`.
    pub corners: u8,
    /// Bit `i` set when the chain touches edge `i`.
    pub edges: u8,
    pub size: u16,
    alive: bool,
}

impl ChainData {
    fn single(cell: Cell) -> ChainData {
        let (x, y) = (cell.x(), cell.y());
        let mut mask = BoardBitmask::new();
        mask.set(x, y);
        ChainData {
            mask,
            corners: corner_index_of(x, y).map_or(0, |i| 1 << i),
            edges: edge_index_of(x, y).map_or(0, |i| 1 << i),
            size: 1,
            alive: true,
        }
    }

    fn absorb(&mut self, other: &ChainData) {
        self.mask.union_with(&other.mask);
        self.corners |= other.corners;
        self.edges |= other.edges;
        self.size += other.size;
    }

    fn add_stone(&mut self, cell: Cell) {
        let (x, y) = (cell.x(), cell.y());
        self.mask.set(x, y);
        if let Some(i) = corner_index_of(x, y) {
            self.corners |= 1 << i;
        }
        if let Some(i) = edge_index_of(x, y) {
            self.edges |= 1 << i;
        }
        self.size += 1;
    }
}

/// One player's half of the board state.
#[derive(Clone, Debug)]
pub struct PlayerPosition {
    stones: BoardBitmask,
    chain_ids: [u16; crate::board::CELL_CODES],
    chains: Vec<ChainData>,
}

impl PlayerPosition {
    fn new() -> PlayerPosition {
        PlayerPosition {
            stones: BoardBitmask::new(),
            chain_ids: [0; crate::board::CELL_CODES],
            // Id zero is reserved so a zeroed chain_ids array means "no chain".
            chains: vec![ChainData {
                mask: BoardBitmask::new(),
                corners: 0,
                edges: 0,
                size: 0,
                alive: false,
            }],
        }
    }

    /// Mask of this player's stones.
    #[inline]
    pub fn stone_mask(&self) -> &BoardBitmask {
        &self.stones
    }

    #[inline]
    pub(crate) fn chain_id_at(&self, cell: Cell) -> u16 {
        self.chain_ids[cell.code()]
    }

    pub(crate) fn chain(&self, id: u16) -> &ChainData {
        &self.chains[id as usize]
    }

    pub(crate) fn num_chain_slots(&self) -> usize {
        self.chains.len()
    }

    /// The current live chains.
    pub fn current_chains(&self) -> impl Iterator<Item = &ChainData> {
        self.chains.iter().filter(|c| c.alive && c.size > 0)
    }

    pub(crate) fn chain_slots(&self) -> impl Iterator<Item = (u16, &ChainData)> {
        self.chains
            .iter()
            .enumerate()
            .filter(|(_, c)| c.alive && c.size > 0)
            .map(|(i, c)| (i as u16, c))
    }
}

#[derive(Clone, Debug)]
enum UndoEntry {
    Stone { player: Player, cell: Cell },
    ChainCell { player: Player, code: usize, old: u16 },
    ChainCreated { player: Player },
    ChainSaved { player: Player, id: u16, data: ChainData },
}

/// Undo log of one reversible move.
#[derive(Clone, Debug, Default)]
pub struct Memento {
    entries: Vec<UndoEntry>,
}

impl Memento {
    /// Rolls the position back, newest entry first. The memento is left
    /// empty and may be reused.
    pub fn undo_all(&mut self, position: &mut Position) {
        while let Some(entry) = self.entries.pop() {
            match entry {
                UndoEntry::Stone { player, cell } => {
                    position.players[player.index()].stones.remove(cell);
                    position.hash =
                        modify_zobrist_hash(position.hash, player, cell_to_move_index(cell));
                    position.move_count -= 1;
                }
                UndoEntry::ChainCell { player, code, old } => {
                    position.players[player.index()].chain_ids[code] = old;
                }
                UndoEntry::ChainCreated { player } => {
                    position.players[player.index()].chains.pop();
                }
                UndoEntry::ChainSaved { player, id, data } => {
                    position.players[player.index()].chains[id as usize] = data;
                }
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// The canonical board state.
#[derive(Clone, Debug)]
pub struct Position {
    players: [PlayerPosition; 2],
    hash: u64,
    move_count: u32,
    history: Vec<(Player, Cell, Memento)>,
}

impl Default for Position {
    fn default() -> Self {
        Self::new()
    }
}

impl Position {
    /// The empty starting position.
    pub fn new() -> Position {
        Position {
            players: [PlayerPosition::new(), PlayerPosition::new()],
            hash: 0,
            move_count: 0,
            history: Vec::new(),
        }
    }

    #[inline]
    pub fn player_position(&self, player: Player) -> &PlayerPosition {
        &self.players[player.index()]
    }

    #[inline]
    pub fn hash(&self) -> u64 {
        self.hash
    }

    /// Number of stones on the board.
    #[inline]
    pub fn move_count(&self) -> u32 {
        self.move_count
    }

    /// Size of the dense move-index space.
    #[inline]
    pub fn num_available_moves(&self) -> u16 {
        NUM_CELLS as u16
    }

    #[inline]
    pub fn cell_is_empty(&self, cell: Cell) -> bool {
        !self.players[0].stones.contains(cell) && !self.players[1].stones.contains(cell)
    }

    /// Plays a stone, recording undo entries into `memento`. Returns the
    /// winning structure the stone completes, if any.
    pub fn make_move_reversibly(
        &mut self,
        player: Player,
        cell: Cell,
        memento: &mut Memento,
    ) -> Option<WinKind> {
        debug_assert!(cell.is_board());
        debug_assert!(self.cell_is_empty(cell));

        // Neighboring friendly chains, and how often the busiest one touches
        // the new stone: a ring can only appear when one chain touches twice.
        let mut neighbor_ids: SmallVec<[u16; 6]> = SmallVec::new();
        let mut max_same_chain_contacts = 0;
        {
            let pp = &self.players[player.index()];
            let mut contacts: SmallVec<[(u16, u32); 6]> = SmallVec::new();
            for n in neighbors(cell) {
                if pp.stones.contains(n) {
                    let id = pp.chain_id_at(n);
                    if let Some(entry) = contacts.iter_mut().find(|(i, _)| *i == id) {
                        entry.1 += 1;
                    } else {
                        contacts.push((id, 1));
                        neighbor_ids.push(id);
                    }
                }
            }
            for &(_, count) in &contacts {
                max_same_chain_contacts = max_same_chain_contacts.max(count);
            }
        }

        memento.entries.push(UndoEntry::Stone { player, cell });
        self.hash = modify_zobrist_hash(self.hash, player, cell_to_move_index(cell));
        self.move_count += 1;

        let pp = &mut self.players[player.index()];
        pp.stones.insert(cell);

        let target = if neighbor_ids.is_empty() {
            let id = pp.chains.len() as u16;
            pp.chains.push(ChainData::single(cell));
            memento.entries.push(UndoEntry::ChainCreated { player });
            id
        } else {
            let target = neighbor_ids[0];
            memento.entries.push(UndoEntry::ChainSaved {
                player,
                id: target,
                data: pp.chains[target as usize].clone(),
            });
            for &other in &neighbor_ids[1..] {
                memento.entries.push(UndoEntry::ChainSaved {
                    player,
                    id: other,
                    data: pp.chains[other as usize].clone(),
                });
                let absorbed = pp.chains[other as usize].clone();
                for c in absorbed.mask.iter() {
                    memento.entries.push(UndoEntry::ChainCell {
                        player,
                        code: c.code(),
                        old: other,
                    });
                    pp.chain_ids[c.code()] = target;
                }
                pp.chains[target as usize].absorb(&absorbed);
                pp.chains[other as usize].alive = false;
            }
            pp.chains[target as usize].add_stone(cell);
            target
        };
        memento.entries.push(UndoEntry::ChainCell {
            player,
            code: cell.code(),
            old: pp.chain_ids[cell.code()],
        });
        pp.chain_ids[cell.code()] = target;

        let chain = &pp.chains[target as usize];
        if chain.corners.count_ones() >= 2 {
            Some(WinKind::Bridge)
        } else if chain.edges.count_ones() >= 3 {
            Some(WinKind::Fork)
        } else if max_same_chain_contacts >= 2 && encloses_cell(&chain.mask) {
            Some(WinKind::Ring)
        } else {
            None
        }
    }

    /// Plays a stone on the permanent move history.
    pub fn make_permanent_move(&mut self, player: Player, cell: Cell) -> Option<WinKind> {
        let mut memento = Memento::default();
        let win = self.make_move_reversibly(player, cell, &mut memento);
        self.history.push((player, cell, memento));
        win
    }

    /// Pops the last permanent move. False when the history is empty.
    pub fn undo_permanent_move(&mut self) -> bool {
        match self.history.pop() {
            Some((_, _, mut memento)) => {
                memento.undo_all(self);
                true
            }
            None => false,
        }
    }

    /// Swaps the colors of every stone on the board.
    pub fn swap_players(&mut self) {
        self.players.swap(0, 1);
        let mut hash = 0;
        for (i, pp) in self.players.iter().enumerate() {
            let player = if i == 0 { Player::White } else { Player::Black };
            for c in pp.stones.iter() {
                hash = modify_zobrist_hash(hash, player, cell_to_move_index(c));
            }
        }
        self.hash = hash;
        // Move colors in the history no longer match the board; the history
        // is only replayed through undo, which the swap rule forbids anyway.
        for (player, _, memento) in self.history.iter_mut() {
            *player = player.opponent();
            for entry in memento.entries.iter_mut() {
                match entry {
                    UndoEntry::Stone { player, .. }
                    | UndoEntry::ChainCell { player, .. }
                    | UndoEntry::ChainCreated { player }
                    | UndoEntry::ChainSaved { player, .. } => *player = player.opponent(),
                }
            }
        }
    }

    /// A hex-shaped diagram of the board.
    pub fn board_string(&self) -> String {
        let mut out = String::new();
        for y in (0..GRID_ROWS).rev() {
            out.push_str(&" ".repeat(GRID_ROWS.abs_diff(y + SIDE_LENGTH)));
            out.push_str(&format!("{:>2} ", y + 1));
            for x in 0..GRID_ROWS {
                if !on_board(x as i32, y as i32) {
                    continue;
                }
                let cell = Cell::from_xy(x, y);
                let glyph = if self.players[Player::White.index()].stones.contains(cell) {
                    'O'
                } else if self.players[Player::Black.index()].stones.contains(cell) {
                    'X'
                } else {
                    '.'
                };
                out.push(glyph);
                out.push(' ');
            }
            out.push('\n');
        }
        out.push_str("    ");
        for x in 0..GRID_ROWS {
            out.push((b'a' + x as u8) as char);
            out.push(' ');
        }
        out.push('\n');
        out
    }
}

/// True when the mask rings at least one cell: either some cell outside the
/// mask cannot reach the board border, or some mask cell is completely
/// surrounded by the mask (a ring filled with own stones still counts).
fn encloses_cell(mask: &BoardBitmask) -> bool {
    for cell in mask.iter() {
        if neighbors(cell).count() == 6 && mask.count_neighbors(cell.x(), cell.y()) == 6 {
            return true;
        }
    }
    let mut visited = *mask;
    let mut stack: Vec<Cell> = Vec::with_capacity(NUM_CELLS);
    for m in MoveIndex::all() {
        let cell = crate::board::move_index_to_cell(m);
        if neighbors(cell).count() < 6 && !visited.contains(cell) {
            visited.insert(cell);
            stack.push(cell);
        }
    }
    while let Some(cell) = stack.pop() {
        for n in neighbors(cell) {
            if !visited.contains(n) {
                visited.insert(n);
                stack.push(n);
            }
        }
    }
    visited.count() < NUM_CELLS
}

/// A near-complete ring: `cost` stones on the listed empty cells close it.
#[derive(Clone, Debug)]
pub struct RingFrame {
    pub cost: u8,
    pub cells: SmallVec<[Cell; 6]>,
}

/// Enumerates minimal ring templates for `player`: each cell whose full
/// neighborhood is on the board and free of opponent stones yields a frame
/// over the empty neighbors.
pub fn ring_frames(pp: &PlayerPosition, opponent: &PlayerPosition) -> Vec<RingFrame> {
    let mut frames = Vec::new();
    for m in MoveIndex::all() {
        let center = crate::board::move_index_to_cell(m);
        let (x, y) = (center.x() as i32, center.y() as i32);
        if crate::board::NEIGHBOR_OFFSETS
            .iter()
            .any(|&(dx, dy)| !on_board(x + dx, y + dy))
        {
            continue;
        }
        let mut cells: SmallVec<[Cell; 6]> = SmallVec::new();
        let mut blocked = false;
        for n in neighbors(center) {
            if opponent.stones.contains(n) {
                blocked = true;
                break;
            }
            if !pp.stones.contains(n) {
                cells.push(n);
            }
        }
        if blocked || cells.is_empty() {
            continue;
        }
        frames.push(RingFrame {
            cost: cells.len() as u8,
            cells,
        });
    }
    frames
}
