//! Board geometry for hexagonal Havannah boards
//!
//! Cells live on an axial grid: `(x, y)` with `0 <= x, y < GRID_ROWS` is
//! playable when `|x - y| <= SIDE_LENGTH - 1`. The six neighbors of a cell
//! are `(x±1, y)`, `(x, y±1)`, `(x+1, y+1)` and `(x-1, y-1)`.

mod bitmask;
mod zobrist;

pub use bitmask::{in_mask_or_twice_adjacent, BoardBitmask};
pub use zobrist::{modify_zobrist_hash, zobrist_key};

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

use lazy_static::lazy_static;

/// Side length of the board. Havannah base 8.
pub const SIDE_LENGTH: usize = 8;

/// Number of rows (and columns) of the axial grid.
pub const GRID_ROWS: usize = 2 * SIDE_LENGTH - 1;

/// Number of playable cells: 3s² - 3s + 1.
pub const NUM_CELLS: usize = 3 * SIDE_LENGTH * SIDE_LENGTH - 3 * SIDE_LENGTH + 1;

/// Upper bound on packed cell codes, used to size per-cell lookup tables.
pub const CELL_CODES: usize = 256;

/// The six neighbor offsets in cyclic order; consecutive entries are
/// themselves adjacent around the center cell.
pub const NEIGHBOR_OFFSETS: [(i32, i32); 6] =
    [(1, 0), (1, 1), (0, 1), (-1, 0), (-1, -1), (0, -1)];

/// The six corner cells in rotation order.
pub const CORNERS: [(usize, usize); 6] = [
    (0, 0),
    (0, SIDE_LENGTH - 1),
    (SIDE_LENGTH - 1, GRID_ROWS - 1),
    (GRID_ROWS - 1, GRID_ROWS - 1),
    (GRID_ROWS - 1, SIDE_LENGTH - 1),
    (SIDE_LENGTH - 1, 0),
];

/// True when `(x, y)` is a playable cell.
#[inline]
pub fn on_board(x: i32, y: i32) -> bool {
    x >= 0
        && y >= 0
        && (x as usize) < GRID_ROWS
        && (y as usize) < GRID_ROWS
        && (x - y).unsigned_abs() as usize <= SIDE_LENGTH - 1
}

/// One of the two players.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
#[repr(u8)]
pub enum Player {
    White = 0,
    Black = 1,
}

impl Player {
    /// The other player.
    #[inline]
    pub fn opponent(self) -> Player {
        match self {
            Player::White => Player::Black,
            Player::Black => Player::White,
        }
    }

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Player::White => write!(f, "white"),
            Player::Black => write!(f, "black"),
        }
    }
}

/// A board location packed into 16 bits.
///
/// Playable cells have positive codes `((y + 1) << 4) | (x + 1)`. The value
/// zero is the distinguished pass/none cell. Negative values name virtual
/// chains: `-1..=-6` the six edge chains, `-7..=-12` the six corner chains.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default)]
pub struct Cell(pub i16);

impl Cell {
    /// The pass/none cell.
    pub const PASS: Cell = Cell(0);

    /// Packs board coordinates into a cell.
    #[inline]
    pub fn from_xy(x: usize, y: usize) -> Cell {
        debug_assert!(on_board(x as i32, y as i32));
        Cell((((y + 1) << 4) | (x + 1)) as i16)
    }

    /// The virtual chain of edge `i`.
    #[inline]
    pub fn edge_chain(i: usize) -> Cell {
        debug_assert!(i < 6);
        Cell(-(i as i16) - 1)
    }

    /// The virtual chain of corner `i`.
    #[inline]
    pub fn corner_chain(i: usize) -> Cell {
        debug_assert!(i < 6);
        Cell(-(i as i16) - 7)
    }

    /// True for playable board cells.
    #[inline]
    pub fn is_board(self) -> bool {
        self.0 > 0
    }

    #[inline]
    pub fn x(self) -> usize {
        debug_assert!(self.is_board());
        (self.0 as usize & 0xf) - 1
    }

    #[inline]
    pub fn y(self) -> usize {
        debug_assert!(self.is_board());
        (self.0 as usize >> 4) - 1
    }

    /// Packed code, used to index per-cell tables.
    #[inline]
    pub fn code(self) -> usize {
        debug_assert!(self.is_board());
        self.0 as usize
    }

    /// The cell rotated by 60 degrees around the board center.
    pub fn rotated(self) -> Cell {
        let (x, y) = (self.x() as i32, self.y() as i32);
        let m = (SIDE_LENGTH - 1) as i32;
        Cell::from_xy(y as usize, (y - x + m) as usize)
    }
}

/// A dense index over playable cells, `0..NUM_CELLS`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct MoveIndex(pub u16);

impl MoveIndex {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// Iterates every move index.
    pub fn all() -> impl Iterator<Item = MoveIndex> {
        (0..NUM_CELLS as u16).map(MoveIndex)
    }
}

struct Geometry {
    cell_to_move: [u16; CELL_CODES],
    move_to_cell: [Cell; NUM_CELLS],
    edge_masks: [BoardBitmask; 6],
    corner_masks: [BoardBitmask; 6],
}

const NO_MOVE: u16 = u16::MAX;

impl Geometry {
    fn new() -> Geometry {
        let mut cell_to_move = [NO_MOVE; CELL_CODES];
        let mut move_to_cell = [Cell::PASS; NUM_CELLS];
        let mut next = 0u16;
        for y in 0..GRID_ROWS {
            for x in 0..GRID_ROWS {
                if on_board(x as i32, y as i32) {
                    let cell = Cell::from_xy(x, y);
                    cell_to_move[cell.code()] = next;
                    move_to_cell[next as usize] = cell;
                    next += 1;
                }
            }
        }
        debug_assert_eq!(next as usize, NUM_CELLS);

        let mut edge_masks = [BoardBitmask::default(); 6];
        let mut corner_masks = [BoardBitmask::default(); 6];
        for (i, &(x, y)) in CORNERS.iter().enumerate() {
            corner_masks[i].set(x, y);
        }
        for y in 0..GRID_ROWS {
            for x in 0..GRID_ROWS {
                if !on_board(x as i32, y as i32) {
                    continue;
                }
                if let Some(e) = edge_index_of(x, y) {
                    edge_masks[e].set(x, y);
                }
            }
        }
        Geometry {
            cell_to_move,
            move_to_cell,
            edge_masks,
            corner_masks,
        }
    }
}

lazy_static! {
    static ref GEOMETRY: Geometry = Geometry::new();
}

/// The edge a border cell belongs to, if any. Corners are not edge cells.
pub fn edge_index_of(x: usize, y: usize) -> Option<usize> {
    let s = SIDE_LENGTH - 1;
    let last = GRID_ROWS - 1;
    if x == 0 && y >= 1 && y < s {
        Some(0)
    } else if y == x + s && x >= 1 && x < s {
        Some(1)
    } else if y == last && x > s && x < last {
        Some(2)
    } else if x == last && y > s && y < last {
        Some(3)
    } else if x == y + s && x > s && x < last {
        Some(4)
    } else if y == 0 && x >= 1 && x < s {
        Some(5)
    } else {
        None
    }
}

/// The corner index of a cell, if it is one of the six corners.
pub fn corner_index_of(x: usize, y: usize) -> Option<usize> {
    CORNERS.iter().position(|&c| c == (x, y))
}

/// Mask of the cells of edge `i`.
#[inline]
pub fn edge_mask(i: usize) -> &'static BoardBitmask {
    &GEOMETRY.edge_masks[i]
}

/// Mask of the cell of corner `i`.
#[inline]
pub fn corner_mask(i: usize) -> &'static BoardBitmask {
    &GEOMETRY.corner_masks[i]
}

/// Dense move index of a playable cell.
#[inline]
pub fn cell_to_move_index(cell: Cell) -> MoveIndex {
    let m = GEOMETRY.cell_to_move[cell.code()];
    debug_assert_ne!(m, NO_MOVE);
    MoveIndex(m)
}

/// The playable cell of a dense move index.
#[inline]
pub fn move_index_to_cell(m: MoveIndex) -> Cell {
    GEOMETRY.move_to_cell[m.index()]
}

/// The on-board neighbors of a cell, in cyclic order.
pub fn neighbors(cell: Cell) -> impl Iterator<Item = Cell> {
    let (x, y) = (cell.x() as i32, cell.y() as i32);
    NEIGHBOR_OFFSETS.iter().filter_map(move |&(dx, dy)| {
        if on_board(x + dx, y + dy) {
            Some(Cell::from_xy((x + dx) as usize, (y + dy) as usize))
        } else {
            None
        }
    })
}

// Process-wide coordinate-rendering latch. It is only flipped from the
// single-threaded command loop, never concurrently with rendering.
static USE_LG_COORDINATES: AtomicBool = AtomicBool::new(false);

/// Selects between the default and the Little Golem naming convention.
pub fn set_lg_coordinates(enabled: bool) {
    USE_LG_COORDINATES.store(enabled, Ordering::Relaxed);
}

/// Current coordinate-rendering convention.
pub fn lg_coordinates() -> bool {
    USE_LG_COORDINATES.load(Ordering::Relaxed)
}

/// First valid row of column `x`.
#[inline]
fn column_base(x: usize) -> usize {
    x.saturating_sub(SIDE_LENGTH - 1)
}

/// Renders a cell name under the current convention.
pub fn cell_name(cell: Cell) -> String {
    cell_name_with(cell, lg_coordinates())
}

/// Renders a cell name under an explicit convention.
pub fn cell_name_with(cell: Cell, lg: bool) -> String {
    debug_assert!(cell.is_board());
    let (x, y) = (cell.x(), cell.y());
    if lg {
        format!("{}{}", (b'a' + x as u8) as char, y - column_base(x) + 1)
    } else {
        format!("{}{}", (b'a' + x as u8) as char, y + 1)
    }
}

/// Parses a cell name under the current convention.
pub fn parse_cell(name: &str) -> Option<Cell> {
    parse_cell_with(name, lg_coordinates())
}

/// Parses a cell name under an explicit convention.
pub fn parse_cell_with(name: &str, lg: bool) -> Option<Cell> {
    let mut chars = name.chars();
    let letter = chars.next()?;
    if !letter.is_ascii_lowercase() {
        return None;
    }
    let x = (letter as u8 - b'a') as usize;
    let rest = chars.as_str();
    if rest.is_empty() || !rest.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let number: usize = rest.parse().ok()?;
    if number == 0 || x >= GRID_ROWS {
        return None;
    }
    let y = if lg {
        column_base(x) + number - 1
    } else {
        number - 1
    };
    if on_board(x as i32, y as i32) {
        Some(Cell::from_xy(x, y))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cell_count_matches_geometry() {
        let count = (0..GRID_ROWS)
            .flat_map(|y| (0..GRID_ROWS).map(move |x| (x, y)))
            .filter(|&(x, y)| on_board(x as i32, y as i32))
            .count();
        assert_eq!(count, NUM_CELLS);
    }

    #[test]
    fn move_index_roundtrip() {
        for m in MoveIndex::all() {
            let cell = move_index_to_cell(m);
            assert!(cell.is_board());
            assert_eq!(cell_to_move_index(cell), m);
        }
    }

    #[test]
    fn corners_are_valid_and_distinct() {
        for (i, &(x, y)) in CORNERS.iter().enumerate() {
            assert!(on_board(x as i32, y as i32));
            assert_eq!(corner_index_of(x, y), Some(i));
            assert_eq!(edge_index_of(x, y), None);
        }
    }

    #[test]
    fn every_edge_has_side_minus_two_cells() {
        for i in 0..6 {
            assert_eq!(edge_mask(i).count(), SIDE_LENGTH - 2);
        }
    }

    #[test]
    fn rotation_permutes_the_board() {
        let mut seen = std::collections::HashSet::new();
        for m in MoveIndex::all() {
            let r = move_index_to_cell(m).rotated();
            assert!(r.is_board());
            assert!(seen.insert(r));
        }
        assert_eq!(seen.len(), NUM_CELLS);
    }

    #[test]
    fn rotation_maps_edges_and_corners_cyclically() {
        for i in 0..6 {
            let (x, y) = CORNERS[i];
            let r = Cell::from_xy(x, y).rotated();
            assert_eq!(corner_index_of(r.x(), r.y()), Some((i + 1) % 6));
        }
        for i in 0..6 {
            for y in 0..GRID_ROWS {
                for x in 0..GRID_ROWS {
                    if on_board(x as i32, y as i32) && edge_index_of(x, y) == Some(i) {
                        let r = Cell::from_xy(x, y).rotated();
                        assert_eq!(edge_index_of(r.x(), r.y()), Some((i + 1) % 6));
                    }
                }
            }
        }
    }

    #[test]
    fn neighbors_are_mutual() {
        for m in MoveIndex::all() {
            let cell = move_index_to_cell(m);
            for n in neighbors(cell) {
                assert!(neighbors(n).any(|b| b == cell));
            }
        }
    }

    #[test]
    fn names_roundtrip_in_both_conventions() {
        for lg in [false, true] {
            for m in MoveIndex::all() {
                let cell = move_index_to_cell(m);
                assert_eq!(parse_cell_with(&cell_name_with(cell, lg), lg), Some(cell));
            }
        }
    }

    #[test]
    fn bad_names_are_rejected() {
        for name in ["", "a", "1", "a0", "z1", "a99", "A1", "a1x"] {
            assert_eq!(parse_cell_with(name, false), None, "{name:?} should not parse");
        }
    }
}
