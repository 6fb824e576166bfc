//! Append-only arena of scored-move lists
//!
//! Transposition-table records refer to move lists by integer id, which
//! keeps the packed value word pointer-free. Id zero is reserved to mean
//! "not yet expanded". Lists are checked out by value while a node works on
//! them, so a recursive call that touches the arena never aliases one.

use super::CellEval;

pub struct MoveArena {
    vectors: Vec<Vec<CellEval>>,
}

impl MoveArena {
    pub fn new() -> MoveArena {
        let mut vectors = Vec::with_capacity(1 << 20);
        vectors.push(Vec::new());
        MoveArena { vectors }
    }

    /// Allocates a fresh empty list and returns its id.
    pub fn alloc(&mut self) -> u32 {
        let id = self.vectors.len() as u32;
        self.vectors.push(Vec::new());
        id
    }

    /// Number of lists, including the reserved null entry.
    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.len() <= 1
    }

    /// Borrows a list for reading.
    pub fn get(&self, id: u32) -> &[CellEval] {
        &self.vectors[id as usize]
    }

    /// Takes a list out of the arena, leaving an empty one in its place.
    pub fn checkout(&mut self, id: u32) -> Vec<CellEval> {
        debug_assert_ne!(id, 0);
        std::mem::take(&mut self.vectors[id as usize])
    }

    /// Puts a checked-out list back.
    pub fn restore(&mut self, id: u32, moves: Vec<CellEval>) {
        debug_assert_ne!(id, 0);
        self.vectors[id as usize] = moves;
    }
}

impl Default for MoveArena {
    fn default() -> Self {
        Self::new()
    }
}
