//! Wait-free transposition table
//!
//! Open-addressed with linear probing and a bounded probe run. Each slot is
//! two words: the key word (hash plus one, so the zero sentinel can never
//! collide with the root hash of zero) and the packed value word. The value
//! word is read and written with single atomic operations, so readers never
//! observe a torn record.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

// Bit layout of the packed value word:
// [15-0]:  value (16 bits, two's complement)
// [17-16]: kind (2 bits)
// [31-18]: depth (14 bits)
// [63-32]: arena id of the move list (32 bits)
const VALUE_MASK: u64 = 0xFFFF;
const KIND_SHIFT: u8 = 16;
const KIND_MASK: u64 = 0x3;
const DEPTH_SHIFT: u8 = 18;
const DEPTH_MASK: u64 = 0x3FFF;
const MOVES_SHIFT: u8 = 32;

/// Longest tolerated probe run before a lookup gives up. Keeps every
/// operation wait-free and makes insertion failure the saturation signal.
const MAX_PROBES: usize = 256;

/// How a stored value relates to the bounds it was searched with.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[repr(u8)]
pub enum Kind {
    Exact = 0,
    Alpha = 1,
    Beta = 2,
}

/// One packed search result.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct SearchRecord {
    pub value: i16,
    pub kind: Kind,
    pub depth: u16,
    pub moves_index: u32,
}

impl SearchRecord {
    pub fn pack(self) -> u64 {
        (self.value as u16 as u64)
            | ((self.kind as u64 & KIND_MASK) << KIND_SHIFT)
            | ((self.depth as u64 & DEPTH_MASK) << DEPTH_SHIFT)
            | ((self.moves_index as u64) << MOVES_SHIFT)
    }

    pub fn unpack(word: u64) -> SearchRecord {
        let kind = match (word >> KIND_SHIFT) & KIND_MASK {
            0 => Kind::Exact,
            1 => Kind::Alpha,
            2 => Kind::Beta,
            raw => {
                debug_assert!(false, "corrupted kind bits: {raw}");
                Kind::Exact
            }
        };
        SearchRecord {
            value: (word & VALUE_MASK) as u16 as i16,
            kind,
            depth: ((word >> DEPTH_SHIFT) & DEPTH_MASK) as u16,
            moves_index: (word >> MOVES_SHIFT) as u32,
        }
    }
}

/// Fixed-capacity concurrent hash map from Zobrist hashes to search records.
pub struct TranspositionTable {
    keys: Vec<AtomicU64>,
    values: Vec<AtomicU64>,
    mask: usize,
    len: AtomicUsize,
}

impl TranspositionTable {
    /// Allocates a table with `1 << log2_entries` slots.
    pub fn new(log2_entries: u32) -> TranspositionTable {
        let capacity = 1usize << log2_entries;
        let mut keys = Vec::with_capacity(capacity);
        let mut values = Vec::with_capacity(capacity);
        keys.resize_with(capacity, || AtomicU64::new(0));
        values.resize_with(capacity, || AtomicU64::new(0));
        TranspositionTable {
            keys,
            values,
            mask: capacity - 1,
            len: AtomicUsize::new(0),
        }
    }

    /// The value cell of `hash`, if present.
    pub fn find(&self, hash: u64) -> Option<&AtomicU64> {
        let stored = hash.wrapping_add(1);
        let mut slot = (hash as usize) & self.mask;
        for _ in 0..MAX_PROBES.min(self.mask + 1) {
            let key = self.keys[slot].load(Ordering::Relaxed);
            if key == 0 {
                return None;
            }
            if key == stored {
                return Some(&self.values[slot]);
            }
            slot = (slot + 1) & self.mask;
        }
        None
    }

    /// The value cell of `hash`, claiming a slot when absent. Two racing
    /// inserts of the same hash land on the same slot; `None` means the
    /// probe run is saturated and the caller should skip caching.
    pub fn insert(&self, hash: u64) -> Option<&AtomicU64> {
        let stored = hash.wrapping_add(1);
        let mut slot = (hash as usize) & self.mask;
        for _ in 0..MAX_PROBES.min(self.mask + 1) {
            let key = self.keys[slot].load(Ordering::Relaxed);
            if key == stored {
                return Some(&self.values[slot]);
            }
            if key == 0 {
                match self.keys[slot].compare_exchange(
                    0,
                    stored,
                    Ordering::Relaxed,
                    Ordering::Relaxed,
                ) {
                    Ok(_) => {
                        self.len.fetch_add(1, Ordering::Relaxed);
                        return Some(&self.values[slot]);
                    }
                    Err(winner) if winner == stored => return Some(&self.values[slot]),
                    Err(_) => {}
                }
            }
            slot = (slot + 1) & self.mask;
        }
        None
    }

    /// Loads the record of `hash`, if present.
    pub fn load(&self, hash: u64) -> Option<SearchRecord> {
        self.find(hash)
            .map(|cell| SearchRecord::unpack(cell.load(Ordering::Relaxed)))
    }

    /// Approximate number of stored entries, for logging only.
    pub fn num_elements(&self) -> usize {
        self.len.load(Ordering::Relaxed)
    }
}
