//! Zobrist keys for position hashing
//!
//! One 64-bit key per (player, move index) pair, generated from a fixed seed
//! so hashes are reproducible across runs.

use lazy_static::lazy_static;
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;

use super::{MoveIndex, Player, NUM_CELLS};

struct ZobristTable {
    keys: [[u64; NUM_CELLS]; 2],
}

impl ZobristTable {
    fn new() -> ZobristTable {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(0x5eed_ba5e_ca11_ab1e);
        let mut keys = [[0u64; NUM_CELLS]; 2];
        for side in keys.iter_mut() {
            for key in side.iter_mut() {
                *key = rng.random();
            }
        }
        ZobristTable { keys }
    }
}

lazy_static! {
    static ref ZOBRIST: ZobristTable = ZobristTable::new();
}

/// The key of a (player, move index) pair.
#[inline]
pub fn zobrist_key(player: Player, m: MoveIndex) -> u64 {
    ZOBRIST.keys[player.index()][m.index()]
}

/// Toggles a stone in the hash. XOR makes this an involution.
#[inline]
pub fn modify_zobrist_hash(hash: u64, player: Player, m: MoveIndex) -> u64 {
    hash ^ zobrist_key(player, m)
}
