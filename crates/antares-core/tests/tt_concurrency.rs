//! Concurrent hammering of the wait-free transposition table

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread;

use antares_core::search::{Kind, SearchRecord, TranspositionTable};

#[test]
fn concurrent_inserts_of_distinct_keys_all_land() {
    let tt = Arc::new(TranspositionTable::new(12));
    let num_threads = 4;
    let per_thread = 200u64;

    let mut handles = Vec::new();
    for thread_id in 0..num_threads {
        let tt = Arc::clone(&tt);
        handles.push(thread::spawn(move || {
            for i in 0..per_thread {
                let hash = (thread_id as u64) << 32 | i * 7919;
                let cell = tt.insert(hash).expect("table is far from full");
                cell.store(
                    SearchRecord {
                        value: thread_id as i16,
                        kind: Kind::Exact,
                        depth: i as u16,
                        moves_index: 1 + i as u32,
                    }
                    .pack(),
                    Ordering::Relaxed,
                );
                let read = tt.load(hash).expect("just inserted");
                assert_eq!(read.moves_index, 1 + i as u32);
            }
        }));
    }
    for handle in handles {
        handle.join().expect("worker finished");
    }
    assert_eq!(
        tt.num_elements(),
        num_threads as usize * per_thread as usize
    );
}

#[test]
fn racing_writers_on_one_key_never_tear_the_record() {
    let tt = Arc::new(TranspositionTable::new(8));
    let hash = 0x0123_4567_89ab_cdef;
    tt.insert(hash).unwrap();

    let mut handles = Vec::new();
    for thread_id in 0i16..4 {
        let tt = Arc::clone(&tt);
        handles.push(thread::spawn(move || {
            for i in 0..500u16 {
                let cell = tt.insert(hash).expect("slot exists");
                // Each writer stores a self-consistent record.
                cell.store(
                    SearchRecord {
                        value: thread_id * 1000 + i as i16,
                        kind: Kind::Beta,
                        depth: i,
                        moves_index: (thread_id as u32) << 16 | i as u32,
                    }
                    .pack(),
                    Ordering::Relaxed,
                );
                let read = tt.load(hash).expect("present");
                // The value word is a single atomic, so whatever writer won,
                // the fields must belong together.
                let writer = (read.moves_index >> 16) as i16;
                let iteration = (read.moves_index & 0xFFFF) as u16;
                assert_eq!(read.depth, iteration);
                assert_eq!(read.value, writer * 1000 + iteration as i16);
            }
        }));
    }
    for handle in handles {
        handle.join().expect("worker finished");
    }
    assert_eq!(tt.num_elements(), 1);
}
