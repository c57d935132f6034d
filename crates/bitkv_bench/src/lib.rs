//! Benchmark utilities.

#![deny(unsafe_code)]
#![warn(missing_docs)]

use bitkv_core::Database;
use rand::Rng;

/// Generate random bytes of the specified size.
pub fn random_data(size: usize) -> Vec<u8> {
    let mut rng = rand::thread_rng();
    (0..size).map(|_| rng.gen()).collect()
}

/// Generate `count` random bit offsets below `max`.
pub fn random_offsets(count: usize, max: u64) -> Vec<u64> {
    let mut rng = rand::thread_rng();
    (0..count).map(|_| rng.gen_range(0..max)).collect()
}

/// Fills `key` with `bits` random set bits below `max`.
pub fn populate(db: &Database, key: &[u8], bits: usize, max: u64) {
    for offset in random_offsets(bits, max) {
        db.bitmap()
            .set_bit(key, offset, true)
            .expect("Failed to set bit");
    }
}
