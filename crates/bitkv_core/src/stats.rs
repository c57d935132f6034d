//! Database statistics.
//!
//! Provides counters for monitoring bitmap traffic.
//!
//! # Usage
//!
//! ```rust
//! use bitkv_core::Database;
//!
//! let db = Database::open_in_memory().unwrap();
//! db.bitmap().set_bit(b"visits", 7, true).unwrap();
//!
//! let stats = db.stats().snapshot();
//! assert_eq!(stats.bit_writes, 1);
//! assert_eq!(stats.batches_committed, 1);
//! ```

use std::sync::atomic::{AtomicU64, Ordering};

/// Database statistics and metrics.
///
/// All counters are atomic and can be read while operations are in progress.
/// Values are monotonically increasing.
#[derive(Debug, Default)]
pub struct DatabaseStats {
    /// Single-bit reads.
    bit_reads: AtomicU64,
    /// Single-bit writes.
    bit_writes: AtomicU64,
    /// Range scans (count and position searches).
    range_scans: AtomicU64,
    /// Segment reads issued to the store.
    segment_fetches: AtomicU64,
    /// Segment reads that found nothing.
    segments_missing: AtomicU64,
    /// Write batches committed.
    batches_committed: AtomicU64,
    /// Key and value bytes written.
    bytes_written: AtomicU64,
    /// Key operations (delete, expire, persist).
    key_ops: AtomicU64,
    /// Failed operations.
    errors: AtomicU64,
}

impl DatabaseStats {
    /// Creates a new stats instance.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_bit_read(&self) {
        self.bit_reads.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_bit_write(&self) {
        self.bit_writes.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_range_scan(&self) {
        self.range_scans.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_segment_fetch(&self, found: bool) {
        self.segment_fetches.fetch_add(1, Ordering::Relaxed);
        if !found {
            self.segments_missing.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub(crate) fn record_commit(&self, bytes: u64) {
        self.batches_committed.fetch_add(1, Ordering::Relaxed);
        self.bytes_written.fetch_add(bytes, Ordering::Relaxed);
    }

    pub(crate) fn record_key_op(&self) {
        self.key_ops.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns the number of single-bit reads.
    pub fn bit_reads(&self) -> u64 {
        self.bit_reads.load(Ordering::Relaxed)
    }

    /// Returns the number of single-bit writes.
    pub fn bit_writes(&self) -> u64 {
        self.bit_writes.load(Ordering::Relaxed)
    }

    /// Returns the number of range scans.
    pub fn range_scans(&self) -> u64 {
        self.range_scans.load(Ordering::Relaxed)
    }

    /// Returns the number of segment reads issued to the store.
    pub fn segment_fetches(&self) -> u64 {
        self.segment_fetches.load(Ordering::Relaxed)
    }

    /// Returns the number of segment reads that found no segment.
    pub fn segments_missing(&self) -> u64 {
        self.segments_missing.load(Ordering::Relaxed)
    }

    /// Returns the number of committed write batches.
    pub fn batches_committed(&self) -> u64 {
        self.batches_committed.load(Ordering::Relaxed)
    }

    /// Returns the total key and value bytes written.
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written.load(Ordering::Relaxed)
    }

    /// Returns the number of key operations.
    pub fn key_ops(&self) -> u64 {
        self.key_ops.load(Ordering::Relaxed)
    }

    /// Returns the number of failed operations.
    pub fn errors(&self) -> u64 {
        self.errors.load(Ordering::Relaxed)
    }

    /// Returns a snapshot of all stats.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            bit_reads: self.bit_reads(),
            bit_writes: self.bit_writes(),
            range_scans: self.range_scans(),
            segment_fetches: self.segment_fetches(),
            segments_missing: self.segments_missing(),
            batches_committed: self.batches_committed(),
            bytes_written: self.bytes_written(),
            key_ops: self.key_ops(),
            errors: self.errors(),
        }
    }
}

/// A point-in-time copy of database statistics.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StatsSnapshot {
    /// Single-bit reads.
    pub bit_reads: u64,
    /// Single-bit writes.
    pub bit_writes: u64,
    /// Range scans.
    pub range_scans: u64,
    /// Segment reads issued to the store.
    pub segment_fetches: u64,
    /// Segment reads that found nothing.
    pub segments_missing: u64,
    /// Write batches committed.
    pub batches_committed: u64,
    /// Key and value bytes written.
    pub bytes_written: u64,
    /// Key operations.
    pub key_ops: u64,
    /// Failed operations.
    pub errors: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_stats_are_zero() {
        let stats = DatabaseStats::new();
        assert_eq!(stats.snapshot(), StatsSnapshot::default());
    }

    #[test]
    fn segment_fetches_track_misses() {
        let stats = DatabaseStats::new();
        stats.record_segment_fetch(true);
        stats.record_segment_fetch(false);
        stats.record_segment_fetch(false);

        assert_eq!(stats.segment_fetches(), 3);
        assert_eq!(stats.segments_missing(), 2);
    }

    #[test]
    fn commits_accumulate_bytes() {
        let stats = DatabaseStats::new();
        stats.record_commit(100);
        stats.record_commit(28);

        let snap = stats.snapshot();
        assert_eq!(snap.batches_committed, 2);
        assert_eq!(snap.bytes_written, 128);
    }

    #[test]
    fn concurrent_updates() {
        use std::sync::Arc;
        use std::thread;

        let stats = Arc::new(DatabaseStats::new());
        let mut handles = vec![];

        for _ in 0..10 {
            let s = Arc::clone(&stats);
            handles.push(thread::spawn(move || {
                for _ in 0..100 {
                    s.record_bit_read();
                    s.record_bit_write();
                }
            }));
        }

        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(stats.bit_reads(), 1000);
        assert_eq!(stats.bit_writes(), 1000);
    }
}
