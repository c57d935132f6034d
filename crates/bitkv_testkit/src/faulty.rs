//! Failure injection for stores.
//!
//! [`FaultyStore`] wraps any [`KvStore`] and fails reads or writes on
//! demand, so tests can check that a failed commit leaves nothing behind.

use bitkv_storage::{ColumnFamily, KvStore, Snapshot, StorageError, StorageResult, WriteBatch};
use std::io;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// A store wrapper that injects storage errors.
pub struct FaultyStore {
    inner: Arc<dyn KvStore>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    closed: AtomicBool,
    rejected_writes: AtomicU64,
}

impl FaultyStore {
    /// Wraps `inner`, initially passing everything through.
    pub fn new(inner: Arc<dyn KvStore>) -> Self {
        Self {
            inner,
            fail_reads: AtomicBool::new(false),
            fail_writes: AtomicBool::new(false),
            closed: AtomicBool::new(false),
            rejected_writes: AtomicU64::new(0),
        }
    }

    /// Makes every read fail with an I/O error.
    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Makes every write fail with an I/O error before reaching the store.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Makes every operation fail with `Closed`.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    /// Number of write batches rejected so far.
    pub fn rejected_writes(&self) -> u64 {
        self.rejected_writes.load(Ordering::SeqCst)
    }

    fn check(&self, failing: &AtomicBool, what: &str) -> StorageResult<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(StorageError::Closed);
        }
        if failing.load(Ordering::SeqCst) {
            return Err(StorageError::Io(io::Error::other(format!("injected {what} failure"))));
        }
        Ok(())
    }
}

impl KvStore for FaultyStore {
    fn get(
        &self,
        cf: ColumnFamily,
        key: &[u8],
        snapshot: Option<&Snapshot>,
    ) -> StorageResult<Option<Vec<u8>>> {
        self.check(&self.fail_reads, "read")?;
        self.inner.get(cf, key, snapshot)
    }

    fn write(&self, batch: WriteBatch) -> StorageResult<()> {
        if let Err(err) = self.check(&self.fail_writes, "write") {
            self.rejected_writes.fetch_add(1, Ordering::SeqCst);
            return Err(err);
        }
        self.inner.write(batch)
    }

    fn snapshot(&self) -> Snapshot {
        self.inner.snapshot()
    }

    fn scan_prefix(
        &self,
        cf: ColumnFamily,
        prefix: &[u8],
        snapshot: Option<&Snapshot>,
    ) -> StorageResult<Vec<(Vec<u8>, Vec<u8>)>> {
        self.check(&self.fail_reads, "read")?;
        self.inner.scan_prefix(cf, prefix, snapshot)
    }
}
