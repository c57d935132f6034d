//! Point-in-time read views.

use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Sequence number for ordering committed batches.
///
/// Every committed batch gets the next sequence number; all entries in one
/// batch share it. Higher sequence numbers indicate later commits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct SequenceNumber(pub u64);

impl SequenceNumber {
    /// Creates a new sequence number.
    #[must_use]
    pub const fn new(seq: u64) -> Self {
        Self(seq)
    }

    /// Returns the raw sequence value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Returns the next sequence number.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for SequenceNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "seq:{}", self.0)
    }
}

/// Registry of sequence numbers pinned by live snapshots.
#[derive(Debug, Default)]
pub(crate) struct SnapshotList {
    pinned: Mutex<BTreeMap<SequenceNumber, usize>>,
}

impl SnapshotList {
    pub(crate) fn pin(self: &Arc<Self>, seq: SequenceNumber) -> Snapshot {
        *self.pinned.lock().entry(seq).or_insert(0) += 1;
        Snapshot {
            seq,
            list: Some(Arc::clone(self)),
        }
    }

    fn release(&self, seq: SequenceNumber) {
        let mut pinned = self.pinned.lock();
        if let Some(count) = pinned.get_mut(&seq) {
            *count -= 1;
            if *count == 0 {
                pinned.remove(&seq);
            }
        }
    }

    /// Oldest sequence number still observable through a snapshot.
    pub(crate) fn oldest(&self) -> Option<SequenceNumber> {
        self.pinned.lock().keys().next().copied()
    }

    pub(crate) fn live(&self) -> usize {
        self.pinned.lock().values().sum()
    }
}

/// A consistent read view of a store.
///
/// Reads through a snapshot only observe batches committed at or before
/// [`Snapshot::sequence`]. The view is released when the handle is dropped.
pub struct Snapshot {
    seq: SequenceNumber,
    list: Option<Arc<SnapshotList>>,
}

impl Snapshot {
    /// Creates a snapshot handle that does not pin any store state.
    ///
    /// Intended for [`crate::KvStore`] implementations that keep every
    /// version or that delegate reads to another store.
    #[must_use]
    pub fn unpinned(seq: SequenceNumber) -> Self {
        Self { seq, list: None }
    }

    /// Sequence number of the last batch visible through this snapshot.
    #[must_use]
    pub fn sequence(&self) -> SequenceNumber {
        self.seq
    }
}

impl fmt::Debug for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Snapshot")
            .field("seq", &self.seq)
            .field("pinned", &self.list.is_some())
            .finish()
    }
}

impl Drop for Snapshot {
    fn drop(&mut self) {
        if let Some(list) = self.list.take() {
            list.release(self.seq);
        }
    }
}
