//! In-memory multi-version store.

use crate::batch::{BatchOp, WriteBatch};
use crate::error::StorageResult;
use crate::snapshot::{SequenceNumber, Snapshot, SnapshotList};
use crate::store::{ColumnFamily, KvStore};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::Arc;

/// One committed version of a key. `None` marks a delete.
#[derive(Debug, Clone)]
struct Version {
    seq: SequenceNumber,
    value: Option<Vec<u8>>,
}

#[derive(Debug, Default)]
struct Inner {
    entries: BTreeMap<(ColumnFamily, Vec<u8>), Vec<Version>>,
    last_seq: SequenceNumber,
}

/// An in-memory, multi-version key-value store.
///
/// Every committed batch is stamped with one sequence number. Older versions
/// of a key are kept only while a live [`Snapshot`] can still observe them,
/// so memory use tracks the live data plus whatever readers have pinned.
///
/// This store is suitable for:
/// - Unit tests
/// - Integration tests
/// - Ephemeral databases that don't need persistence
///
/// # Thread Safety
///
/// This store is thread-safe and can be shared across threads.
///
/// # Example
///
/// ```rust
/// use bitkv_storage::{ColumnFamily, InMemoryStore, KvStore, WriteBatch};
///
/// let store = InMemoryStore::new();
/// let snap = store.snapshot();
///
/// let mut batch = WriteBatch::new();
/// batch.put(ColumnFamily::Metadata, b"k".to_vec(), b"v".to_vec());
/// store.write(batch).unwrap();
///
/// assert!(store.get(ColumnFamily::Metadata, b"k", Some(&snap)).unwrap().is_none());
/// assert!(store.get(ColumnFamily::Metadata, b"k", None).unwrap().is_some());
/// ```
#[derive(Debug, Default)]
pub struct InMemoryStore {
    inner: RwLock<Inner>,
    snapshots: Arc<SnapshotList>,
}

impl InMemoryStore {
    /// Creates a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the sequence number of the last committed batch.
    #[must_use]
    pub fn last_sequence(&self) -> SequenceNumber {
        self.inner.read().last_seq
    }

    /// Returns the total number of retained key versions, tombstones included.
    ///
    /// Useful for testing version pruning.
    #[must_use]
    pub fn version_count(&self) -> usize {
        self.inner.read().entries.values().map(Vec::len).sum()
    }

    /// Returns the number of snapshots currently alive.
    #[must_use]
    pub fn live_snapshots(&self) -> usize {
        self.snapshots.live()
    }

    /// Applies already-validated operations under one new sequence number.
    pub(crate) fn apply_ops(&self, ops: Vec<BatchOp>) -> SequenceNumber {
        let mut inner = self.inner.write();
        let seq = inner.last_seq.next();
        // No snapshot can be taken while the write lock is held.
        let horizon = self.snapshots.oldest().unwrap_or(seq).min(seq);

        for op in ops {
            let (key, value) = match op {
                BatchOp::Put { cf, key, value } => ((cf, key), Some(value)),
                BatchOp::Delete { cf, key } => ((cf, key), None),
            };

            let versions = inner.entries.entry(key.clone()).or_default();
            match versions.last_mut() {
                // Same batch touched the key twice: the later op wins.
                Some(last) if last.seq == seq => last.value = value,
                _ => versions.push(Version { seq, value }),
            }
            prune(versions, horizon);

            if versions.len() == 1 && versions[0].value.is_none() && versions[0].seq <= horizon {
                inner.entries.remove(&key);
            }
        }

        inner.last_seq = seq;
        seq
    }
}

/// Drops versions no snapshot at or after `horizon` can observe.
fn prune(versions: &mut Vec<Version>, horizon: SequenceNumber) {
    let visible = versions.iter().rposition(|v| v.seq <= horizon);
    if let Some(idx) = visible {
        if idx > 0 {
            versions.drain(..idx);
        }
    }
}

fn visible_at<'a>(
    versions: &'a [Version],
    snapshot: Option<&Snapshot>,
) -> Option<&'a Vec<u8>> {
    let version = match snapshot {
        Some(snap) => {
            let seq = snap.sequence();
            versions.iter().rev().find(|v| v.seq <= seq)
        }
        None => versions.last(),
    };
    version.and_then(|v| v.value.as_ref())
}

impl KvStore for InMemoryStore {
    fn get(
        &self,
        cf: ColumnFamily,
        key: &[u8],
        snapshot: Option<&Snapshot>,
    ) -> StorageResult<Option<Vec<u8>>> {
        let inner = self.inner.read();
        Ok(inner
            .entries
            .get(&(cf, key.to_vec()))
            .and_then(|versions| visible_at(versions, snapshot))
            .cloned())
    }

    fn write(&self, batch: WriteBatch) -> StorageResult<()> {
        if batch.is_empty() {
            return Ok(());
        }
        self.apply_ops(batch.into_ops());
        Ok(())
    }

    fn snapshot(&self) -> Snapshot {
        // Holding the read lock keeps writers from pruning past this sequence
        // before it is pinned.
        let inner = self.inner.read();
        self.snapshots.pin(inner.last_seq)
    }

    fn scan_prefix(
        &self,
        cf: ColumnFamily,
        prefix: &[u8],
        snapshot: Option<&Snapshot>,
    ) -> StorageResult<Vec<(Vec<u8>, Vec<u8>)>> {
        let inner = self.inner.read();
        let start = (cf, prefix.to_vec());
        let results = inner
            .entries
            .range((Bound::Included(start), Bound::Unbounded))
            .take_while(|((entry_cf, key), _)| *entry_cf == cf && key.starts_with(prefix))
            .filter_map(|((_, key), versions)| {
                visible_at(versions, snapshot).map(|value| (key.clone(), value.clone()))
            })
            .collect();
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn put(store: &InMemoryStore, cf: ColumnFamily, key: &[u8], value: &[u8]) {
        let mut batch = WriteBatch::new();
        batch.put(cf, key.to_vec(), value.to_vec());
        store.write(batch).unwrap();
    }

    fn delete(store: &InMemoryStore, cf: ColumnFamily, key: &[u8]) {
        let mut batch = WriteBatch::new();
        batch.delete(cf, key.to_vec());
        store.write(batch).unwrap();
    }

    #[test]
    fn memory_new_is_empty() {
        let store = InMemoryStore::new();
        assert_eq!(store.version_count(), 0);
        assert_eq!(store.last_sequence(), SequenceNumber::new(0));
        assert!(store.get(ColumnFamily::SubKey, b"missing", None).unwrap().is_none());
    }

    #[test]
    fn memory_put_and_get() {
        let store = InMemoryStore::new();
        put(&store, ColumnFamily::SubKey, b"k", b"v1");
        put(&store, ColumnFamily::SubKey, b"k", b"v2");

        let value = store.get(ColumnFamily::SubKey, b"k", None).unwrap();
        assert_eq!(value.as_deref(), Some(&b"v2"[..]));
        assert_eq!(store.last_sequence(), SequenceNumber::new(2));
    }

    #[test]
    fn memory_column_families_are_isolated() {
        let store = InMemoryStore::new();
        put(&store, ColumnFamily::Metadata, b"k", b"meta");

        assert!(store.get(ColumnFamily::SubKey, b"k", None).unwrap().is_none());
        assert!(store.get(ColumnFamily::Metadata, b"k", None).unwrap().is_some());
    }

    #[test]
    fn memory_batch_is_atomic_for_snapshots() {
        let store = InMemoryStore::new();
        put(&store, ColumnFamily::Metadata, b"meta", b"size=1");
        put(&store, ColumnFamily::SubKey, b"seg", b"\x01");
        let before = store.snapshot();

        let mut batch = WriteBatch::new();
        batch.put(ColumnFamily::Metadata, b"meta".to_vec(), b"size=2".to_vec());
        batch.put(ColumnFamily::SubKey, b"seg".to_vec(), b"\x01\x02".to_vec());
        store.write(batch).unwrap();

        let meta = store.get(ColumnFamily::Metadata, b"meta", Some(&before)).unwrap();
        let seg = store.get(ColumnFamily::SubKey, b"seg", Some(&before)).unwrap();
        assert_eq!(meta.as_deref(), Some(&b"size=1"[..]));
        assert_eq!(seg.as_deref(), Some(&b"\x01"[..]));

        let after = store.snapshot();
        let meta = store.get(ColumnFamily::Metadata, b"meta", Some(&after)).unwrap();
        let seg = store.get(ColumnFamily::SubKey, b"seg", Some(&after)).unwrap();
        assert_eq!(meta.as_deref(), Some(&b"size=2"[..]));
        assert_eq!(seg.as_deref(), Some(&b"\x01\x02"[..]));
    }

    #[test]
    fn visible_at_picks_newest_version_not_after_snapshot() {
        let versions = vec![
            Version {
                seq: SequenceNumber::new(2),
                value: Some(b"old".to_vec()),
            },
            Version {
                seq: SequenceNumber::new(5),
                value: None,
            },
            Version {
                seq: SequenceNumber::new(7),
                value: Some(b"new".to_vec()),
            },
        ];
        let at = |seq: u64| Snapshot::unpinned(SequenceNumber::new(seq));

        assert_eq!(visible_at(&versions, None), Some(&b"new".to_vec()));
        assert_eq!(visible_at(&versions, Some(&at(1))), None);
        assert_eq!(visible_at(&versions, Some(&at(4))), Some(&b"old".to_vec()));
        assert_eq!(visible_at(&versions, Some(&at(5))), None);
        assert_eq!(visible_at(&versions, Some(&at(9))), Some(&b"new".to_vec()));
    }

    #[test]
    fn memory_later_op_in_batch_wins() {
        let store = InMemoryStore::new();
        let mut batch = WriteBatch::new();
        batch.put(ColumnFamily::SubKey, b"k".to_vec(), b"a".to_vec());
        batch.put(ColumnFamily::SubKey, b"k".to_vec(), b"b".to_vec());
        store.write(batch).unwrap();

        let value = store.get(ColumnFamily::SubKey, b"k", None).unwrap();
        assert_eq!(value.as_deref(), Some(&b"b"[..]));
        assert_eq!(store.version_count(), 1);
    }

    #[test]
    fn memory_delete_hides_key() {
        let store = InMemoryStore::new();
        put(&store, ColumnFamily::SubKey, b"k", b"v");
        let snap = store.snapshot();
        delete(&store, ColumnFamily::SubKey, b"k");

        assert!(store.get(ColumnFamily::SubKey, b"k", None).unwrap().is_none());
        assert!(store.get(ColumnFamily::SubKey, b"k", Some(&snap)).unwrap().is_some());

        drop(snap);
        delete(&store, ColumnFamily::SubKey, b"other");
        assert!(store.get(ColumnFamily::SubKey, b"k", None).unwrap().is_none());
    }

    #[test]
    fn memory_prunes_unobservable_versions() {
        let store = InMemoryStore::new();
        for i in 0..10u8 {
            put(&store, ColumnFamily::SubKey, b"k", &[i]);
        }
        assert_eq!(store.version_count(), 1);

        let snap = store.snapshot();
        put(&store, ColumnFamily::SubKey, b"k", b"new");
        put(&store, ColumnFamily::SubKey, b"k", b"newer");
        // The pinned version plus everything after it.
        assert_eq!(store.version_count(), 3);
        assert_eq!(
            store.get(ColumnFamily::SubKey, b"k", Some(&snap)).unwrap(),
            Some(vec![9])
        );

        drop(snap);
        put(&store, ColumnFamily::SubKey, b"k", b"newest");
        assert_eq!(store.version_count(), 1);
        assert_eq!(store.live_snapshots(), 0);
    }

    #[test]
    fn memory_delete_without_snapshots_frees_key() {
        let store = InMemoryStore::new();
        put(&store, ColumnFamily::SubKey, b"k", b"v");
        delete(&store, ColumnFamily::SubKey, b"k");
        assert_eq!(store.version_count(), 0);
    }

    #[test]
    fn memory_scan_prefix_in_order() {
        let store = InMemoryStore::new();
        put(&store, ColumnFamily::SubKey, b"a/2", b"2");
        put(&store, ColumnFamily::SubKey, b"a/1", b"1");
        put(&store, ColumnFamily::SubKey, b"b/1", b"x");
        put(&store, ColumnFamily::Metadata, b"a/3", b"m");
        delete(&store, ColumnFamily::SubKey, b"a/2");

        let entries = store.scan_prefix(ColumnFamily::SubKey, b"a/", None).unwrap();
        assert_eq!(entries, vec![(b"a/1".to_vec(), b"1".to_vec())]);
    }

    mod props {
        use super::*;
        use proptest::prelude::*;
        use std::collections::BTreeMap;

        #[derive(Debug, Clone)]
        enum Op {
            Put(u8, u8),
            Delete(u8),
            Snapshot,
            Release,
        }

        fn op() -> impl Strategy<Value = Op> {
            prop_oneof![
                4 => (0u8..8, any::<u8>()).prop_map(|(k, v)| Op::Put(k, v)),
                2 => (0u8..8).prop_map(Op::Delete),
                1 => Just(Op::Snapshot),
                1 => Just(Op::Release),
            ]
        }

        proptest! {
            #[test]
            fn snapshots_see_frozen_state(ops in prop::collection::vec(op(), 1..80)) {
                let store = InMemoryStore::new();
                let mut current: BTreeMap<u8, u8> = BTreeMap::new();
                let mut pinned: Vec<(Snapshot, BTreeMap<u8, u8>)> = Vec::new();

                for op in ops {
                    match op {
                        Op::Put(k, v) => {
                            put(&store, ColumnFamily::SubKey, &[k], &[v]);
                            current.insert(k, v);
                        }
                        Op::Delete(k) => {
                            delete(&store, ColumnFamily::SubKey, &[k]);
                            current.remove(&k);
                        }
                        Op::Snapshot => pinned.push((store.snapshot(), current.clone())),
                        Op::Release => {
                            if !pinned.is_empty() {
                                pinned.remove(0);
                            }
                        }
                    }

                    for (snap, frozen) in &pinned {
                        for k in 0u8..8 {
                            let got = store.get(ColumnFamily::SubKey, &[k], Some(snap)).unwrap();
                            prop_assert_eq!(got, frozen.get(&k).map(|v| vec![*v]));
                        }
                    }
                    prop_assert_eq!(store.live_snapshots(), pinned.len());
                }

                let latest = store.scan_prefix(ColumnFamily::SubKey, b"", None).unwrap();
                let expected: Vec<_> = current.iter().map(|(k, v)| (vec![*k], vec![*v])).collect();
                prop_assert_eq!(latest, expected);
            }
        }
    }

    #[test]
    fn memory_empty_batch_does_not_advance_sequence() {
        let store = InMemoryStore::new();
        store.write(WriteBatch::new()).unwrap();
        assert_eq!(store.last_sequence(), SequenceNumber::new(0));
    }
}
