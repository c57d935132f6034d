//! Key-value store trait definition.

use crate::batch::WriteBatch;
use crate::error::StorageResult;
use crate::snapshot::Snapshot;

/// Independent keyspaces inside one store.
///
/// Metadata records and data-type sub-keys live in separate keyspaces so a
/// user key never collides with an encoded sub-key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ColumnFamily {
    /// Per-key metadata records.
    Metadata,
    /// Sub-keys owned by a metadata record (bitmap segments, hash fields, ...).
    SubKey,
}

impl ColumnFamily {
    /// Returns the on-disk tag for this column family.
    #[must_use]
    pub const fn as_byte(self) -> u8 {
        match self {
            Self::Metadata => 0,
            Self::SubKey => 1,
        }
    }

    /// Parses an on-disk tag.
    #[must_use]
    pub const fn from_byte(b: u8) -> Option<Self> {
        match b {
            0 => Some(Self::Metadata),
            1 => Some(Self::SubKey),
            _ => None,
        }
    }
}

/// An ordered key-value store.
///
/// Stores are **opaque byte maps**. Callers own all key and value
/// interpretation.
///
/// # Invariants
///
/// - `write` applies a whole batch or nothing; all of its entries become
///   visible at the same instant
/// - a read through a [`Snapshot`] only observes batches committed before the
///   snapshot was taken
/// - a missing key is `Ok(None)`, never an error
/// - Stores must be `Send + Sync` for concurrent access
///
/// # Implementors
///
/// - [`super::InMemoryStore`] - For testing
/// - [`super::FileStore`] - For persistent storage
pub trait KvStore: Send + Sync {
    /// Reads the value stored under `key`.
    ///
    /// With `snapshot` set, the read observes the store as of that snapshot;
    /// otherwise it observes the latest committed state.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying storage fails.
    fn get(
        &self,
        cf: ColumnFamily,
        key: &[u8],
        snapshot: Option<&Snapshot>,
    ) -> StorageResult<Option<Vec<u8>>>;

    /// Atomically applies a batch of puts and deletes.
    ///
    /// # Errors
    ///
    /// Returns an error if the batch could not be made durable. In that case
    /// none of its entries are visible.
    fn write(&self, batch: WriteBatch) -> StorageResult<()>;

    /// Takes a point-in-time read view.
    ///
    /// The view stays valid until the returned handle is dropped.
    fn snapshot(&self) -> Snapshot;

    /// Returns all live entries whose key starts with `prefix`, in key order.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying storage fails.
    fn scan_prefix(
        &self,
        cf: ColumnFamily,
        prefix: &[u8],
        snapshot: Option<&Snapshot>,
    ) -> StorageResult<Vec<(Vec<u8>, Vec<u8>)>>;
}
