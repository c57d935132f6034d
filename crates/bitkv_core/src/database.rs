//! Database facade and generic key operations.

use crate::bitmap::Bitmap;
use crate::config::Config;
use crate::error::{CoreError, CoreResult};
use crate::lock::LockManager;
use crate::stats::DatabaseStats;
use bitkv_codec::{namespace_key, now_ms, DataType, Metadata};
use bitkv_storage::{
    ColumnFamily, FileStore, FileStoreOptions, InMemoryStore, KvStore, Snapshot, WriteBatch,
};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// The main database handle.
///
/// `Database` owns the store, the per-key lock manager and the statistics
/// shared by every data type. Bitmap commands are reached through
/// [`Database::bitmap`]; the generic key commands (`exists`, `delete`,
/// `expire`, ...) live here.
///
/// # Opening a Database
///
/// ```rust,no_run
/// use bitkv_core::Database;
/// use std::path::Path;
///
/// let db = Database::open(Path::new("bitmaps")).unwrap();
/// db.bitmap().set_bit(b"online", 42, true).unwrap();
/// ```
///
/// # In-Memory Databases
///
/// ```rust
/// use bitkv_core::Database;
///
/// let db = Database::open_in_memory().unwrap();
/// assert!(!db.exists(b"online").unwrap());
/// ```
pub struct Database {
    config: Config,
    store: Arc<dyn KvStore>,
    locks: LockManager,
    stats: DatabaseStats,
}

impl Database {
    /// Opens or creates a file-backed database in `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be opened.
    pub fn open(path: &Path) -> CoreResult<Self> {
        Self::open_with_config(path, Config::default())
    }

    /// Opens or creates a file-backed database with custom configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be opened or the configured
    /// namespace is invalid.
    pub fn open_with_config(path: &Path, config: Config) -> CoreResult<Self> {
        let options = FileStoreOptions {
            create_if_missing: config.create_if_missing,
            sync_on_write: config.sync_on_write,
        };
        let store = FileStore::open_with_options(path, options)?;
        debug!(path = %path.display(), "opened file store");
        Self::open_with_store(config, Arc::new(store))
    }

    /// Creates an in-memory database.
    ///
    /// # Errors
    ///
    /// Infallible with the default configuration; the signature matches the
    /// other constructors.
    pub fn open_in_memory() -> CoreResult<Self> {
        Self::open_with_store(Config::default(), Arc::new(InMemoryStore::new()))
    }

    /// Creates a database over an existing store.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured namespace is invalid.
    pub fn open_with_store(config: Config, store: Arc<dyn KvStore>) -> CoreResult<Self> {
        // Reject an unusable namespace up front rather than on first use.
        namespace_key(&config.namespace, b"")?;
        let locks = LockManager::new(config.lock_stripes_power);
        Ok(Self {
            config,
            store,
            locks,
            stats: DatabaseStats::new(),
        })
    }

    /// Returns bitmap operations over this database.
    #[must_use]
    pub fn bitmap(&self) -> Bitmap<'_> {
        Bitmap::new(self)
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns the statistics counters.
    #[must_use]
    pub fn stats(&self) -> &DatabaseStats {
        &self.stats
    }

    /// Returns the underlying store.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn KvStore> {
        &self.store
    }

    pub(crate) fn locks(&self) -> &LockManager {
        &self.locks
    }

    /// Maps a user key to its storage key.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured namespace is invalid.
    pub fn namespace_key(&self, user_key: &[u8]) -> CoreResult<Vec<u8>> {
        Ok(namespace_key(&self.config.namespace, user_key)?)
    }

    /// Loads the live metadata record of `ns_key`, whatever its type.
    ///
    /// Expired records, and empty records of sized types, read as missing.
    fn live_metadata(
        &self,
        ns_key: &[u8],
        snapshot: Option<&Snapshot>,
    ) -> CoreResult<Option<Metadata>> {
        let raw = self
            .store
            .get(ColumnFamily::Metadata, ns_key, snapshot)
            .inspect_err(|_| self.stats.record_error())?;
        let Some(raw) = raw else {
            return Ok(None);
        };

        let metadata = Metadata::decode(&raw)?;
        if metadata.is_expired(now_ms()) {
            return Ok(None);
        }
        if metadata.data_type != DataType::String && metadata.size == 0 {
            return Ok(None);
        }
        Ok(Some(metadata))
    }

    /// Loads the metadata record of `ns_key`, requiring `data_type`.
    ///
    /// # Errors
    ///
    /// Returns `WrongType` if a live record of another type exists, or an
    /// error if the store fails or the record is malformed.
    pub fn get_metadata(
        &self,
        data_type: DataType,
        ns_key: &[u8],
        snapshot: Option<&Snapshot>,
    ) -> CoreResult<Option<Metadata>> {
        match self.live_metadata(ns_key, snapshot)? {
            Some(metadata) if metadata.data_type != data_type => Err(CoreError::WrongType {
                expected: data_type,
                actual: metadata.data_type,
            }),
            other => Ok(other),
        }
    }

    /// Applies `batch` atomically.
    pub(crate) fn commit(&self, batch: WriteBatch) -> CoreResult<()> {
        let bytes = batch.payload_bytes() as u64;
        let ops = batch.len();
        match self.store.write(batch) {
            Ok(()) => {
                self.stats.record_commit(bytes);
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, ops, "write batch failed");
                self.stats.record_error();
                Err(err.into())
            }
        }
    }

    /// Returns whether `key` holds a live value.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails or the record is malformed.
    pub fn exists(&self, key: &[u8]) -> CoreResult<bool> {
        Ok(self.type_of(key)? != DataType::None)
    }

    /// Returns the type of the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails or the record is malformed.
    pub fn type_of(&self, key: &[u8]) -> CoreResult<DataType> {
        let ns_key = self.namespace_key(key)?;
        Ok(self
            .live_metadata(&ns_key, None)?
            .map_or(DataType::None, |m| m.data_type))
    }

    /// Deletes `key`, returning whether it existed.
    ///
    /// Only the metadata record is removed. Sub-keys of the deleted
    /// generation stay in the store, unreachable: a later write starts a new
    /// version.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails or the record is malformed.
    pub fn delete(&self, key: &[u8]) -> CoreResult<bool> {
        let ns_key = self.namespace_key(key)?;
        let _guard = self.locks.lock(&ns_key);
        self.stats.record_key_op();

        if self.live_metadata(&ns_key, None)?.is_none() {
            return Ok(false);
        }

        let mut batch = WriteBatch::new();
        batch.delete(ColumnFamily::Metadata, ns_key);
        self.commit(batch)?;
        Ok(true)
    }

    /// Sets `key` to expire after `ttl`, returning whether it existed.
    ///
    /// A zero `ttl` deletes the key.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails or the record is malformed.
    pub fn expire(&self, key: &[u8], ttl: Duration) -> CoreResult<bool> {
        if ttl.is_zero() {
            return self.delete(key);
        }

        let ttl_ms = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1);
        self.update_expiry(key, now_ms().saturating_add(ttl_ms))
    }

    /// Removes any expiry from `key`, returning whether it existed.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails or the record is malformed.
    pub fn persist(&self, key: &[u8]) -> CoreResult<bool> {
        self.update_expiry(key, 0)
    }

    /// Returns the time `key` has left to live.
    ///
    /// `None` if the key is missing or never expires.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails or the record is malformed.
    pub fn ttl(&self, key: &[u8]) -> CoreResult<Option<Duration>> {
        let ns_key = self.namespace_key(key)?;
        Ok(self
            .live_metadata(&ns_key, None)?
            .and_then(|m| m.ttl_ms(now_ms()))
            .map(Duration::from_millis))
    }

    fn update_expiry(&self, key: &[u8], expire_ms: u64) -> CoreResult<bool> {
        let ns_key = self.namespace_key(key)?;
        let _guard = self.locks.lock(&ns_key);
        self.stats.record_key_op();

        let Some(mut metadata) = self.live_metadata(&ns_key, None)? else {
            return Ok(false);
        };
        if metadata.expire_ms == expire_ms {
            return Ok(true);
        }

        metadata.expire_ms = expire_ms;
        let mut batch = WriteBatch::new();
        batch.put(ColumnFamily::Metadata, ns_key, metadata.encode());
        self.commit(batch)?;
        Ok(true)
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("config", &self.config)
            .field("locks", &self.locks)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bitkv_codec::InternalKey;
    use tempfile::tempdir;

    fn put_metadata(db: &Database, key: &[u8], metadata: Metadata) {
        let mut batch = WriteBatch::new();
        batch.put(
            ColumnFamily::Metadata,
            db.namespace_key(key).unwrap(),
            metadata.encode(),
        );
        db.store().write(batch).unwrap();
    }

    #[test]
    fn missing_key() {
        let db = Database::open_in_memory().unwrap();
        assert!(!db.exists(b"k").unwrap());
        assert_eq!(db.type_of(b"k").unwrap(), DataType::None);
        assert!(!db.delete(b"k").unwrap());
        assert!(!db.expire(b"k", Duration::from_secs(10)).unwrap());
        assert_eq!(db.ttl(b"k").unwrap(), None);
    }

    #[test]
    fn type_of_bitmap() {
        let db = Database::open_in_memory().unwrap();
        db.bitmap().set_bit(b"k", 1, true).unwrap();
        assert!(db.exists(b"k").unwrap());
        assert_eq!(db.type_of(b"k").unwrap(), DataType::Bitmap);
    }

    #[test]
    fn wrong_type_is_reported() {
        let db = Database::open_in_memory().unwrap();
        let mut hash = Metadata::new(DataType::Hash);
        hash.size = 3;
        put_metadata(&db, b"h", hash);

        let ns_key = db.namespace_key(b"h").unwrap();
        let result = db.get_metadata(DataType::Bitmap, &ns_key, None);
        assert!(matches!(
            result,
            Err(CoreError::WrongType {
                expected: DataType::Bitmap,
                actual: DataType::Hash
            })
        ));
    }

    #[test]
    fn empty_sized_record_reads_missing() {
        let db = Database::open_in_memory().unwrap();
        put_metadata(&db, b"k", Metadata::new(DataType::Bitmap));
        assert!(!db.exists(b"k").unwrap());
    }

    #[test]
    fn expired_record_reads_missing() {
        let db = Database::open_in_memory().unwrap();
        let mut metadata = Metadata::new(DataType::Bitmap);
        metadata.size = 1;
        metadata.expire_ms = 1;
        put_metadata(&db, b"k", metadata);

        assert!(!db.exists(b"k").unwrap());
        assert!(!db.bitmap().get_bit(b"k", 0).unwrap());
    }

    #[test]
    fn delete_leaves_old_generation_unreachable() {
        let db = Database::open_in_memory().unwrap();
        db.bitmap().set_bit(b"k", 3, true).unwrap();
        let ns_key = db.namespace_key(b"k").unwrap();
        let old_version = db
            .get_metadata(DataType::Bitmap, &ns_key, None)
            .unwrap()
            .unwrap()
            .version;

        assert!(db.delete(b"k").unwrap());
        assert!(!db.exists(b"k").unwrap());
        assert!(!db.bitmap().get_bit(b"k", 3).unwrap());

        // The old segment is still stored, just never read again.
        let old_prefix = InternalKey::prefix(&ns_key, old_version);
        let leftovers = db
            .store()
            .scan_prefix(ColumnFamily::SubKey, &old_prefix, None)
            .unwrap();
        assert_eq!(leftovers.len(), 1);

        assert!(!db.bitmap().set_bit(b"k", 3, true).unwrap());
        let new_version = db
            .get_metadata(DataType::Bitmap, &ns_key, None)
            .unwrap()
            .unwrap()
            .version;
        assert!(new_version > old_version);
    }

    #[test]
    fn expire_ttl_and_persist() {
        let db = Database::open_in_memory().unwrap();
        db.bitmap().set_bit(b"k", 0, true).unwrap();
        assert_eq!(db.ttl(b"k").unwrap(), None);

        assert!(db.expire(b"k", Duration::from_secs(100)).unwrap());
        let ttl = db.ttl(b"k").unwrap().unwrap();
        assert!(ttl <= Duration::from_secs(100));
        assert!(ttl > Duration::from_secs(90));

        assert!(db.persist(b"k").unwrap());
        assert_eq!(db.ttl(b"k").unwrap(), None);
        assert!(db.exists(b"k").unwrap());
    }

    #[test]
    fn expire_zero_deletes() {
        let db = Database::open_in_memory().unwrap();
        db.bitmap().set_bit(b"k", 0, true).unwrap();
        assert!(db.expire(b"k", Duration::ZERO).unwrap());
        assert!(!db.exists(b"k").unwrap());
    }

    #[test]
    fn expiry_survives_set_bit() {
        let db = Database::open_in_memory().unwrap();
        db.bitmap().set_bit(b"k", 0, true).unwrap();
        db.expire(b"k", Duration::from_secs(100)).unwrap();
        db.bitmap().set_bit(b"k", 50_000, true).unwrap();
        assert!(db.ttl(b"k").unwrap().is_some());
    }

    #[test]
    fn namespaces_are_isolated() {
        let store: Arc<dyn KvStore> = Arc::new(InMemoryStore::new());
        let a = Database::open_with_store(Config::new().namespace("a"), Arc::clone(&store)).unwrap();
        let b = Database::open_with_store(Config::new().namespace("b"), store).unwrap();

        a.bitmap().set_bit(b"k", 9, true).unwrap();
        assert!(a.bitmap().get_bit(b"k", 9).unwrap());
        assert!(!b.bitmap().get_bit(b"k", 9).unwrap());
        assert!(!b.exists(b"k").unwrap());
    }

    #[test]
    fn invalid_namespace_rejected() {
        let config = Config::new().namespace("n".repeat(300));
        let result = Database::open_with_store(config, Arc::new(InMemoryStore::new()));
        assert!(matches!(result, Err(CoreError::Codec(_))));
    }

    #[test]
    fn file_database_reopens() {
        let dir = tempdir().unwrap();
        {
            let db = Database::open(dir.path()).unwrap();
            db.bitmap().set_bit(b"k", 8199, true).unwrap();
        }

        let db = Database::open(dir.path()).unwrap();
        assert!(db.bitmap().get_bit(b"k", 8199).unwrap());
        assert_eq!(db.bitmap().bit_count(b"k", 0, -1).unwrap(), 1);
    }

    #[test]
    fn key_ops_are_counted() {
        let db = Database::open_in_memory().unwrap();
        db.bitmap().set_bit(b"k", 0, true).unwrap();
        db.expire(b"k", Duration::from_secs(5)).unwrap();
        db.delete(b"k").unwrap();
        assert_eq!(db.stats().key_ops(), 2);
        assert_eq!(db.stats().batches_committed(), 3);
    }
}
