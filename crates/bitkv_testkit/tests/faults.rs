//! Storage failures must surface unchanged and leave no partial state.

use bitkv_core::bitmap::SEGMENT_BITS;
use bitkv_core::{Config, CoreError, Database, InMemoryStore, KvStore, StorageError};
use bitkv_testkit::prelude::*;
use std::sync::Arc;

fn faulty_db() -> (Database, Arc<FaultyStore>) {
    init_tracing();
    let store = Arc::new(FaultyStore::new(Arc::new(InMemoryStore::new())));
    let shared: Arc<dyn KvStore> = store.clone();
    (Database::open_with_store(Config::default(), shared).unwrap(), store)
}

#[test]
fn failed_commit_changes_nothing() {
    let (db, store) = faulty_db();
    db.bitmap().set_bit(b"bm", 3, true).unwrap();

    store.fail_writes(true);
    // Would add a segment and grow the size in the same batch.
    let err = db.bitmap().set_bit(b"bm", 2 * SEGMENT_BITS, true).unwrap_err();
    assert!(err.is_storage());
    assert!(matches!(err, CoreError::Storage(StorageError::Io(_))));
    assert_eq!(store.rejected_writes(), 1);

    store.fail_writes(false);
    assert_eq!(db.bitmap().byte_len(b"bm").unwrap(), 1);
    assert!(!db.bitmap().get_bit(b"bm", 2 * SEGMENT_BITS).unwrap());
    assert_eq!(db.bitmap().bit_count(b"bm", 0, 1).unwrap(), 1);
    assert_eq!(db.stats().errors(), 1);
}

#[test]
fn failed_first_write_creates_nothing() {
    let (db, store) = faulty_db();
    store.fail_writes(true);
    assert!(db.bitmap().set_bit(b"bm", 0, true).is_err());

    store.fail_writes(false);
    assert!(!db.exists(b"bm").unwrap());
    assert_eq!(db.bitmap().bit_pos(b"bm", true, 0, -1).unwrap(), -1);
}

#[test]
fn read_failures_propagate() {
    let (db, store) = faulty_db();
    db.bitmap().set_bit(b"bm", 3, true).unwrap();

    store.fail_reads(true);
    let bitmap = db.bitmap();
    assert!(bitmap.get_bit(b"bm", 3).unwrap_err().is_storage());
    assert!(bitmap.bit_count(b"bm", 0, -1).unwrap_err().is_storage());
    assert!(bitmap.bit_pos(b"bm", true, 0, -1).unwrap_err().is_storage());
    assert!(bitmap.set_bit(b"bm", 4, true).unwrap_err().is_storage());
    assert!(db.delete(b"bm").unwrap_err().is_storage());

    store.fail_reads(false);
    assert!(bitmap.get_bit(b"bm", 3).unwrap());
    assert!(!bitmap.get_bit(b"bm", 4).unwrap());
}

#[test]
fn closed_store() {
    let (db, store) = faulty_db();
    store.close();
    assert!(matches!(
        db.bitmap().get_bit(b"bm", 0),
        Err(CoreError::Storage(StorageError::Closed))
    ));
}

#[test]
fn lock_is_released_after_failure() {
    let (db, store) = faulty_db();
    store.fail_writes(true);
    assert!(db.bitmap().set_bit(b"bm", 0, true).is_err());
    store.fail_writes(false);
    // Would deadlock if the failed call kept its key locked.
    assert!(!db.bitmap().set_bit(b"bm", 0, true).unwrap());
}
