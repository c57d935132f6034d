//! # bitkv Storage
//!
//! Ordered key-value store trait and implementations for bitkv.
//!
//! This crate provides the lowest-level storage abstraction for bitkv.
//! Stores are **opaque byte maps** - they do not interpret the keys or
//! values they hold.
//!
//! ## Design Principles
//!
//! - Stores expose point reads, atomic write batches and read snapshots
//! - No knowledge of metadata records, segments, or bitmaps
//! - Must be `Send + Sync` for concurrent access
//! - Callers own all key and value format interpretation
//!
//! ## Available Stores
//!
//! - [`InMemoryStore`] - For testing and ephemeral storage
//! - [`FileStore`] - For persistent storage backed by a batch log
//!
//! ## Example
//!
//! ```rust
//! use bitkv_storage::{ColumnFamily, InMemoryStore, KvStore, WriteBatch};
//!
//! let store = InMemoryStore::new();
//! let mut batch = WriteBatch::new();
//! batch.put(ColumnFamily::SubKey, b"hello".to_vec(), b"world".to_vec());
//! store.write(batch).unwrap();
//!
//! let value = store.get(ColumnFamily::SubKey, b"hello", None).unwrap();
//! assert_eq!(value.as_deref(), Some(&b"world"[..]));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod batch;
mod error;
mod file;
mod memory;
mod snapshot;
mod store;

pub use batch::{BatchOp, WriteBatch};
pub use error::{StorageError, StorageResult};
pub use file::{FileStore, FileStoreOptions};
pub use memory::InMemoryStore;
pub use snapshot::{SequenceNumber, Snapshot};
pub use store::{ColumnFamily, KvStore};
