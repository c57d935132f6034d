//! # bitkv Core
//!
//! Redis-style bitmaps stored as fixed-size segments over an ordered
//! key-value store.
//!
//! This crate provides:
//! - [`Database`], the handle owning the store, per-key locks and stats
//! - [`Bitmap`] commands: `get_bit`, `set_bit`, `bit_count`, `bit_pos`
//! - Generic key commands: `exists`, `type_of`, `delete`, `expire`,
//!   `persist` and `ttl`
//!
//! ## Example
//!
//! ```rust
//! use bitkv_core::Database;
//!
//! let db = Database::open_in_memory().unwrap();
//! let bitmap = db.bitmap();
//!
//! bitmap.set_bit(b"bm", 7, true).unwrap();
//! bitmap.set_bit(b"bm", 100, true).unwrap();
//! bitmap.set_bit(b"bm", 8199, true).unwrap();
//!
//! assert_eq!(bitmap.bit_count(b"bm", 0, -1).unwrap(), 3);
//! assert_eq!(bitmap.bit_pos(b"bm", true, 0, -1).unwrap(), 7);
//! assert!(bitmap.get_bit(b"bm", 8199).unwrap());
//! assert!(!bitmap.get_bit(b"bm", 8200).unwrap());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod bitmap;
mod config;
mod database;
mod error;
mod lock;
mod stats;

pub use bitmap::Bitmap;
pub use config::Config;
pub use database::Database;
pub use error::{CoreError, CoreResult};
pub use lock::{LockGuard, LockManager};
pub use stats::{DatabaseStats, StatsSnapshot};

pub use bitkv_codec::{DataType, Metadata};
pub use bitkv_storage::{FileStore, InMemoryStore, KvStore, StorageError};
