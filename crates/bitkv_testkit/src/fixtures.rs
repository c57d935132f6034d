//! Test fixtures and database helpers.
//!
//! Provides convenience functions for setting up test databases
//! and common test scenarios.

use bitkv_core::{Config, Database};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A test database with automatic cleanup.
pub struct TestDatabase {
    /// The database instance.
    pub db: Database,
    /// The temporary directory (kept alive to prevent cleanup).
    temp_dir: Option<TempDir>,
}

impl TestDatabase {
    /// Creates a new in-memory test database.
    pub fn memory() -> Self {
        Self {
            db: Database::open_in_memory().expect("Failed to open in-memory database"),
            temp_dir: None,
        }
    }

    /// Creates a new file-based test database.
    pub fn file() -> Self {
        Self::file_with_config(Config::default())
    }

    /// Creates a new file-based test database with custom configuration.
    pub fn file_with_config(config: Config) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let db = Database::open_with_config(&temp_dir.path().join("db"), config)
            .expect("Failed to open file database");

        Self {
            db,
            temp_dir: Some(temp_dir),
        }
    }

    /// Returns the database path if file-based, None if in-memory.
    pub fn path(&self) -> Option<PathBuf> {
        self.temp_dir.as_ref().map(|d| d.path().join("db"))
    }

    /// Splits into the database and the directory that must outlive it.
    pub fn into_parts(self) -> (Database, Option<TempDir>) {
        (self.db, self.temp_dir)
    }

    /// Closes and reopens a file-based database from disk.
    ///
    /// # Panics
    ///
    /// Panics for in-memory databases, which cannot be reopened.
    pub fn reopen(self) -> Self {
        let temp_dir = self.temp_dir.expect("In-memory databases cannot be reopened");
        let config = self.db.config().clone();
        drop(self.db);

        let db = Database::open_with_config(&temp_dir.path().join("db"), config)
            .expect("Failed to reopen file database");
        Self {
            db,
            temp_dir: Some(temp_dir),
        }
    }
}

impl std::ops::Deref for TestDatabase {
    type Target = Database;

    fn deref(&self) -> &Self::Target {
        &self.db
    }
}

/// Runs a test with a temporary in-memory database.
///
/// # Example
///
/// ```rust
/// use bitkv_testkit::with_temp_db;
///
/// with_temp_db(|db| {
///     assert_eq!(db.bitmap().bit_count(b"bm", 0, -1).unwrap(), 0);
/// });
/// ```
pub fn with_temp_db<F, R>(f: F) -> R
where
    F: FnOnce(&Database) -> R,
{
    let test_db = TestDatabase::memory();
    f(&test_db.db)
}

/// Runs a test with a temporary file-based database.
pub fn with_file_db<F, R>(f: F) -> R
where
    F: FnOnce(&Database, &Path) -> R,
{
    let test_db = TestDatabase::file();
    let path = test_db.path().expect("File database should have a path");
    f(&test_db.db, &path)
}

/// Test scenario helpers.
pub mod scenarios {
    use super::*;

    /// Creates a database whose key `bm` has bits 7, 100 and 8199 set.
    ///
    /// The bitmap spans two segments and is 1025 bytes long.
    pub fn two_segment_bitmap() -> TestDatabase {
        let test_db = TestDatabase::memory();
        for offset in [7, 100, 8199] {
            test_db
                .bitmap()
                .set_bit(b"bm", offset, true)
                .expect("Failed to set bit");
        }
        test_db
    }

    /// Creates a database with `key_count` bitmaps, key `i` having bit `i` set.
    pub fn many_bitmaps(key_count: usize) -> TestDatabase {
        let test_db = TestDatabase::memory();
        for i in 0..key_count {
            test_db
                .bitmap()
                .set_bit(format!("key_{i}").as_bytes(), i as u64, true)
                .expect("Failed to set bit");
        }
        test_db
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_database() {
        let db = TestDatabase::memory();
        assert!(db.path().is_none());
        assert!(!db.exists(b"k").unwrap());
    }

    #[test]
    fn file_database_reopens() {
        let db = TestDatabase::file();
        db.bitmap().set_bit(b"k", 12, true).unwrap();
        assert!(db.path().unwrap().exists());

        let db = db.reopen();
        assert!(db.bitmap().get_bit(b"k", 12).unwrap());
    }

    #[test]
    fn with_file_db_exposes_path() {
        with_file_db(|db, path| {
            db.bitmap().set_bit(b"k", 0, true).unwrap();
            assert!(path.exists());
        });
    }

    #[test]
    fn two_segment_scenario() {
        let db = scenarios::two_segment_bitmap();
        assert_eq!(db.bitmap().bit_count(b"bm", 0, -1).unwrap(), 3);
        assert_eq!(db.bitmap().byte_len(b"bm").unwrap(), 1025);
    }

    #[test]
    fn many_bitmaps() {
        let db = scenarios::many_bitmaps(10);
        for i in 0..10u64 {
            let key = format!("key_{i}");
            assert!(db.bitmap().get_bit(key.as_bytes(), i).unwrap());
        }
    }
}
