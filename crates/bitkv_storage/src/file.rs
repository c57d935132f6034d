//! File-backed store for persistent storage.
//!
//! Layout of a store directory:
//!
//! ```text
//! <dir>/
//! ├─ LOCK          # Advisory lock for single-process access
//! └─ batches.log   # Append-only log of committed write batches
//! ```
//!
//! ## Batch Frame Format
//!
//! ```text
//! | magic (4) | length (4) | payload (N) | crc32 (4) |
//! ```
//!
//! The payload is `| op_count (4) | op... |` where each op is
//! `| kind (1) | cf (1) | key_len (4) | key | [value_len (4) | value] |`.
//! All integers are little-endian.
//!
//! ## Recovery Policy
//!
//! - A truncated trailing frame (crash mid-append) is a clean end-of-log and
//!   is cut off on open.
//! - Bad magic, an unknown op, or a CRC mismatch is fatal: the store refuses
//!   to open rather than silently dropping committed batches.
//! - A failed append is cut back to the last frame boundary. If that cut
//!   fails too, the store is poisoned and every later call returns
//!   [`StorageError::Closed`] until it is reopened.

use crate::batch::{BatchOp, WriteBatch};
use crate::error::{StorageError, StorageResult};
use crate::memory::InMemoryStore;
use crate::snapshot::{SequenceNumber, Snapshot};
use crate::store::{ColumnFamily, KvStore};
use fs2::FileExt;
use parking_lot::Mutex;
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

const LOCK_FILE: &str = "LOCK";
const LOG_FILE: &str = "batches.log";

const FRAME_MAGIC: u32 = 0xB17B_A7C4;
const FRAME_HEADER: usize = 8;
const FRAME_TRAILER: usize = 4;

const OP_PUT: u8 = 1;
const OP_DELETE: u8 = 2;

/// Options for opening a [`FileStore`].
#[derive(Debug, Clone, Copy)]
pub struct FileStoreOptions {
    /// Create the directory if it does not exist.
    pub create_if_missing: bool,
    /// `fsync` the log after every batch (safer but slower).
    pub sync_on_write: bool,
}

impl Default for FileStoreOptions {
    fn default() -> Self {
        Self {
            create_if_missing: true,
            sync_on_write: true,
        }
    }
}

#[derive(Debug)]
struct LogFile {
    file: File,
    len: u64,
}

/// A durable key-value store.
///
/// Committed batches are appended to a log and replayed into an
/// [`InMemoryStore`] on open, so reads never touch the disk.
///
/// # Durability
///
/// A batch is visible to readers only after its frame has been written and
/// flushed (and synced, with `sync_on_write`).
///
/// # Example
///
/// ```no_run
/// use bitkv_storage::{ColumnFamily, FileStore, KvStore, WriteBatch};
/// use std::path::Path;
///
/// let store = FileStore::open(Path::new("bitmaps")).unwrap();
/// let mut batch = WriteBatch::new();
/// batch.put(ColumnFamily::SubKey, b"k".to_vec(), b"v".to_vec());
/// store.write(batch).unwrap();
/// ```
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    log: Mutex<LogFile>,
    memory: InMemoryStore,
    sync_on_write: bool,
    /// Set when the log may hold bytes past `LogFile::len`.
    poisoned: AtomicBool,
    /// Held for exclusive access.
    _lock_file: File,
}

impl FileStore {
    /// Opens or creates a store in `dir` with default options.
    ///
    /// # Errors
    ///
    /// See [`FileStore::open_with_options`].
    pub fn open(dir: &Path) -> StorageResult<Self> {
        Self::open_with_options(dir, FileStoreOptions::default())
    }

    /// Opens or creates a store in `dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The directory doesn't exist and `create_if_missing` is false
    /// - Another process holds the lock (returns `Locked`)
    /// - The log is corrupted
    /// - I/O errors occur
    pub fn open_with_options(dir: &Path, options: FileStoreOptions) -> StorageResult<Self> {
        if !dir.exists() {
            if options.create_if_missing {
                fs::create_dir_all(dir)?;
            } else {
                return Err(StorageError::Io(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("store directory does not exist: {}", dir.display()),
                )));
            }
        }

        let lock_file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(dir.join(LOCK_FILE))?;
        if lock_file.try_lock_exclusive().is_err() {
            return Err(StorageError::Locked);
        }

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(dir.join(LOG_FILE))?;

        let mut data = Vec::new();
        file.read_to_end(&mut data)?;

        let memory = InMemoryStore::new();
        let valid_len = replay(&data, &memory)?;
        if valid_len < data.len() as u64 {
            file.set_len(valid_len)?;
            file.sync_all()?;
        }
        file.seek(SeekFrom::Start(valid_len))?;

        Ok(Self {
            path: dir.to_path_buf(),
            log: Mutex::new(LogFile {
                file,
                len: valid_len,
            }),
            memory,
            sync_on_write: options.sync_on_write,
            poisoned: AtomicBool::new(false),
            _lock_file: lock_file,
        })
    }

    /// Returns the store directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the sequence number of the last committed batch.
    #[must_use]
    pub fn last_sequence(&self) -> SequenceNumber {
        self.memory.last_sequence()
    }

    /// Returns the current log size in bytes.
    #[must_use]
    pub fn log_size(&self) -> u64 {
        self.log.lock().len
    }

    /// Returns true if a failed append could not be rolled back.
    #[must_use]
    pub fn is_poisoned(&self) -> bool {
        self.poisoned.load(Ordering::Acquire)
    }

    fn check_open(&self) -> StorageResult<()> {
        if self.is_poisoned() {
            return Err(StorageError::Closed);
        }
        Ok(())
    }
}

impl KvStore for FileStore {
    fn get(
        &self,
        cf: ColumnFamily,
        key: &[u8],
        snapshot: Option<&Snapshot>,
    ) -> StorageResult<Option<Vec<u8>>> {
        self.check_open()?;
        self.memory.get(cf, key, snapshot)
    }

    fn write(&self, batch: WriteBatch) -> StorageResult<()> {
        if batch.is_empty() {
            return Ok(());
        }

        let frame = encode_frame(&batch);
        let mut log = self.log.lock();
        self.check_open()?;
        let start = log.len;

        let file = &mut log.file;
        if let Err(err) = append_frame(file, &frame, self.sync_on_write) {
            // Cut off the partial frame so later appends stay readable.
            if rollback(file, start).is_err() {
                self.poisoned.store(true, Ordering::Release);
            }
            return Err(err.into());
        }

        log.len = start + frame.len() as u64;
        // Applied while the log lock is held so replay order matches commit order.
        self.memory.apply_ops(batch.into_ops());
        Ok(())
    }

    fn snapshot(&self) -> Snapshot {
        self.memory.snapshot()
    }

    fn scan_prefix(
        &self,
        cf: ColumnFamily,
        prefix: &[u8],
        snapshot: Option<&Snapshot>,
    ) -> StorageResult<Vec<(Vec<u8>, Vec<u8>)>> {
        self.check_open()?;
        self.memory.scan_prefix(cf, prefix, snapshot)
    }
}

fn append_frame(file: &mut File, frame: &[u8], sync: bool) -> std::io::Result<()> {
    file.write_all(frame)?;
    file.flush()?;
    if sync {
        file.sync_data()?;
    }
    Ok(())
}

fn rollback(file: &mut File, len: u64) -> std::io::Result<()> {
    file.set_len(len)?;
    file.seek(SeekFrom::Start(len))?;
    Ok(())
}

fn encode_frame(batch: &WriteBatch) -> Vec<u8> {
    let mut payload = Vec::with_capacity(4 + batch.payload_bytes() + batch.len() * 10);
    payload.extend_from_slice(&(batch.len() as u32).to_le_bytes());
    for op in batch.iter() {
        match op {
            BatchOp::Put { cf, key, value } => {
                payload.push(OP_PUT);
                payload.push(cf.as_byte());
                payload.extend_from_slice(&(key.len() as u32).to_le_bytes());
                payload.extend_from_slice(key);
                payload.extend_from_slice(&(value.len() as u32).to_le_bytes());
                payload.extend_from_slice(value);
            }
            BatchOp::Delete { cf, key } => {
                payload.push(OP_DELETE);
                payload.push(cf.as_byte());
                payload.extend_from_slice(&(key.len() as u32).to_le_bytes());
                payload.extend_from_slice(key);
            }
        }
    }

    let mut frame = Vec::with_capacity(FRAME_HEADER + payload.len() + FRAME_TRAILER);
    frame.extend_from_slice(&FRAME_MAGIC.to_le_bytes());
    frame.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    frame.extend_from_slice(&payload);
    frame.extend_from_slice(&compute_crc32(&payload).to_le_bytes());
    frame
}

/// Replays every complete frame into `memory`, returning the length of the
/// valid log prefix.
fn replay(data: &[u8], memory: &InMemoryStore) -> StorageResult<u64> {
    let mut offset = 0usize;

    while offset < data.len() {
        let rest = &data[offset..];
        if rest.len() < FRAME_HEADER {
            break;
        }

        let magic = read_u32(rest, 0);
        if magic != FRAME_MAGIC {
            return Err(StorageError::corrupted(format!(
                "bad frame magic {magic:08x} at offset {offset}"
            )));
        }

        let payload_len = read_u32(rest, 4) as usize;
        let frame_len = FRAME_HEADER + payload_len + FRAME_TRAILER;
        if rest.len() < frame_len {
            break;
        }

        let payload = &rest[FRAME_HEADER..FRAME_HEADER + payload_len];
        let expected = read_u32(rest, FRAME_HEADER + payload_len);
        let actual = compute_crc32(payload);
        if expected != actual {
            return Err(StorageError::ChecksumMismatch { expected, actual });
        }

        let batch = decode_payload(payload)
            .ok_or_else(|| StorageError::corrupted(format!("malformed batch at offset {offset}")))?;
        memory.apply_ops(batch.into_ops());

        offset += frame_len;
    }

    Ok(offset as u64)
}

fn decode_payload(payload: &[u8]) -> Option<WriteBatch> {
    let mut cursor = Cursor { data: payload, pos: 0 };
    let count = cursor.u32()?;
    let mut ops = Vec::with_capacity(count.min(1024) as usize);

    for _ in 0..count {
        let kind = cursor.u8()?;
        let cf = ColumnFamily::from_byte(cursor.u8()?)?;
        let key = cursor.bytes()?;
        let op = match kind {
            OP_PUT => BatchOp::Put {
                cf,
                key,
                value: cursor.bytes()?,
            },
            OP_DELETE => BatchOp::Delete { cf, key },
            _ => return None,
        };
        ops.push(op);
    }

    (cursor.pos == payload.len()).then(|| WriteBatch::from_ops(ops))
}

struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl Cursor<'_> {
    fn u8(&mut self) -> Option<u8> {
        let b = *self.data.get(self.pos)?;
        self.pos += 1;
        Some(b)
    }

    fn u32(&mut self) -> Option<u32> {
        let end = self.pos.checked_add(4)?;
        let bytes = self.data.get(self.pos..end)?;
        self.pos = end;
        Some(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn bytes(&mut self) -> Option<Vec<u8>> {
        let len = self.u32()? as usize;
        let end = self.pos.checked_add(len)?;
        let bytes = self.data.get(self.pos..end)?.to_vec();
        self.pos = end;
        Some(bytes)
    }
}

fn read_u32(data: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([data[at], data[at + 1], data[at + 2], data[at + 3]])
}

/// Computes CRC32 (IEEE polynomial) over `data`.
fn compute_crc32(data: &[u8]) -> u32 {
    const CRC32_TABLE: [u32; 256] = {
        let mut table = [0u32; 256];
        let mut i = 0;
        while i < 256 {
            let mut crc = i as u32;
            let mut j = 0;
            while j < 8 {
                if crc & 1 != 0 {
                    crc = (crc >> 1) ^ 0xEDB8_8320;
                } else {
                    crc >>= 1;
                }
                j += 1;
            }
            table[i] = crc;
            i += 1;
        }
        table
    };

    let mut crc = 0xFFFF_FFFF_u32;
    for &byte in data {
        let index = ((crc ^ u32::from(byte)) & 0xFF) as usize;
        crc = (crc >> 8) ^ CRC32_TABLE[index];
    }
    !crc
}
