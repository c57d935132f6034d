//! Segmented bitmaps.
//!
//! A bitmap is a zero-extended bit sequence stored as a metadata record
//! (`size` in bytes, `version`) plus up to [`SEGMENT_BYTES`]-byte segments,
//! each under its own sub-key.
//!
//! ## Consistency
//!
//! - Writers hold the per-key lock; a segment and the metadata it grows are
//!   committed in one atomic batch.
//! - Readers never lock. Every read takes one store snapshot before touching
//!   metadata and reads all segments through it.
//! - Segments are versioned with their metadata record, so a deleted or
//!   expired bitmap's segments are never read by its successor.

mod addressing;
mod popcount;
mod segment;

pub use addressing::{
    bit_in_byte, byte_in_segment, segment_id, segment_index_for_byte, segment_key, SEGMENT_BITS,
    SEGMENT_BYTES,
};
pub use popcount::{count_ones, POPCOUNT};
pub use segment::{grown_len, Segment};

use crate::database::Database;
use crate::error::{CoreError, CoreResult};
use bitkv_codec::{DataType, Metadata};
use bitkv_storage::{ColumnFamily, Snapshot, WriteBatch};
use tracing::{debug, trace};

/// Bitmap operations on a [`Database`].
///
/// Obtained through [`Database::bitmap`].
///
/// # Example
///
/// ```rust
/// use bitkv_core::Database;
///
/// let db = Database::open_in_memory().unwrap();
/// let bitmap = db.bitmap();
///
/// assert!(!bitmap.set_bit(b"bm", 7, true).unwrap());
/// assert!(!bitmap.set_bit(b"bm", 100, true).unwrap());
/// assert!(bitmap.get_bit(b"bm", 7).unwrap());
/// assert_eq!(bitmap.bit_count(b"bm", 0, -1).unwrap(), 2);
/// assert_eq!(bitmap.bit_pos(b"bm", true, 0, -1).unwrap(), 7);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct Bitmap<'a> {
    db: &'a Database,
}

impl<'a> Bitmap<'a> {
    pub(crate) fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Reads the bit at `offset`.
    ///
    /// Bits past the end of the bitmap, and bits of a missing key, are zero.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails or the key holds another type.
    pub fn get_bit(&self, key: &[u8], offset: u64) -> CoreResult<bool> {
        self.db.stats().record_bit_read();
        let ns_key = self.db.namespace_key(key)?;

        let snapshot = self.db.store().snapshot();
        let Some(metadata) = self.metadata(&ns_key, Some(&snapshot))? else {
            return Ok(false);
        };

        let segment = self.fetch(&ns_key, segment_id(offset), &metadata, Some(&snapshot))?;
        Ok(segment.bit(byte_in_segment(offset), bit_in_byte(offset)))
    }

    /// Sets the bit at `offset` to `value`, returning its previous value.
    ///
    /// The segment grows as needed; the recorded size follows it in the same
    /// atomic batch.
    ///
    /// # Errors
    ///
    /// Returns `OffsetOutOfRange` above the configured maximum offset, or an
    /// error if the store fails or the key holds another type.
    pub fn set_bit(&self, key: &[u8], offset: u64, value: bool) -> CoreResult<bool> {
        let max = self.db.config().max_bit_offset;
        if offset > max {
            return Err(CoreError::OffsetOutOfRange { offset, max });
        }

        self.db.stats().record_bit_write();
        let ns_key = self.db.namespace_key(key)?;
        let _guard = self.db.locks().lock(&ns_key);

        let existing = self.metadata(&ns_key, None)?;
        let mut metadata = existing.unwrap_or_else(|| {
            let fresh = Metadata::new(DataType::Bitmap);
            debug!(version = fresh.version, "creating bitmap");
            fresh
        });

        let segment_start = segment_id(offset);
        let sub_key = segment_key(&ns_key, segment_start, metadata.version);
        let mut bytes = match existing {
            Some(_) => self.fetch_key(&sub_key, None)?.into_bytes(),
            // A fresh version owns no segments yet.
            None => Vec::new(),
        };

        let byte_index = byte_in_segment(offset);
        let mut size = metadata.size;
        if byte_index >= bytes.len() {
            let new_len = grown_len(bytes.len(), byte_index);
            trace!(segment_start, from = bytes.len(), to = new_len, "growing segment");
            bytes.resize(new_len, 0);
            size = size.max(segment_start + new_len as u64);
        }

        let mask = 1u8 << bit_in_byte(offset);
        let old = bytes[byte_index] & mask != 0;
        if value {
            bytes[byte_index] |= mask;
        } else {
            bytes[byte_index] &= !mask;
        }

        let mut batch = WriteBatch::new();
        batch.put(ColumnFamily::SubKey, sub_key, bytes);
        if size != metadata.size {
            debug!(old_size = metadata.size, new_size = size, "bitmap size changed");
            metadata.size = size;
            batch.put(ColumnFamily::Metadata, ns_key, metadata.encode());
        }
        self.db.commit(batch)?;

        Ok(old)
    }

    /// Counts set bits in the byte range `start..=stop`.
    ///
    /// Negative indices count back from the end of the bitmap. `stop` is
    /// clamped to the bitmap size. An empty range after adjustment, or
    /// `start >= stop`, counts 0.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails or the key holds another type.
    pub fn bit_count(&self, key: &[u8], start: i64, stop: i64) -> CoreResult<u64> {
        self.db.stats().record_range_scan();
        let ns_key = self.db.namespace_key(key)?;

        let snapshot = self.db.store().snapshot();
        let Some(metadata) = self.metadata(&ns_key, Some(&snapshot))? else {
            return Ok(0);
        };
        let Some((start, stop)) = count_range(start, stop, metadata.size) else {
            return Ok(0);
        };

        let start_index = segment_index_for_byte(start);
        let stop_index = segment_index_for_byte(stop);
        let mut count = 0;

        // One segment in memory at a time.
        for index in start_index..=stop_index {
            let segment = self.fetch(&ns_key, index * SEGMENT_BYTES, &metadata, Some(&snapshot))?;
            let Segment::Present(bytes) = segment else {
                continue;
            };

            let (from, to) = scan_bounds(index, start_index, stop_index, start, stop, bytes.len());
            if from < to {
                count += count_ones(&bytes[from..to]);
            }
        }

        Ok(count)
    }

    /// Finds the first bit equal to `bit` in the byte range `start..=stop`.
    ///
    /// Returns the absolute bit offset, or `-1` when there is none. A search
    /// for a clear bit may land past the stored data, since the bitmap is
    /// zero-extended; `stop` is not clamped to the bitmap size.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails or the key holds another type.
    pub fn bit_pos(&self, key: &[u8], bit: bool, start: i64, stop: i64) -> CoreResult<i64> {
        self.db.stats().record_range_scan();
        let ns_key = self.db.namespace_key(key)?;

        let snapshot = self.db.store().snapshot();
        let Some(metadata) = self.metadata(&ns_key, Some(&snapshot))? else {
            return Ok(if bit { -1 } else { 0 });
        };
        let Some((start, stop)) = pos_range(start, stop, metadata.size) else {
            return Ok(-1);
        };

        let start_index = segment_index_for_byte(start);
        let stop_index = segment_index_for_byte(stop);
        // No segment exists at or past `size`; a set bit cannot be there.
        let last_index = if bit {
            stop_index.min(segment_index_for_byte(metadata.size - 1))
        } else {
            stop_index
        };

        for index in start_index..=last_index {
            let segment = self.fetch(&ns_key, index * SEGMENT_BYTES, &metadata, Some(&snapshot))?;
            let bytes = match segment {
                Segment::Present(bytes) => bytes,
                Segment::Absent if bit => continue,
                Segment::Absent => return to_position(index, 0),
            };

            let (from, to) = scan_bounds(index, start_index, stop_index, start, stop, bytes.len());
            for (j, &byte) in bytes.iter().enumerate().take(to).skip(from) {
                if let Some(offset) = first_bit_in_byte(byte, bit) {
                    return to_position(index, j as u64 * 8 + offset);
                }
            }

            if !bit && (bytes.len() as u64) < SEGMENT_BYTES {
                return to_position(index, bytes.len() as u64 * 8);
            }
        }

        if bit {
            Ok(-1)
        } else {
            to_position(
                segment_index_for_byte(metadata.size),
                metadata.size % SEGMENT_BYTES * 8,
            )
        }
    }

    /// Returns the recorded size of the bitmap in bytes, 0 if it is missing.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails or the key holds another type.
    pub fn byte_len(&self, key: &[u8]) -> CoreResult<u64> {
        let ns_key = self.db.namespace_key(key)?;
        Ok(self.metadata(&ns_key, None)?.map_or(0, |m| m.size))
    }

    fn metadata(&self, ns_key: &[u8], snapshot: Option<&Snapshot>) -> CoreResult<Option<Metadata>> {
        self.db.get_metadata(DataType::Bitmap, ns_key, snapshot)
    }

    fn fetch(
        &self,
        ns_key: &[u8],
        segment_start: u64,
        metadata: &Metadata,
        snapshot: Option<&Snapshot>,
    ) -> CoreResult<Segment> {
        self.fetch_key(&segment_key(ns_key, segment_start, metadata.version), snapshot)
    }

    fn fetch_key(&self, sub_key: &[u8], snapshot: Option<&Snapshot>) -> CoreResult<Segment> {
        let value = self
            .db
            .store()
            .get(ColumnFamily::SubKey, sub_key, snapshot)
            .inspect_err(|_| self.db.stats().record_error())?;
        self.db.stats().record_segment_fetch(value.is_some());
        Ok(Segment::from_lookup(value))
    }
}

/// Normalizes a `bit_count` byte range against `size`.
fn count_range(start: i64, stop: i64, size: u64) -> Option<(u64, u64)> {
    let size = i64::try_from(size).unwrap_or(i64::MAX);
    let start = if start < 0 { start.saturating_add(size) } else { start };
    let stop = if stop < 0 { stop.saturating_add(size) } else { stop };
    let stop = stop.min(size);
    if start < 0 || stop <= 0 || start >= stop {
        return None;
    }
    Some((start as u64, stop as u64))
}

/// Normalizes a `bit_pos` byte range against `size`. `stop` is not clamped.
fn pos_range(start: i64, stop: i64, size: u64) -> Option<(u64, u64)> {
    let size = i64::try_from(size).unwrap_or(i64::MAX);
    let start = if start < 0 { start.saturating_add(size) } else { start };
    let stop = if stop < 0 { stop.saturating_add(size) } else { stop };
    if start < 0 || stop < 0 || start > stop {
        return None;
    }
    Some((start as u64, stop as u64))
}

/// Byte window `from..to` to scan inside segment `index`.
///
/// The first segment starts at `start`, the last one ends after the byte at
/// `stop` (inclusive); both are clipped to the stored length.
fn scan_bounds(
    index: u64,
    start_index: u64,
    stop_index: u64,
    start: u64,
    stop: u64,
    stored: usize,
) -> (usize, usize) {
    let from = if index == start_index {
        (start % SEGMENT_BYTES) as usize
    } else {
        0
    };
    let to = if index == stop_index {
        ((stop % SEGMENT_BYTES) as usize + 1).min(stored)
    } else {
        stored
    };
    (from, to)
}

/// Index of the least-significant bit of `byte` equal to `bit`.
fn first_bit_in_byte(byte: u8, bit: bool) -> Option<u64> {
    let wanted = if bit { byte } else { !byte };
    (wanted != 0).then(|| u64::from(wanted.trailing_zeros()))
}

/// Absolute offset of bit `bit_in_segment` of segment `index`.
///
/// Fails when the offset does not fit an `i64`, which byte ranges near
/// `i64::MAX` can reach.
fn to_position(index: u64, bit_in_segment: u64) -> CoreResult<i64> {
    index
        .checked_mul(SEGMENT_BITS)
        .and_then(|base| base.checked_add(bit_in_segment))
        .and_then(|offset| i64::try_from(offset).ok())
        .ok_or_else(|| {
            CoreError::invalid_argument(format!("bit position in segment {index} overflows"))
        })
}
