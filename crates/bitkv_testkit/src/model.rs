//! Reference bitmap model.
//!
//! [`BitmapModel`] keeps one bitmap in plain memory and answers the same
//! queries as the engine, with the same range rules and the same segment
//! growth. Property tests drive both with identical operations and compare
//! every answer.

use bitkv_core::bitmap::{SEGMENT_BITS, SEGMENT_BYTES};
use std::collections::BTreeMap;

/// In-memory reference for a single bitmap key.
#[derive(Debug, Clone, Default)]
pub struct BitmapModel {
    /// Segment number to stored bytes.
    segments: BTreeMap<u64, Vec<u8>>,
    /// Recorded size in bytes; 0 means the key does not exist.
    size: u64,
}

impl BitmapModel {
    /// Creates an empty (missing) bitmap.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Recorded size in bytes.
    #[must_use]
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Whether the key exists.
    #[must_use]
    pub fn exists(&self) -> bool {
        self.size > 0
    }

    /// Forgets every bit, like deleting the key.
    pub fn clear(&mut self) {
        self.segments.clear();
        self.size = 0;
    }

    /// Sets one bit, returning its previous value.
    pub fn set_bit(&mut self, offset: u64, value: bool) -> bool {
        let index = offset / SEGMENT_BITS;
        let byte = ((offset / 8) % SEGMENT_BYTES) as usize;
        let bytes = self.segments.entry(index).or_default();

        if byte >= bytes.len() {
            let len = bytes.len();
            let target = if byte >= len * 2 { byte + 1 } else { len * 2 };
            bytes.resize(target.min(SEGMENT_BYTES as usize), 0);
            self.size = self.size.max(index * SEGMENT_BYTES + bytes.len() as u64);
        }

        let mask = 1u8 << (offset % 8);
        let old = bytes[byte] & mask != 0;
        if value {
            bytes[byte] |= mask;
        } else {
            bytes[byte] &= !mask;
        }
        old
    }

    /// Reads one bit.
    #[must_use]
    pub fn get_bit(&self, offset: u64) -> bool {
        self.byte(offset / 8) >> (offset % 8) & 1 == 1
    }

    /// Counts set bits with the engine's byte range rules.
    #[must_use]
    pub fn bit_count(&self, start: i64, stop: i64) -> u64 {
        let size = i128::from(self.size);
        let mut start = i128::from(start);
        let mut stop = i128::from(stop);
        if start < 0 {
            start += size;
        }
        if stop < 0 {
            stop += size;
        }
        if stop > size {
            stop = size;
        }
        if start < 0 || stop <= 0 || start >= stop {
            return 0;
        }

        (start as u64..=stop as u64)
            .map(|i| u64::from(self.byte(i).count_ones()))
            .sum()
    }

    /// Finds a bit with the engine's byte range rules.
    ///
    /// Returns `None` when the answer is past `i64::MAX`, where the engine
    /// reports an invalid argument.
    #[must_use]
    pub fn bit_pos(&self, bit: bool, start: i64, stop: i64) -> Option<i64> {
        if !self.exists() {
            return Some(if bit { -1 } else { 0 });
        }

        let size = i128::from(self.size);
        let mut start = i128::from(start);
        let mut stop = i128::from(stop);
        if start < 0 {
            start += size;
        }
        if stop < 0 {
            stop += size;
        }
        if start < 0 || stop < 0 || start > stop {
            return Some(-1);
        }
        let (start, stop) = (start as u64, stop as u64);

        let seg = SEGMENT_BYTES;
        let mut last = stop / seg;
        if bit {
            last = last.min(self.segments.keys().next_back().copied().unwrap_or(0));
        }
        for index in start / seg..=last {
            let Some(bytes) = self.segments.get(&index) else {
                if bit {
                    continue;
                }
                return position(index, 0);
            };

            let from = if index == start / seg { (start % seg) as usize } else { 0 };
            let to = if index == stop / seg {
                ((stop % seg) as usize + 1).min(bytes.len())
            } else {
                bytes.len()
            };
            for (j, byte) in bytes.iter().enumerate().take(to).skip(from) {
                for b in 0..8 {
                    if (byte >> b & 1 == 1) == bit {
                        return position(index, j * 8 + b);
                    }
                }
            }

            if !bit && (bytes.len() as u64) < seg {
                return position(index, bytes.len() * 8);
            }
        }

        if bit {
            Some(-1)
        } else {
            i64::try_from(i128::from(self.size) * 8).ok()
        }
    }

    fn byte(&self, byte_offset: u64) -> u8 {
        self.segments
            .get(&(byte_offset / SEGMENT_BYTES))
            .and_then(|bytes| bytes.get((byte_offset % SEGMENT_BYTES) as usize))
            .copied()
            .unwrap_or(0)
    }
}

/// Absolute offset of bit `bit` in segment `index`, if it fits an `i64`.
fn position(index: u64, bit: usize) -> Option<i64> {
    let offset = i128::from(index) * i128::from(SEGMENT_BITS) + bit as i128;
    i64::try_from(offset).ok()
}
