//! Stored segment values.

use super::addressing::SEGMENT_BYTES;

/// A segment as read from the store.
///
/// An absent segment is logically all zero bits, of any length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Stored bytes; anything past their end is zero.
    Present(Vec<u8>),
    /// Never written.
    Absent,
}

impl Segment {
    /// Wraps a raw store lookup.
    #[must_use]
    pub fn from_lookup(value: Option<Vec<u8>>) -> Self {
        value.map_or(Self::Absent, Self::Present)
    }

    /// Stored bytes, empty when absent.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        match self {
            Self::Present(bytes) => bytes,
            Self::Absent => &[],
        }
    }

    /// Consumes the segment, yielding its stored bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            Self::Present(bytes) => bytes,
            Self::Absent => Vec::new(),
        }
    }

    /// Reads one bit, zero-extending past the stored bytes.
    #[must_use]
    pub fn bit(&self, byte_index: usize, bit_index: u32) -> bool {
        self.bytes()
            .get(byte_index)
            .is_some_and(|byte| (byte >> bit_index) & 1 == 1)
    }
}

/// Length a segment of `current` bytes grows to so it holds `byte_index`.
///
/// Small jumps double the segment, large jumps allocate exactly up to the
/// target byte. Never exceeds [`SEGMENT_BYTES`].
#[must_use]
pub fn grown_len(current: usize, byte_index: usize) -> usize {
    let target = if byte_index >= current * 2 {
        byte_index + 1
    } else {
        current * 2
    };
    target.min(SEGMENT_BYTES as usize)
}
