//! Mapping of bit and byte offsets onto segments.
//!
//! A bitmap is cut into segments of [`SEGMENT_BYTES`] bytes. Segment `n`
//! covers bytes `[n * SEGMENT_BYTES, (n + 1) * SEGMENT_BYTES)` and is stored
//! under the decimal text of its first byte offset. Bit 0 of a byte is its
//! least-significant bit.

use bitkv_codec::InternalKey;

/// Maximum stored length of one segment.
pub const SEGMENT_BYTES: u64 = 1024;

/// Bits covered by one segment.
pub const SEGMENT_BITS: u64 = SEGMENT_BYTES * 8;

/// First byte offset of the segment holding `bit_offset`.
///
/// Always a multiple of [`SEGMENT_BYTES`].
#[must_use]
pub const fn segment_id(bit_offset: u64) -> u64 {
    bit_offset / SEGMENT_BITS * SEGMENT_BYTES
}

/// Byte index of `bit_offset` inside its segment.
#[must_use]
pub const fn byte_in_segment(bit_offset: u64) -> usize {
    ((bit_offset / 8) % SEGMENT_BYTES) as usize
}

/// Bit index of `bit_offset` inside its byte.
#[must_use]
pub const fn bit_in_byte(bit_offset: u64) -> u32 {
    (bit_offset % 8) as u32
}

/// Segment number holding `byte_offset`.
#[must_use]
pub const fn segment_index_for_byte(byte_offset: u64) -> u64 {
    byte_offset / SEGMENT_BYTES
}

/// Physical key of the segment starting at byte `segment_start`.
#[must_use]
pub fn segment_key(ns_key: &[u8], segment_start: u64, version: u64) -> Vec<u8> {
    InternalKey::new(ns_key, segment_start.to_string().as_bytes(), version).encode()
}
