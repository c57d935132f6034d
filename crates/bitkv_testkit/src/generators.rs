//! Property-based test generators using proptest.
//!
//! Provides strategies for bit offsets, byte ranges and operation sequences
//! that concentrate on segment boundaries.

use bitkv_core::bitmap::{SEGMENT_BITS, SEGMENT_BYTES};
use proptest::prelude::*;

/// Strategy for bit offsets.
///
/// Mixes the first bytes, the area around the first segment boundaries and
/// offsets spread over a few segments.
pub fn bit_offset_strategy() -> impl Strategy<Value = u64> {
    prop_oneof![
        3 => 0u64..64,
        2 => (SEGMENT_BITS - 16)..(SEGMENT_BITS + 16),
        1 => (2 * SEGMENT_BITS - 16)..(2 * SEGMENT_BITS + 16),
        2 => 0u64..(4 * SEGMENT_BITS),
    ]
}

/// Strategy for byte range bounds, negative values and bounds near
/// `i64::MAX` included.
pub fn byte_index_strategy() -> impl Strategy<Value = i64> {
    prop_oneof![
        2 => -16i64..16,
        1 => -1100i64..1100,
        1 => -4200i64..4200,
        1 => (i64::MAX - 2 * SEGMENT_BYTES as i64)..=i64::MAX,
    ]
}

/// A bitmap command.
#[derive(Debug, Clone)]
pub enum BitmapOperation {
    /// Set a bit
    SetBit {
        /// Bit offset
        offset: u64,
        /// New value
        value: bool,
    },
    /// Read a bit
    GetBit {
        /// Bit offset
        offset: u64,
    },
    /// Count set bits in a byte range
    BitCount {
        /// First byte
        start: i64,
        /// Last byte
        stop: i64,
    },
    /// Find a bit in a byte range
    BitPos {
        /// Bit to look for
        bit: bool,
        /// First byte
        start: i64,
        /// Last byte
        stop: i64,
    },
    /// Delete the key
    Delete,
}

/// Strategy for generating bitmap operations.
pub fn bitmap_operation_strategy() -> impl Strategy<Value = BitmapOperation> {
    prop_oneof![
        6 => (bit_offset_strategy(), prop::bool::weighted(0.8))
            .prop_map(|(offset, value)| BitmapOperation::SetBit { offset, value }),
        2 => bit_offset_strategy().prop_map(|offset| BitmapOperation::GetBit { offset }),
        2 => (byte_index_strategy(), byte_index_strategy())
            .prop_map(|(start, stop)| BitmapOperation::BitCount { start, stop }),
        2 => (any::<bool>(), byte_index_strategy(), byte_index_strategy())
            .prop_map(|(bit, start, stop)| BitmapOperation::BitPos { bit, start, stop }),
        1 => Just(BitmapOperation::Delete),
    ]
}

/// Strategy for generating a sequence of operations.
pub fn operation_sequence_strategy(
    min_ops: usize,
    max_ops: usize,
) -> impl Strategy<Value = Vec<BitmapOperation>> {
    prop::collection::vec(bitmap_operation_strategy(), min_ops..max_ops)
}

/// Configuration for property tests.
#[derive(Debug, Clone)]
pub struct PropTestConfig {
    /// Number of test cases to run.
    pub cases: u32,
    /// Maximum shrink iterations.
    pub max_shrink_iters: u32,
}

impl Default for PropTestConfig {
    fn default() -> Self {
        Self {
            cases: 256,
            max_shrink_iters: 1000,
        }
    }
}

impl PropTestConfig {
    /// Creates a configuration for quick tests.
    #[must_use]
    pub fn quick() -> Self {
        Self {
            cases: 32,
            max_shrink_iters: 100,
        }
    }

    /// Converts to proptest config.
    #[must_use]
    pub fn to_proptest_config(&self) -> ProptestConfig {
        ProptestConfig {
            cases: self.cases,
            max_shrink_iters: self.max_shrink_iters,
            ..ProptestConfig::default()
        }
    }
}
