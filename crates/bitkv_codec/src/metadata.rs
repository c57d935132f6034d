//! The metadata record shared by all data types.
//!
//! ## Record Format
//!
//! ```text
//! | flags (1) | expire_ms (8) | version (8) | size (8) |
//! ```
//!
//! The low nibble of `flags` is the [`DataType`]. Plain strings carry only
//! `flags` and `expire_ms`; every other type carries all four fields.
//! Integers are little-endian.

use crate::error::{CodecError, CodecResult};
use bytes::{Buf, BufMut};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

const TYPE_MASK: u8 = 0x0f;
const STRING_LEN: usize = 1 + 8;
const FULL_LEN: usize = STRING_LEN + 8 + 8;

/// Bits of a version reserved for the per-microsecond counter.
const VERSION_COUNTER_BITS: u32 = 11;

/// The kind of value a key holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum DataType {
    /// No value (absent or expired key).
    None = 0,
    /// Plain string.
    String = 1,
    /// Field-value hash.
    Hash = 2,
    /// List.
    List = 3,
    /// Unordered set.
    Set = 4,
    /// Sorted set.
    ZSet = 5,
    /// Segmented bitmap.
    Bitmap = 6,
    /// Sorted integer set.
    SortedInt = 7,
}

impl DataType {
    /// Returns the on-disk tag.
    #[must_use]
    pub const fn as_byte(self) -> u8 {
        self as u8
    }

    /// Parses an on-disk tag.
    ///
    /// # Errors
    ///
    /// Returns `UnknownDataType` for tags no data type uses.
    pub fn from_byte(b: u8) -> CodecResult<Self> {
        Ok(match b {
            0 => Self::None,
            1 => Self::String,
            2 => Self::Hash,
            3 => Self::List,
            4 => Self::Set,
            5 => Self::ZSet,
            6 => Self::Bitmap,
            7 => Self::SortedInt,
            other => return Err(CodecError::UnknownDataType(other)),
        })
    }

    /// Returns the lowercase type name as reported by a `TYPE` command.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::String => "string",
            Self::Hash => "hash",
            Self::List => "list",
            Self::Set => "set",
            Self::ZSet => "zset",
            Self::Bitmap => "bitmap",
            Self::SortedInt => "sortedint",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Metadata record stored under a namespaced key.
///
/// `version` namespaces every sub-key written for this generation of the
/// key; `size` is type specific (bytes for a bitmap, element count for
/// collections).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Metadata {
    /// Type of the value.
    pub data_type: DataType,
    /// Absolute expiry in unix milliseconds; 0 means no expiry.
    pub expire_ms: u64,
    /// Generation of the key.
    pub version: u64,
    /// Type-specific size.
    pub size: u64,
}

impl Metadata {
    /// Creates an empty, non-expiring record with a fresh version.
    #[must_use]
    pub fn new(data_type: DataType) -> Self {
        Self {
            data_type,
            expire_ms: 0,
            version: generate_version(),
            size: 0,
        }
    }

    /// Returns whether the record had expired at `now_ms`.
    #[must_use]
    pub const fn is_expired(&self, now_ms: u64) -> bool {
        self.expire_ms != 0 && self.expire_ms <= now_ms
    }

    /// Remaining time to live at `now_ms`, `None` if the key never expires.
    #[must_use]
    pub const fn ttl_ms(&self, now_ms: u64) -> Option<u64> {
        if self.expire_ms == 0 {
            None
        } else {
            Some(self.expire_ms.saturating_sub(now_ms))
        }
    }

    /// Encodes the record.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(FULL_LEN);
        buf.put_u8(self.data_type.as_byte() & TYPE_MASK);
        buf.put_u64_le(self.expire_ms);
        if self.data_type != DataType::String {
            buf.put_u64_le(self.version);
            buf.put_u64_le(self.size);
        }
        buf
    }

    /// Decodes a record produced by [`Metadata::encode`].
    ///
    /// # Errors
    ///
    /// Returns an error on truncated input or an unknown type tag.
    pub fn decode(mut bytes: &[u8]) -> CodecResult<Self> {
        CodecError::ensure(STRING_LEN, bytes.remaining())?;
        let data_type = DataType::from_byte(bytes.get_u8() & TYPE_MASK)?;
        let expire_ms = bytes.get_u64_le();

        if data_type == DataType::String {
            return Ok(Self {
                data_type,
                expire_ms,
                version: 0,
                size: 0,
            });
        }

        CodecError::ensure(FULL_LEN - STRING_LEN, bytes.remaining())?;
        let version = bytes.get_u64_le();
        let size = bytes.get_u64_le();
        Ok(Self {
            data_type,
            expire_ms,
            version,
            size,
        })
    }
}

/// Returns the current unix time in milliseconds.
#[must_use]
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_millis() as u64)
}

/// Generates a process-wide strictly increasing key version.
///
/// The high bits carry the current unix time in microseconds, the low
/// bits a counter, so a key recreated after a restart still gets a version
/// newer than any it had before.
#[must_use]
pub fn generate_version() -> u64 {
    static LAST: AtomicU64 = AtomicU64::new(0);

    let micros = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_micros() as u64);
    let candidate = micros << VERSION_COUNTER_BITS;

    let previous = LAST
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
            Some(candidate.max(last + 1))
        })
        .unwrap_or(candidate);
    candidate.max(previous + 1)
}
