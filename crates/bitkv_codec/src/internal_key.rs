//! Physical keys of sub-keys.
//!
//! ```text
//! | ns_key_len (4 LE) | ns_key | version (8 BE) | sub_key |
//! ```
//!
//! The version is big-endian so all sub-keys of one generation of a key
//! sort contiguously, after any older generation's leftovers.

use crate::error::{CodecError, CodecResult};
use bytes::{Buf, BufMut};

/// A sub-key owned by one generation of a namespaced key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InternalKey {
    ns_key: Vec<u8>,
    sub_key: Vec<u8>,
    version: u64,
}

impl InternalKey {
    /// Creates a new internal key.
    #[must_use]
    pub fn new(ns_key: &[u8], sub_key: &[u8], version: u64) -> Self {
        Self {
            ns_key: ns_key.to_vec(),
            sub_key: sub_key.to_vec(),
            version,
        }
    }

    /// The namespaced key that owns this sub-key.
    #[must_use]
    pub fn ns_key(&self) -> &[u8] {
        &self.ns_key
    }

    /// The type-specific sub-key.
    #[must_use]
    pub fn sub_key(&self) -> &[u8] {
        &self.sub_key
    }

    /// The generation this sub-key belongs to.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Encodes the key.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Self::prefix(&self.ns_key, self.version);
        buf.put_slice(&self.sub_key);
        buf
    }

    /// Returns the common prefix of every sub-key of `ns_key` at `version`.
    #[must_use]
    pub fn prefix(ns_key: &[u8], version: u64) -> Vec<u8> {
        let mut buf = Vec::with_capacity(4 + ns_key.len() + 8 + 20);
        buf.put_u32_le(ns_key.len() as u32);
        buf.put_slice(ns_key);
        buf.put_u64(version);
        buf
    }

    /// Decodes a key produced by [`InternalKey::encode`].
    ///
    /// # Errors
    ///
    /// Returns an error on truncated input.
    pub fn decode(mut bytes: &[u8]) -> CodecResult<Self> {
        CodecError::ensure(4, bytes.remaining())?;
        let ns_len = bytes.get_u32_le() as usize;
        CodecError::ensure(ns_len + 8, bytes.remaining())?;
        let ns_key = bytes[..ns_len].to_vec();
        bytes.advance(ns_len);
        let version = bytes.get_u64();
        Ok(Self {
            ns_key,
            sub_key: bytes.to_vec(),
            version,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn internal_key_roundtrip() {
        let key = InternalKey::new(b"\x02nskey", b"2048", 7);
        let decoded = InternalKey::decode(&key.encode()).unwrap();
        assert_eq!(decoded, key);
        assert_eq!(decoded.sub_key(), b"2048");
        assert_eq!(decoded.version(), 7);
    }

    #[test]
    fn generations_do_not_share_prefix() {
        let old = InternalKey::new(b"k", b"0", 1).encode();
        let new = InternalKey::new(b"k", b"0", 2).encode();
        assert_ne!(old, new);
        assert!(old.starts_with(&InternalKey::prefix(b"k", 1)));
        assert!(!old.starts_with(&InternalKey::prefix(b"k", 2)));
        assert!(old < new);
    }

    #[test]
    fn key_prefix_of_other_key_does_not_alias() {
        let short = InternalKey::new(b"ab", b"0", 1).encode();
        let long = InternalKey::new(b"abc", b"0", 1).encode();
        assert!(!long.starts_with(&InternalKey::prefix(b"ab", 1)));
        assert_ne!(short, long);
    }

    #[test]
    fn decode_truncated_fails() {
        let bytes = InternalKey::new(b"key", b"", 1).encode();
        assert!(InternalKey::decode(&bytes[..bytes.len() - 1]).is_err());
        assert!(InternalKey::decode(&bytes[..2]).is_err());
    }

    proptest! {
        #[test]
        fn version_order_is_key_order(
            ns_key in prop::collection::vec(any::<u8>(), 0..16),
            a in any::<u64>(),
            b in any::<u64>(),
            sub_key in prop::collection::vec(any::<u8>(), 0..8),
        ) {
            let ka = InternalKey::new(&ns_key, &sub_key, a).encode();
            let kb = InternalKey::new(&ns_key, &sub_key, b).encode();
            prop_assert_eq!(a.cmp(&b), ka.cmp(&kb));
        }
    }
}
