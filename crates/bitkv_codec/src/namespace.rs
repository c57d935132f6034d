//! User key to storage key mapping.
//!
//! ```text
//! | ns_len (1) | namespace | user_key |
//! ```

use crate::error::{CodecError, CodecResult};

/// Longest namespace the one-byte length prefix can describe.
pub const MAX_NAMESPACE_LEN: usize = u8::MAX as usize;

/// Prefixes `user_key` with its namespace.
///
/// The length prefix makes the mapping collision-free: two different
/// `(namespace, user_key)` pairs never produce the same storage key.
///
/// # Errors
///
/// Returns `NamespaceTooLong` if the namespace exceeds [`MAX_NAMESPACE_LEN`].
pub fn namespace_key(namespace: &str, user_key: &[u8]) -> CodecResult<Vec<u8>> {
    let ns = namespace.as_bytes();
    if ns.len() > MAX_NAMESPACE_LEN {
        return Err(CodecError::NamespaceTooLong {
            len: ns.len(),
            max: MAX_NAMESPACE_LEN,
        });
    }

    let mut key = Vec::with_capacity(1 + ns.len() + user_key.len());
    key.push(ns.len() as u8);
    key.extend_from_slice(ns);
    key.extend_from_slice(user_key);
    Ok(key)
}

/// Splits a storage key back into `(namespace, user_key)`.
///
/// # Errors
///
/// Returns an error if the length prefix points past the end of the key.
pub fn split_namespace_key(ns_key: &[u8]) -> CodecResult<(&[u8], &[u8])> {
    let (&len, rest) = ns_key
        .split_first()
        .ok_or(CodecError::UnexpectedEof {
            needed: 1,
            available: 0,
        })?;
    CodecError::ensure(len as usize, rest.len())?;
    Ok(rest.split_at(len as usize))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn namespace_prefix_layout() {
        let key = namespace_key("ns", b"key").unwrap();
        assert_eq!(key, b"\x02nskey");
        assert_eq!(split_namespace_key(&key).unwrap(), (&b"ns"[..], &b"key"[..]));
    }

    #[test]
    fn namespace_boundary_is_unambiguous() {
        let a = namespace_key("ab", b"c").unwrap();
        let b = namespace_key("a", b"bc").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn empty_namespace_and_key() {
        let key = namespace_key("", b"").unwrap();
        assert_eq!(key, vec![0]);
        assert_eq!(split_namespace_key(&key).unwrap(), (&b""[..], &b""[..]));
    }

    #[test]
    fn namespace_too_long() {
        let ns = "x".repeat(MAX_NAMESPACE_LEN + 1);
        assert!(matches!(
            namespace_key(&ns, b"k"),
            Err(CodecError::NamespaceTooLong { .. })
        ));
    }

    #[test]
    fn split_rejects_bad_prefix() {
        assert!(split_namespace_key(b"").is_err());
        assert!(split_namespace_key(b"\x09ab").is_err());
    }
}
