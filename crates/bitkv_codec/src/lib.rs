//! # bitkv Codec
//!
//! Encoding of the records every bitkv data type shares.
//!
//! This crate provides:
//! - [`Metadata`] - the per-key record holding type, expiry, version and size
//! - [`namespace_key`] - the user key to storage key mapping
//! - [`InternalKey`] - the physical key of a sub-key (bitmap segment, hash
//!   field, ...) owned by one generation of a metadata record
//!
//! ## Usage
//!
//! ```
//! use bitkv_codec::{namespace_key, DataType, InternalKey, Metadata};
//!
//! let ns_key = namespace_key("app", b"visits").unwrap();
//! let metadata = Metadata::new(DataType::Bitmap);
//!
//! let bytes = metadata.encode();
//! assert_eq!(Metadata::decode(&bytes).unwrap(), metadata);
//!
//! let segment = InternalKey::new(&ns_key, b"1024", metadata.version).encode();
//! let decoded = InternalKey::decode(&segment).unwrap();
//! assert_eq!(decoded.sub_key(), b"1024");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod internal_key;
mod metadata;
mod namespace;

pub use error::{CodecError, CodecResult};
pub use internal_key::InternalKey;
pub use metadata::{generate_version, now_ms, DataType, Metadata};
pub use namespace::{namespace_key, split_namespace_key, MAX_NAMESPACE_LEN};
