//! # bitkv Testkit
//!
//! Test utilities for bitkv.
//!
//! This crate provides:
//! - Test fixtures and database helpers
//! - Property-based test generators using proptest
//! - A reference bitmap model to check the engine against
//! - A store wrapper that injects storage failures
//! - Stress testing utilities
//!
//! ## Usage
//!
//! ```rust
//! use bitkv_testkit::prelude::*;
//!
//! with_temp_db(|db| {
//!     db.bitmap().set_bit(b"bm", 3, true).unwrap();
//!     assert!(db.bitmap().get_bit(b"bm", 3).unwrap());
//! });
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod faulty;
pub mod fixtures;
pub mod generators;
pub mod logging;
pub mod model;
pub mod stress;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::faulty::*;
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::logging::*;
    pub use crate::model::*;
    pub use crate::stress::*;
}

pub use faulty::*;
pub use fixtures::*;
pub use generators::*;
pub use logging::*;
pub use model::*;
pub use stress::*;
