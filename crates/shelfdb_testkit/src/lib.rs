//! # ShelfDB Testkit
//!
//! Test utilities for ShelfDB.
//!
//! This crate provides:
//! - Temporary environments that clean up after themselves
//! - A diagnostics sink that counts events
//! - Property-based test generators using proptest
//!
//! ## Usage
//!
//! ```rust,ignore
//! use shelfdb_testkit::prelude::*;
//!
//! #[test]
//! fn test_with_environment() {
//!     with_temp_env(|env| {
//!         let users: DbRef<'_, str, String> = DbRef::init("users", env).unwrap();
//!         // ... test operations
//!     });
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use shelfdb_core::{DbRef, Environment, ErrorKind, Options};
}

pub use fixtures::*;
pub use generators::*;
