//! # ShelfDB Storage
//!
//! Append-only log backends for the ShelfDB engine.
//!
//! A log backend is an **opaque byte log**. It knows how to append bytes,
//! hand the whole log back, make it durable and cut a torn tail off. It does
//! not understand commit records; the engine owns the record format.
//!
//! ## Available Backends
//!
//! - [`InMemoryLog`] - For testing and ephemeral environments
//! - [`FileLog`] - For persistent environments using OS file APIs
//!
//! ## Example
//!
//! ```rust
//! use shelfdb_storage::{LogBackend, InMemoryLog};
//!
//! let mut log = InMemoryLog::new();
//! let offset = log.append(b"hello world").unwrap();
//! assert_eq!(offset, 0);
//! assert_eq!(log.read_all().unwrap(), b"hello world");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod error;
mod file;
mod memory;

pub use backend::LogBackend;
pub use error::{StorageError, StorageResult};
pub use file::{FileLog, DEFAULT_FILE_MODE};
pub use memory::InMemoryLog;
