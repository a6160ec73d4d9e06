//! # ShelfDB Engine
//!
//! A single-writer, multi-reader transactional byte store with named
//! sub-databases.
//!
//! The engine is deliberately small. It offers:
//!
//! - [`Connection::update`]: one read-write transaction, committed when the
//!   closure returns `Ok`, aborted otherwise
//! - [`Connection::view`]: one read-only transaction over the snapshot
//!   committed at its start
//! - [`ReadTxn::sub_db`] / [`WriteTxn::sub_db`]: named sub-database
//!   resolution, with [`DbFlags::CREATE`] to register a new name
//! - [`WriteTxn::put`] / [`ReadTxn::get`]: opaque bytes in, opaque bytes out
//! - [`Connection::terminate_sync`]: blocking shutdown
//!
//! Keys and values are never interpreted. Committed transactions are
//! appended to a checksummed commit log and replayed on open.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod connection;
mod error;
mod flags;
mod options;
mod record;
mod snapshot;
mod txn;

pub use connection::{Connection, DATA_FILE, LOCK_FILE};
pub use error::{EngineError, EngineResult};
pub use flags::{DbFlags, EnvFlags, PutFlags};
pub use options::OpenOptions;
pub use snapshot::{SubDb, MAX_KEY_SIZE};
pub use txn::{ReadTxn, WriteTxn};
