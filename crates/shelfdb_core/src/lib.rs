//! # ShelfDB Core
//!
//! Typed key-value references over an embedded, transactional store.
//!
//! This crate provides:
//! - [`Environment`]: one physical environment, opened lazily and at most
//!   once on first use
//! - [`DbRef`]: a typed handle to one named sub-database with `init`, `put`
//!   and `get`
//! - [`Error`]: failures classified as [`ErrorKind::InitFailed`],
//!   [`ErrorKind::PutFailed`] or [`ErrorKind::GetFailed`]
//!
//! ## Example
//!
//! ```no_run
//! use shelfdb_core::{DbRef, Environment, Options};
//!
//! let env = Environment::new("/tmp/shelf", Options::new().max_dbs(2));
//! let counters: DbRef<'_, str, u64> = DbRef::init("counters", &env)?;
//! let names: DbRef<'_, u64, String> = DbRef::init("names", &env)?;
//!
//! counters.put("visits", &41)?;
//! let next = counters.get("visits")? + 1;
//! counters.put("visits", &next)?;
//!
//! names.put(&1, &"first".to_string())?;
//! assert_eq!(names.get(&1)?, "first");
//!
//! env.close()?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod db_ref;
mod env;
mod error;
mod options;

pub use db_ref::DbRef;
pub use env::Environment;
pub use error::{Cause, CloseError, Error, ErrorKind, Result};
pub use options::{Options, FILE_MODE};

pub use shelfdb_codec::{CborCodec, Codec, CodecError, JsonCodec};
pub use shelfdb_engine::{EngineError, EnvFlags};
