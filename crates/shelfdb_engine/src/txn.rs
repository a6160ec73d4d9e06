//! Read-only and read-write transactions.

use crate::error::{EngineError, EngineResult};
use crate::flags::{DbFlags, PutFlags};
use crate::record::LogOp;
use crate::snapshot::{check_key, Snapshot, SubDb};
use std::sync::Arc;

/// A read-only view of the environment as of transaction start.
///
/// Obtained through [`crate::Connection::view`]. Writers committing while the
/// transaction runs are not visible to it.
#[derive(Debug)]
pub struct ReadTxn {
    snapshot: Arc<Snapshot>,
}

impl ReadTxn {
    pub(crate) fn new(snapshot: Arc<Snapshot>) -> Self {
        Self { snapshot }
    }

    /// Resolves a sub-database by name.
    ///
    /// Read transactions cannot register names: passing `DbFlags::CREATE` for
    /// an unknown name fails with [`EngineError::TxnReadOnly`].
    pub fn sub_db(&self, name: &str, flags: DbFlags) -> EngineResult<SubDb> {
        check_key(name.as_bytes())?;
        match self.snapshot.lookup(name) {
            Some(db) => Ok(db),
            None if flags.contains(DbFlags::CREATE) => Err(EngineError::TxnReadOnly),
            None => Err(EngineError::SubDbNotFound {
                name: name.to_string(),
            }),
        }
    }

    /// Returns the value stored under `key`.
    pub fn get(&self, db: SubDb, key: &[u8]) -> EngineResult<&[u8]> {
        self.snapshot.get(db, key)
    }

    /// Returns the number of entries in `db`.
    pub fn entries(&self, db: SubDb) -> EngineResult<usize> {
        self.snapshot.len(db)
    }

    /// Returns the names of every registered sub-database, sorted.
    #[must_use]
    pub fn sub_db_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.snapshot.names().map(str::to_string).collect();
        names.sort();
        names
    }
}

/// A read-write transaction.
///
/// Obtained through [`crate::Connection::update`]. Changes are private to the
/// transaction until the closure returns `Ok`; any error discards them.
#[derive(Debug)]
pub struct WriteTxn {
    snapshot: Snapshot,
    ops: Vec<LogOp>,
    max_dbs: u32,
}

impl WriteTxn {
    pub(crate) fn new(base: &Snapshot, max_dbs: u32) -> Self {
        Self {
            snapshot: base.clone(),
            ops: Vec::new(),
            max_dbs,
        }
    }

    /// Resolves a sub-database by name, registering it when `CREATE` is set.
    ///
    /// Registering an already known name returns the existing handle.
    pub fn sub_db(&mut self, name: &str, flags: DbFlags) -> EngineResult<SubDb> {
        check_key(name.as_bytes())?;
        if let Some(db) = self.snapshot.lookup(name) {
            return Ok(db);
        }

        if !flags.contains(DbFlags::CREATE) {
            return Err(EngineError::SubDbNotFound {
                name: name.to_string(),
            });
        }

        if self.snapshot.db_count() >= self.max_dbs as usize {
            return Err(EngineError::DbsFull { max: self.max_dbs });
        }

        let db = self.snapshot.create(name);
        self.ops.push(LogOp::CreateDb {
            index: db.index(),
            name: name.to_string(),
        });
        Ok(db)
    }

    /// Stores `value` under `key`, replacing any previous value unless
    /// `NO_OVERWRITE` is set.
    pub fn put(&mut self, db: SubDb, key: &[u8], value: &[u8], flags: PutFlags) -> EngineResult<()> {
        if flags.contains(PutFlags::NO_OVERWRITE) && self.snapshot.contains(db, key)? {
            return Err(EngineError::KeyExists);
        }

        self.snapshot.put(db, key.to_vec(), value.to_vec())?;
        self.ops.push(LogOp::Put {
            db: db.index(),
            key: key.to_vec(),
            value: value.to_vec(),
        });
        Ok(())
    }

    /// Returns the value stored under `key`, including this transaction's
    /// own uncommitted writes.
    pub fn get(&self, db: SubDb, key: &[u8]) -> EngineResult<&[u8]> {
        self.snapshot.get(db, key)
    }

    /// Returns the number of entries in `db`.
    pub fn entries(&self, db: SubDb) -> EngineResult<usize> {
        self.snapshot.len(db)
    }

    pub(crate) fn into_parts(self) -> (Snapshot, Vec<LogOp>) {
        (self.snapshot, self.ops)
    }
}
