//! Immutable committed state shared by readers.

use crate::error::{EngineError, EngineResult};
use crate::record::LogOp;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// Largest accepted key or sub-database name, in bytes.
pub const MAX_KEY_SIZE: usize = 511;

/// Handle to a named sub-database.
///
/// Handles stay valid for the lifetime of the connection that issued them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubDb(u32);

impl SubDb {
    pub(crate) const fn new(index: u32) -> Self {
        Self(index)
    }

    /// Returns the raw handle index.
    #[must_use]
    pub const fn index(self) -> u32 {
        self.0
    }
}

type Table = BTreeMap<Vec<u8>, Vec<u8>>;

/// One committed version of every sub-database.
///
/// Tables are shared between versions; a write transaction copies only the
/// tables it touches.
#[derive(Debug, Clone, Default)]
pub(crate) struct Snapshot {
    names: HashMap<String, SubDb>,
    tables: Vec<Arc<Table>>,
}

impl Snapshot {
    pub(crate) fn lookup(&self, name: &str) -> Option<SubDb> {
        self.names.get(name).copied()
    }

    pub(crate) fn db_count(&self) -> usize {
        self.tables.len()
    }

    pub(crate) fn names(&self) -> impl Iterator<Item = &str> {
        self.names.keys().map(String::as_str)
    }

    pub(crate) fn create(&mut self, name: &str) -> SubDb {
        let db = SubDb::new(self.tables.len() as u32);
        self.names.insert(name.to_string(), db);
        self.tables.push(Arc::new(Table::new()));
        db
    }

    pub(crate) fn get(&self, db: SubDb, key: &[u8]) -> EngineResult<&[u8]> {
        check_key(key)?;
        self.table(db)?
            .get(key)
            .map(Vec::as_slice)
            .ok_or(EngineError::NotFound)
    }

    pub(crate) fn contains(&self, db: SubDb, key: &[u8]) -> EngineResult<bool> {
        Ok(self.table(db)?.contains_key(key))
    }

    pub(crate) fn len(&self, db: SubDb) -> EngineResult<usize> {
        Ok(self.table(db)?.len())
    }

    pub(crate) fn put(&mut self, db: SubDb, key: Vec<u8>, value: Vec<u8>) -> EngineResult<()> {
        check_key(&key)?;
        let table = self
            .tables
            .get_mut(db.0 as usize)
            .ok_or(EngineError::BadDbi { index: db.0 })?;
        Arc::make_mut(table).insert(key, value);
        Ok(())
    }

    /// Applies one replayed operation.
    pub(crate) fn apply(&mut self, op: LogOp) -> EngineResult<()> {
        match op {
            LogOp::CreateDb { index, name } => {
                if index as usize != self.tables.len() {
                    return Err(EngineError::corrupted(format!(
                        "sub-database {name:?} recorded at index {index}, expected {}",
                        self.tables.len()
                    )));
                }
                self.create(&name);
                Ok(())
            }
            LogOp::Put { db, key, value } => {
                self.put(SubDb::new(db), key, value).map_err(|_| {
                    EngineError::corrupted(format!("put into unknown sub-database {db}"))
                })
            }
        }
    }

    /// Returns the operations that rebuild this snapshot from nothing.
    pub(crate) fn to_ops(&self) -> Vec<LogOp> {
        let mut by_index: Vec<(&SubDb, &String)> =
            self.names.iter().map(|(name, db)| (db, name)).collect();
        by_index.sort();

        let mut ops = Vec::new();
        for (db, name) in by_index {
            ops.push(LogOp::CreateDb {
                index: db.0,
                name: name.clone(),
            });
        }
        for (index, table) in self.tables.iter().enumerate() {
            for (key, value) in table.iter() {
                ops.push(LogOp::Put {
                    db: index as u32,
                    key: key.clone(),
                    value: value.clone(),
                });
            }
        }
        ops
    }

    fn table(&self, db: SubDb) -> EngineResult<&Table> {
        self.tables
            .get(db.0 as usize)
            .map(AsRef::as_ref)
            .ok_or(EngineError::BadDbi { index: db.0 })
    }
}

pub(crate) fn check_key(key: &[u8]) -> EngineResult<()> {
    if key.is_empty() || key.len() > MAX_KEY_SIZE {
        return Err(EngineError::BadValSize {
            len: key.len(),
            max: MAX_KEY_SIZE,
        });
    }
    Ok(())
}
