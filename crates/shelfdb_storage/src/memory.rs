//! In-memory log for tests and ephemeral environments.

use crate::backend::LogBackend;
use crate::error::{StorageError, StorageResult};
use parking_lot::RwLock;

/// A log held entirely in memory.
///
/// Contents are lost when the log is dropped.
///
/// ```rust
/// use shelfdb_storage::{LogBackend, InMemoryLog};
///
/// let mut log = InMemoryLog::new();
/// log.append(b"abc").unwrap();
/// assert_eq!(log.len().unwrap(), 3);
/// ```
#[derive(Debug, Default)]
pub struct InMemoryLog {
    data: RwLock<Vec<u8>>,
}

impl InMemoryLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a log that already holds `data`.
    ///
    /// Useful for replaying hand-built or damaged logs in tests.
    #[must_use]
    pub fn with_data(data: Vec<u8>) -> Self {
        Self {
            data: RwLock::new(data),
        }
    }
}

impl LogBackend for InMemoryLog {
    fn read_all(&self) -> StorageResult<Vec<u8>> {
        Ok(self.data.read().clone())
    }

    fn append(&mut self, new_data: &[u8]) -> StorageResult<u64> {
        let data = self.data.get_mut();
        let offset = data.len() as u64;
        data.extend_from_slice(new_data);
        Ok(offset)
    }

    fn flush(&mut self) -> StorageResult<()> {
        Ok(())
    }

    fn sync(&mut self) -> StorageResult<()> {
        Ok(())
    }

    fn len(&self) -> StorageResult<u64> {
        Ok(self.data.read().len() as u64)
    }

    fn truncate(&mut self, new_len: u64) -> StorageResult<()> {
        let data = self.data.get_mut();
        let len = data.len() as u64;
        if new_len > len {
            return Err(StorageError::TruncatePastEnd {
                requested: new_len,
                len,
            });
        }

        data.truncate(new_len as usize);
        Ok(())
    }

    fn replace(&mut self, new_data: &[u8]) -> StorageResult<()> {
        *self.data.get_mut() = new_data.to_vec();
        Ok(())
    }
}
