//! Log backend trait definition.

use crate::error::StorageResult;

/// An append-only byte log.
///
/// The engine writes one envelope per committed write transaction and reads
/// the whole log back once, when the environment is opened.
///
/// # Invariants
///
/// - `append` returns the offset where the data starts
/// - `read_all` returns every byte appended so far, in order
/// - `sync` makes every appended byte durable
/// - Backends must be `Send + Sync` so a connection can cross threads
pub trait LogBackend: Send + Sync {
    /// Returns the full contents of the log.
    ///
    /// # Errors
    ///
    /// Returns an error if the log cannot be read.
    fn read_all(&self) -> StorageResult<Vec<u8>>;

    /// Appends data to the end of the log and returns its offset.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    fn append(&mut self, data: &[u8]) -> StorageResult<u64>;

    /// Pushes buffered writes to the operating system.
    ///
    /// # Errors
    ///
    /// Returns an error if the flush fails.
    fn flush(&mut self) -> StorageResult<()>;

    /// Makes all appended data and file metadata durable.
    ///
    /// # Errors
    ///
    /// Returns an error if the sync fails.
    fn sync(&mut self) -> StorageResult<()>;

    /// Returns the current length of the log in bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the length cannot be determined.
    fn len(&self) -> StorageResult<u64>;

    /// Returns true if nothing has been appended yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the length cannot be determined.
    fn is_empty(&self) -> StorageResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Cuts the log down to `new_len` bytes.
    ///
    /// Used to drop a torn tail left behind by a crash mid-append.
    ///
    /// # Errors
    ///
    /// Returns [`crate::StorageError::TruncatePastEnd`] if `new_len` is larger
    /// than the log, or an I/O error.
    fn truncate(&mut self, new_len: u64) -> StorageResult<()>;

    /// Replaces the whole log with `data`.
    ///
    /// Used to compact the log. Either the old or the new contents survive a
    /// crash, never a mix.
    ///
    /// # Errors
    ///
    /// Returns an error if the new contents cannot be written.
    fn replace(&mut self, data: &[u8]) -> StorageResult<()>;
}
