//! Connection to one environment.

use crate::error::{EngineError, EngineResult};
use crate::flags::EnvFlags;
use crate::options::OpenOptions;
use crate::record::{self, CommitRecord, LogOp};
use crate::snapshot::Snapshot;
use crate::txn::{ReadTxn, WriteTxn};
use fs2::FileExt;
use parking_lot::{Mutex, RwLock};
use shelfdb_storage::{FileLog, InMemoryLog, LogBackend};
use std::fs::{File, OpenOptions as FsOpenOptions};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use tracing::{debug, dispatcher, info, warn, Dispatch};

/// Commit log file inside the environment directory.
pub const DATA_FILE: &str = "data.log";

/// Advisory lock file inside the environment directory.
pub const LOCK_FILE: &str = "LOCK";

/// An open environment.
///
/// The connection owns the commit log and the committed snapshot. Any number
/// of threads may run transactions through a shared reference:
///
/// - write transactions are serialized; one runs at a time
/// - read transactions run in parallel, each against the snapshot committed
///   when it started, up to `max_readers` at once
///
/// # Example
///
/// ```rust
/// use shelfdb_engine::{Connection, DbFlags, EngineError, OpenOptions, PutFlags};
///
/// let conn = Connection::open_in_memory(&OpenOptions::new("mem").max_dbs(1)).unwrap();
///
/// conn.update(|txn| {
///     let db = txn.sub_db("users", DbFlags::CREATE)?;
///     txn.put(db, b"alice", b"hello", PutFlags::empty())
/// })
/// .unwrap();
///
/// let value = conn
///     .view(|txn| {
///         let db = txn.sub_db("users", DbFlags::empty())?;
///         Ok::<_, EngineError>(txn.get(db, b"alice")?.to_vec())
///     })
///     .unwrap();
/// assert_eq!(value, b"hello");
/// ```
pub struct Connection {
    path: PathBuf,
    flags: EnvFlags,
    max_readers: u32,
    max_dbs: u32,
    batch_size: u32,
    dispatch: Dispatch,
    current: RwLock<Arc<Snapshot>>,
    writer: Mutex<Writer>,
    readers: AtomicU32,
    closed: AtomicBool,
}

struct Writer {
    log: Option<Box<dyn LogBackend>>,
    lock: Option<File>,
    unsynced: u32,
}

impl Connection {
    /// Opens the environment stored in the directory `options.path`.
    ///
    /// The directory must exist. The connection takes an exclusive lock on
    /// it, replays the commit log and drops any torn tail left by a crash.
    ///
    /// # Errors
    ///
    /// - [`EngineError::InvalidPath`] if the path is not a directory
    /// - [`EngineError::Locked`] if another connection holds the directory
    /// - [`EngineError::InvalidConfig`] for unusable limits
    /// - [`EngineError::Corrupted`] if the log cannot be replayed
    pub fn open(options: &OpenOptions) -> EngineResult<Self> {
        options.validate()?;

        if !options.path.is_dir() {
            return Err(EngineError::InvalidPath {
                path: options.path.clone(),
            });
        }

        if options.flags.contains(EnvFlags::READ_ONLY) {
            return Self::open_read_only(options);
        }

        let lock = acquire_lock(&options.path, options.file_mode)?;
        let log = FileLog::open(&options.path.join(DATA_FILE), options.file_mode)?;

        Self::open_with_log(options, Box::new(log), Some(lock))
    }

    /// Opens without creating, writing or truncating anything on disk.
    ///
    /// A missing log is an empty environment. A missing lock file means no
    /// writer ever opened the directory, so there is nothing to share a lock
    /// with.
    fn open_read_only(options: &OpenOptions) -> EngineResult<Self> {
        let lock = acquire_shared_lock(&options.path)?;

        let data = options.path.join(DATA_FILE);
        let log: Box<dyn LogBackend> = if data.exists() {
            Box::new(FileLog::open_read_only(&data)?)
        } else {
            Box::new(InMemoryLog::new())
        };

        Self::open_with_log(options, log, lock)
    }

    /// Opens a connection whose log lives in memory.
    ///
    /// Nothing touches the filesystem; `options.path` is only used as a label.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidConfig`] for unusable limits.
    pub fn open_in_memory(options: &OpenOptions) -> EngineResult<Self> {
        Self::open_with_log(options, Box::new(InMemoryLog::new()), None)
    }

    /// Opens a connection over an existing log backend.
    ///
    /// # Errors
    ///
    /// Returns an error if the options are unusable or the log cannot be
    /// replayed.
    pub fn with_log(options: &OpenOptions, log: Box<dyn LogBackend>) -> EngineResult<Self> {
        Self::open_with_log(options, log, None)
    }

    fn open_with_log(
        options: &OpenOptions,
        mut log: Box<dyn LogBackend>,
        lock: Option<File>,
    ) -> EngineResult<Self> {
        options.validate()?;

        let image = log.read_all()?;
        let scan = record::scan(&image)?;
        let records = scan.records.len();

        if scan.valid_len < image.len() as u64 {
            let read_only = options.flags.contains(EnvFlags::READ_ONLY);
            dispatcher::with_default(&options.diagnostics, || {
                warn!(
                    path = %options.path.display(),
                    valid = scan.valid_len,
                    total = image.len(),
                    read_only,
                    "ignoring torn tail of commit log"
                );
            });
            // Read-only environments replay the valid prefix and leave the
            // bytes for the next writer to truncate.
            if !read_only {
                log.truncate(scan.valid_len)?;
            }
        }

        let mut snapshot = Snapshot::default();
        for commit in scan.records {
            for op in commit.ops {
                snapshot.apply(op)?;
            }
        }

        if !options.flags.contains(EnvFlags::READ_ONLY) {
            compact_if_oversized(log.as_mut(), &snapshot, scan.valid_len, &options.diagnostics)?;
        }

        let conn = Self {
            path: options.path.clone(),
            flags: options.flags,
            max_readers: options.max_readers,
            max_dbs: options.max_dbs,
            batch_size: options.batch_size,
            dispatch: options.diagnostics.clone(),
            current: RwLock::new(Arc::new(snapshot)),
            writer: Mutex::new(Writer {
                log: Some(log),
                lock,
                unsynced: 0,
            }),
            readers: AtomicU32::new(0),
            closed: AtomicBool::new(false),
        };

        conn.diag(|| {
            info!(
                path = %conn.path.display(),
                records,
                sub_dbs = conn.current.read().db_count(),
                max_readers = conn.max_readers,
                max_dbs = conn.max_dbs,
                "environment opened"
            );
        });

        Ok(conn)
    }

    /// Runs `f` inside a read-only transaction.
    ///
    /// # Errors
    ///
    /// Fails with [`EngineError::Closed`] after termination and with
    /// [`EngineError::ReadersFull`] when every reader slot is taken; otherwise
    /// returns whatever `f` returns.
    pub fn view<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&ReadTxn) -> Result<T, E>,
        E: From<EngineError>,
    {
        self.ensure_open()?;
        let _slot = self.acquire_reader()?;

        let txn = ReadTxn::new(Arc::clone(&self.current.read()));
        f(&txn)
    }

    /// Runs `f` inside a read-write transaction.
    ///
    /// The transaction commits when `f` returns `Ok` and aborts, leaving the
    /// committed state unchanged, when it returns `Err`. Callers block while
    /// another write transaction is running.
    ///
    /// # Errors
    ///
    /// Fails with [`EngineError::Closed`] after termination, with
    /// [`EngineError::ReadOnly`] on a read-only environment, with a storage
    /// error if the commit cannot be logged, or with whatever `f` returns.
    pub fn update<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut WriteTxn) -> Result<T, E>,
        E: From<EngineError>,
    {
        self.ensure_open()?;
        if self.flags.contains(EnvFlags::READ_ONLY) {
            return Err(EngineError::ReadOnly.into());
        }

        let mut writer = self.writer.lock();
        // Termination may have taken the writer lock first.
        if writer.log.is_none() {
            return Err(EngineError::Closed.into());
        }

        let base = Arc::clone(&self.current.read());
        let mut txn = WriteTxn::new(&base, self.max_dbs);

        let value = match f(&mut txn) {
            Ok(value) => value,
            Err(err) => {
                self.diag(|| debug!("write transaction aborted"));
                return Err(err);
            }
        };

        let (snapshot, ops) = txn.into_parts();
        if !ops.is_empty() {
            let created: Vec<&str> = ops
                .iter()
                .filter_map(|op| match op {
                    LogOp::CreateDb { name, .. } => Some(name.as_str()),
                    LogOp::Put { .. } => None,
                })
                .collect();
            for name in &created {
                self.diag(|| debug!(name, "registered sub-database"));
            }

            let op_count = ops.len();
            if let Err(err) = writer.persist(
                &CommitRecord { ops },
                self.batch_size,
                self.flags,
                &self.dispatch,
            ) {
                self.diag(|| warn!(error = %err, "commit failed, transaction aborted"));
                return Err(err.into());
            }
            self.diag(|| debug!(ops = op_count, "write transaction committed"));
        }

        *self.current.write() = Arc::new(snapshot);
        Ok(value)
    }

    /// Terminates the connection, blocking until the running writer (if any)
    /// finishes, then syncing and releasing the log and the directory lock.
    ///
    /// Every transaction started afterwards fails with
    /// [`EngineError::Closed`]. Read transactions already running keep their
    /// snapshot until they return.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Closed`] if the connection was already
    /// terminated, or a storage error if the final sync fails.
    pub fn terminate_sync(&self) -> EngineResult<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Err(EngineError::Closed);
        }

        let result = self.writer.lock().shutdown(self.flags);
        self.diag(|| match &result {
            Ok(()) => info!(path = %self.path.display(), "environment closed"),
            Err(err) => warn!(path = %self.path.display(), error = %err, "environment closed with errors"),
        });
        result
    }

    /// Rewrites the commit log as one record holding the committed state.
    ///
    /// Blocks writers while it runs. Readers are not affected.
    ///
    /// # Errors
    ///
    /// Fails with [`EngineError::Closed`] after termination, with
    /// [`EngineError::ReadOnly`] on a read-only environment, or with a
    /// storage error if the new log cannot be written. The old log is kept
    /// in that case.
    pub fn compact(&self) -> EngineResult<()> {
        self.ensure_open()?;
        if self.flags.contains(EnvFlags::READ_ONLY) {
            return Err(EngineError::ReadOnly);
        }

        let mut writer = self.writer.lock();
        let log = writer.log.as_mut().ok_or(EngineError::Closed)?;
        let before = log.len()?;
        let image = compacted_image(&self.current.read())?;
        log.replace(&image)?;
        writer.unsynced = 0;

        self.diag(|| info!(before, after = image.len(), "compacted commit log"));
        Ok(())
    }

    /// Returns the environment path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns true once [`Connection::terminate_sync`] has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Returns the number of read transactions currently running.
    #[must_use]
    pub fn live_readers(&self) -> u32 {
        self.readers.load(Ordering::SeqCst)
    }

    fn ensure_open(&self) -> EngineResult<()> {
        if self.is_closed() {
            Err(EngineError::Closed)
        } else {
            Ok(())
        }
    }

    fn acquire_reader(&self) -> EngineResult<ReaderSlot<'_>> {
        let max = self.max_readers;
        self.readers
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| (n < max).then_some(n + 1))
            .map_err(|_| {
                self.diag(|| warn!(max, "reader limit reached"));
                EngineError::ReadersFull { max }
            })?;
        Ok(ReaderSlot {
            readers: &self.readers,
        })
    }

    fn diag(&self, f: impl FnOnce()) {
        dispatcher::with_default(&self.dispatch, f);
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        if !self.is_closed() {
            if let Err(err) = self.terminate_sync() {
                self.diag(|| warn!(error = %err, "failed to close environment on drop"));
            }
        }
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("path", &self.path)
            .field("flags", &self.flags)
            .field("max_readers", &self.max_readers)
            .field("max_dbs", &self.max_dbs)
            .field("batch_size", &self.batch_size)
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

impl Writer {
    fn persist(
        &mut self,
        record: &CommitRecord,
        batch_size: u32,
        flags: EnvFlags,
        dispatch: &Dispatch,
    ) -> EngineResult<()> {
        let log = self.log.as_mut().ok_or(EngineError::Closed)?;
        let data = record.encode()?;
        let start = log.len()?;

        let sync_now = self.unsynced + 1 >= batch_size && !flags.contains(EnvFlags::NO_SYNC);
        let written = log.append(&data).and_then(|_| {
            if sync_now {
                log.sync()
            } else {
                log.flush()
            }
        });

        if let Err(err) = written {
            // Leave no half-written record behind for the next replay.
            if let Err(rollback) = log.truncate(start) {
                dispatcher::with_default(dispatch, || {
                    warn!(error = %rollback, offset = start, "failed to roll back commit log");
                });
            }
            return Err(err.into());
        }

        self.unsynced = if sync_now {
            0
        } else {
            self.unsynced.saturating_add(1)
        };
        Ok(())
    }

    fn shutdown(&mut self, flags: EnvFlags) -> EngineResult<()> {
        let mut result = Ok(());

        if let Some(mut log) = self.log.take() {
            if self.unsynced > 0 && !flags.contains(EnvFlags::NO_SYNC) {
                result = log.sync().map_err(EngineError::from);
            }
            self.unsynced = 0;
        }

        if let Some(lock) = self.lock.take() {
            if let Err(err) = FileExt::unlock(&lock) {
                if result.is_ok() {
                    result = Err(err.into());
                }
            }
        }

        result
    }
}

/// Rewrites the log as a single record once it holds at least this many
/// times the bytes needed for the live data.
const COMPACT_RATIO: u64 = 2;

fn compact_if_oversized(
    log: &mut dyn LogBackend,
    snapshot: &Snapshot,
    log_len: u64,
    dispatch: &Dispatch,
) -> EngineResult<()> {
    let compacted = compacted_image(snapshot)?;
    if log_len < COMPACT_RATIO * compacted.len() as u64 || log_len == 0 {
        return Ok(());
    }

    log.replace(&compacted)?;
    dispatcher::with_default(dispatch, || {
        info!(before = log_len, after = compacted.len(), "compacted commit log");
    });
    Ok(())
}

fn compacted_image(snapshot: &Snapshot) -> EngineResult<Vec<u8>> {
    let ops = snapshot.to_ops();
    if ops.is_empty() {
        return Ok(Vec::new());
    }
    CommitRecord { ops }.encode()
}

struct ReaderSlot<'a> {
    readers: &'a AtomicU32,
}

impl Drop for ReaderSlot<'_> {
    fn drop(&mut self) {
        self.readers.fetch_sub(1, Ordering::SeqCst);
    }
}

fn acquire_lock(dir: &Path, mode: u32) -> EngineResult<File> {
    let mut options = FsOpenOptions::new();
    options.read(true).write(true).create(true).truncate(false);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(mode);
    }
    #[cfg(not(unix))]
    let _ = mode;

    let file = options.open(dir.join(LOCK_FILE))?;
    if file.try_lock_exclusive().is_err() {
        return Err(EngineError::Locked);
    }
    Ok(file)
}

fn acquire_shared_lock(dir: &Path) -> EngineResult<Option<File>> {
    let path = dir.join(LOCK_FILE);
    if !path.exists() {
        return Ok(None);
    }

    let file = FsOpenOptions::new().read(true).open(path)?;
    if file.try_lock_shared().is_err() {
        return Err(EngineError::Locked);
    }
    Ok(Some(file))
}
