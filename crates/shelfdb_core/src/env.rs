//! Environment handle with lazy, once-only open.

use crate::error::{Cause, CloseError};
use crate::options::Options;
use once_cell::sync::OnceCell;
use shelfdb_engine::{Connection, EngineError, EnvFlags};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tracing::{debug, dispatcher, info, warn};

/// Owner of one physical storage environment.
///
/// Constructing an `Environment` does no I/O. The directory is created and
/// the engine connection opened the first time a [`crate::DbRef`] is
/// initialized against it. That open runs at most once per `Environment`,
/// however many threads race to trigger it; everyone waits for the single
/// attempt and sees its outcome. A failed open is final for this handle.
///
/// References borrow the environment, so it always outlives them. Call
/// [`Environment::close`] once the references are done; dropping the
/// environment closes it as well.
///
/// # Example
///
/// ```no_run
/// use shelfdb_core::{DbRef, Environment, Options};
///
/// let env = Environment::new("/data/x", Options::default());
/// let users: DbRef<'_, str, String> = DbRef::init("users", &env)?;
///
/// users.put("alice", &"hello".to_string())?;
/// assert_eq!(users.get("alice")?, "hello");
/// assert!(users.get("bob").is_err());
///
/// env.close()?;
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug)]
pub struct Environment {
    path: PathBuf,
    options: Options,
    conn: OnceCell<Result<Connection, Cause>>,
    open_attempts: AtomicU32,
}

impl Environment {
    /// Creates a handle for the environment at `path`. Performs no I/O.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, options: Options) -> Self {
        Self {
            path: path.into(),
            options,
            conn: OnceCell::new(),
            open_attempts: AtomicU32::new(0),
        }
    }

    /// Returns the environment path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the resolved options.
    #[must_use]
    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Returns true if the environment opened successfully and has not been
    /// closed.
    #[must_use]
    pub fn is_open(&self) -> bool {
        matches!(self.conn.get(), Some(Ok(conn)) if !conn.is_closed())
    }

    /// Terminates the engine connection, syncing and releasing everything.
    ///
    /// Every reference bound to this environment fails from then on.
    ///
    /// # Errors
    ///
    /// - [`CloseError::NotOpen`] if no reference ever opened the environment
    /// - [`CloseError::AlreadyClosed`] on a second call
    /// - [`CloseError::Engine`] if the final sync fails
    pub fn close(&self) -> Result<(), CloseError> {
        let conn = match self.conn.get() {
            Some(Ok(conn)) => conn,
            _ => return Err(CloseError::NotOpen),
        };

        conn.terminate_sync().map_err(|err| match err {
            EngineError::Closed => CloseError::AlreadyClosed,
            other => CloseError::Engine(other),
        })
    }

    /// Opens the environment on first call; afterwards returns the outcome
    /// of that first call.
    pub(crate) fn ensure_open(&self) -> Result<&Connection, Cause> {
        self.conn
            .get_or_init(|| self.open())
            .as_ref()
            .map_err(Clone::clone)
    }

    /// Returns the connection opened by an earlier `ensure_open`.
    pub(crate) fn connection(&self) -> Result<&Connection, Cause> {
        match self.conn.get() {
            Some(Ok(conn)) => Ok(conn),
            Some(Err(cause)) => Err(cause.clone()),
            None => Err(EngineError::Closed.into()),
        }
    }

    pub(crate) fn diag(&self, f: impl FnOnce()) {
        dispatcher::with_default(&self.options.diagnostics, f);
    }

    fn open(&self) -> Result<Connection, Cause> {
        let attempt = self.open_attempts.fetch_add(1, Ordering::SeqCst) + 1;
        self.diag(|| debug!(path = %self.path.display(), attempt, "opening environment"));

        let result = self.create_dir().and_then(|()| {
            Connection::open(&self.options.open_options(&self.path))
                .map_err(|err| Cause::Open(Arc::new(err)))
        });

        self.diag(|| match &result {
            Ok(_) => info!(path = %self.path.display(), "environment ready"),
            Err(cause) => warn!(path = %self.path.display(), error = %cause, "environment failed to open"),
        });
        result
    }

    fn create_dir(&self) -> Result<(), Cause> {
        // Read-only environments must already exist; the engine reports a
        // missing directory.
        if self.path.is_dir() || self.options.flags.contains(EnvFlags::READ_ONLY) {
            return Ok(());
        }
        fs::create_dir_all(&self.path).map_err(|err| Cause::CreateDir {
            path: self.path.clone(),
            source: Arc::new(err),
        })
    }

    #[cfg(test)]
    pub(crate) fn open_attempts(&self) -> u32 {
        self.open_attempts.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::DbRef;
    use std::sync::Barrier;
    use std::thread;
    use tempfile::tempdir;

    #[test]
    fn new_performs_no_io() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("lazy");

        let env = Environment::new(&path, Options::default());
        assert!(!path.exists());
        assert!(!env.is_open());
        assert_eq!(env.open_attempts(), 0);
    }

    #[test]
    fn ensure_open_creates_directory_once() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("env");
        let env = Environment::new(&path, Options::default());

        env.ensure_open().unwrap();
        env.ensure_open().unwrap();

        assert!(path.is_dir());
        assert!(env.is_open());
        assert_eq!(env.open_attempts(), 1);
    }

    #[test]
    fn racing_opens_run_once() {
        let dir = tempdir().unwrap();
        let env = Environment::new(dir.path().join("env"), Options::default());
        let threads = 16;
        let barrier = Barrier::new(threads);

        thread::scope(|s| {
            for _ in 0..threads {
                s.spawn(|| {
                    barrier.wait();
                    env.ensure_open().unwrap();
                });
            }
        });

        assert_eq!(env.open_attempts(), 1);
    }

    #[test]
    fn failed_open_is_final() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("file");
        fs::write(&blocker, b"not a directory").unwrap();
        let env = Environment::new(blocker.join("env"), Options::default());

        assert!(matches!(env.ensure_open(), Err(Cause::CreateDir { .. })));
        assert!(matches!(env.ensure_open(), Err(Cause::CreateDir { .. })));
        assert_eq!(env.open_attempts(), 1);
        assert!(!env.is_open());
    }

    #[test]
    fn racing_inits_share_one_failed_open() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("file");
        fs::write(&blocker, b"not a directory").unwrap();
        let env = Environment::new(blocker.join("env"), Options::default());
        let threads = 16;
        let barrier = Barrier::new(threads);

        let errors: Vec<_> = thread::scope(|s| {
            let handles: Vec<_> = (0..threads)
                .map(|_| {
                    s.spawn(|| {
                        barrier.wait();
                        DbRef::<'_, str, String>::init("users", &env).unwrap_err()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(errors.len(), threads);
        for err in &errors {
            assert_eq!(err.kind(), ErrorKind::InitFailed);
            assert!(matches!(err.cause(), Cause::CreateDir { .. }));
        }
        assert_eq!(env.open_attempts(), 1);
        assert!(!env.is_open());
    }

    #[test]
    fn read_only_never_creates_directory() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("absent");
        let env = Environment::new(&path, Options::new().flags(EnvFlags::READ_ONLY));

        assert!(matches!(
            env.ensure_open(),
            Err(Cause::Open(engine)) if matches!(*engine, EngineError::InvalidPath { .. })
        ));
        assert!(!path.exists());
    }

    #[test]
    fn close_lifecycle() {
        let dir = tempdir().unwrap();
        let env = Environment::new(dir.path(), Options::default());

        assert!(matches!(env.close(), Err(CloseError::NotOpen)));

        env.ensure_open().unwrap();
        env.close().unwrap();
        assert!(!env.is_open());
        assert!(matches!(env.close(), Err(CloseError::AlreadyClosed)));
    }
}
