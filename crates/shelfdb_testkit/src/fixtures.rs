//! Test fixtures and environment helpers.
//!
//! Provides temporary environments and a diagnostics sink for tests.

use shelfdb_core::{Environment, Options};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;
use tracing::subscriber::Subscriber;
use tracing::{Dispatch, Event};
use tracing_subscriber::layer::{Context, Layer};
use tracing_subscriber::prelude::*;

/// An environment in a temporary directory, removed on drop.
///
/// The environment lives in a subdirectory that does not exist yet, so the
/// first reference also exercises directory creation.
pub struct TestEnv {
    /// The environment.
    pub env: Environment,
    /// The temporary directory (kept alive to prevent cleanup).
    _temp_dir: TempDir,
}

impl TestEnv {
    /// Creates a test environment with default options.
    pub fn new() -> Self {
        Self::with_options(Options::default())
    }

    /// Creates a test environment with `options`.
    pub fn with_options(options: Options) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let env = Environment::new(temp_dir.path().join("env"), options);
        Self {
            env,
            _temp_dir: temp_dir,
        }
    }

    /// Returns the environment directory.
    pub fn path(&self) -> &Path {
        self.env.path()
    }

    /// Returns the temporary root that holds the environment directory.
    pub fn root(&self) -> PathBuf {
        self._temp_dir.path().to_path_buf()
    }

    /// Closes the environment and opens a fresh handle on the same
    /// directory with `options`.
    pub fn reopen(self, options: Options) -> Self {
        if self.env.is_open() {
            self.env.close().expect("Failed to close environment");
        }
        let Self { env, _temp_dir } = self;
        let path = env.path().to_path_buf();
        drop(env);
        Self {
            env: Environment::new(path, options),
            _temp_dir,
        }
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}

impl std::ops::Deref for TestEnv {
    type Target = Environment;

    fn deref(&self) -> &Self::Target {
        &self.env
    }
}

/// Runs a test with a temporary environment using default options.
///
/// # Example
///
/// ```rust,ignore
/// use shelfdb_testkit::with_temp_env;
///
/// #[test]
/// fn my_test() {
///     with_temp_env(|env| {
///         let users: DbRef<'_, str, String> = DbRef::init("users", env).unwrap();
///         // ... test operations
///     });
/// }
/// ```
pub fn with_temp_env<F, R>(f: F) -> R
where
    F: FnOnce(&Environment) -> R,
{
    let test_env = TestEnv::new();
    f(&test_env.env)
}

/// Runs a test with a temporary environment using `options`.
pub fn with_temp_env_options<F, R>(options: Options, f: F) -> R
where
    F: FnOnce(&Environment) -> R,
{
    let test_env = TestEnv::with_options(options);
    f(&test_env.env)
}

/// Returns a path that can never become a directory: it sits below a
/// regular file. The returned `TempDir` owns the file.
pub fn unusable_path() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let blocker = temp_dir.path().join("blocker");
    std::fs::write(&blocker, b"regular file").expect("Failed to write blocker file");
    let path = blocker.join("env");
    (temp_dir, path)
}

/// A diagnostics sink that counts the events it receives.
#[derive(Debug, Clone, Default)]
pub struct EventCounter {
    events: Arc<AtomicUsize>,
}

impl EventCounter {
    /// Creates a counter at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a dispatcher that feeds this counter.
    pub fn dispatch(&self) -> Dispatch {
        Dispatch::new(tracing_subscriber::registry().with(self.clone()))
    }

    /// Returns the number of events seen so far.
    pub fn count(&self) -> usize {
        self.events.load(Ordering::SeqCst)
    }
}

impl<S: Subscriber> Layer<S> for EventCounter {
    fn on_event(&self, _event: &Event<'_>, _ctx: Context<'_, S>) {
        self.events.fetch_add(1, Ordering::SeqCst);
    }
}
