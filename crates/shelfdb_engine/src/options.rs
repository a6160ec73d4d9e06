//! Connection open options.

use crate::error::{EngineError, EngineResult};
use crate::flags::EnvFlags;
use shelfdb_storage::DEFAULT_FILE_MODE;
use std::path::{Path, PathBuf};
use tracing::Dispatch;

/// Everything [`crate::Connection::open`] needs to bring an environment up.
#[derive(Debug, Clone)]
pub struct OpenOptions {
    /// Directory holding the environment files. Must already exist.
    pub path: PathBuf,

    /// Permission bits for files the engine creates.
    pub file_mode: u32,

    /// Maximum number of concurrently live read transactions.
    pub max_readers: u32,

    /// Maximum number of named sub-databases.
    pub max_dbs: u32,

    /// Environment-wide flags.
    pub flags: EnvFlags,

    /// Number of commits grouped under one log sync.
    pub batch_size: u32,

    /// Where engine diagnostics go.
    pub diagnostics: Dispatch,
}

impl OpenOptions {
    /// Creates options for `path` with engine defaults.
    #[must_use]
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            file_mode: DEFAULT_FILE_MODE,
            max_readers: 126,
            max_dbs: 0,
            flags: EnvFlags::empty(),
            batch_size: 1,
            diagnostics: Dispatch::none(),
        }
    }

    /// Sets the file mode.
    #[must_use]
    pub const fn file_mode(mut self, mode: u32) -> Self {
        self.file_mode = mode;
        self
    }

    /// Sets the reader limit.
    #[must_use]
    pub const fn max_readers(mut self, value: u32) -> Self {
        self.max_readers = value;
        self
    }

    /// Sets the sub-database limit.
    #[must_use]
    pub const fn max_dbs(mut self, value: u32) -> Self {
        self.max_dbs = value;
        self
    }

    /// Sets environment flags.
    #[must_use]
    pub const fn flags(mut self, flags: EnvFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Sets the commit batch size.
    #[must_use]
    pub const fn batch_size(mut self, value: u32) -> Self {
        self.batch_size = value;
        self
    }

    /// Sets the diagnostic sink.
    #[must_use]
    pub fn diagnostics(mut self, dispatch: Dispatch) -> Self {
        self.diagnostics = dispatch;
        self
    }

    pub(crate) fn validate(&self) -> EngineResult<()> {
        if self.max_readers == 0 {
            return Err(EngineError::invalid_config("max_readers must be at least 1"));
        }
        if self.batch_size == 0 {
            return Err(EngineError::invalid_config("batch_size must be at least 1"));
        }
        Ok(())
    }
}
