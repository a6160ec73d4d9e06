//! Environment configuration.

use shelfdb_engine::{EnvFlags, OpenOptions};
use std::path::Path;
use tracing::Dispatch;

/// Permission bits for files created inside the environment directory.
pub const FILE_MODE: u32 = 0o644;

/// Configuration for an [`crate::Environment`].
///
/// Every field is optional in the sense that [`Options::default`] fills it.
#[derive(Debug, Clone)]
pub struct Options {
    /// Maximum number of concurrent read transactions.
    pub max_readers: u32,

    /// Maximum number of named sub-databases, one per reference identifier.
    pub max_dbs: u32,

    /// Number of commits grouped under one log sync.
    pub batch_size: u32,

    /// Environment-wide engine flags.
    pub flags: EnvFlags,

    /// Where diagnostics go. Discarded unless set.
    pub diagnostics: Dispatch,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            max_readers: 8,
            max_dbs: 1,
            batch_size: 1,
            flags: EnvFlags::empty(),
            diagnostics: Dispatch::none(),
        }
    }
}

impl Options {
    /// Creates options with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
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

    /// Sets the commit batch size.
    #[must_use]
    pub const fn batch_size(mut self, value: u32) -> Self {
        self.batch_size = value;
        self
    }

    /// Sets engine flags.
    #[must_use]
    pub const fn flags(mut self, flags: EnvFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Sends diagnostics to `dispatch`.
    #[must_use]
    pub fn diagnostics(mut self, dispatch: Dispatch) -> Self {
        self.diagnostics = dispatch;
        self
    }

    pub(crate) fn open_options(&self, path: &Path) -> OpenOptions {
        OpenOptions::new(path)
            .file_mode(FILE_MODE)
            .max_readers(self.max_readers)
            .max_dbs(self.max_dbs)
            .batch_size(self.batch_size)
            .flags(self.flags)
            .diagnostics(self.diagnostics.clone())
    }
}
