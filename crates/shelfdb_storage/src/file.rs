//! File-based log for persistent environments.

use crate::backend::LogBackend;
use crate::error::{StorageError, StorageResult};
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Permission bits used for new log files when the caller has no preference.
pub const DEFAULT_FILE_MODE: u32 = 0o644;

/// A log stored in a single file.
///
/// # Durability
///
/// - `flush()` calls `File::flush()` to push data to the OS
/// - `sync()` calls `File::sync_all()` to ensure data is on disk
///
/// # Example
///
/// ```no_run
/// use shelfdb_storage::{LogBackend, FileLog, DEFAULT_FILE_MODE};
/// use std::path::Path;
///
/// let mut log = FileLog::open(Path::new("data.log"), DEFAULT_FILE_MODE).unwrap();
/// log.append(b"record").unwrap();
/// log.sync().unwrap();
/// ```
#[derive(Debug)]
pub struct FileLog {
    path: PathBuf,
    file: Mutex<File>,
    len: u64,
    mode: u32,
    read_only: bool,
}

impl FileLog {
    /// Opens or creates a log file at `path`.
    ///
    /// `mode` sets the permission bits of a newly created file on Unix and is
    /// ignored elsewhere. Existing files keep their permissions.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or created.
    pub fn open(path: &Path, mode: u32) -> StorageResult<Self> {
        let mut options = OpenOptions::new();
        options.read(true).write(true).create(true).truncate(false);
        set_mode(&mut options, mode);

        let file = options.open(path)?;
        let len = file.metadata()?.len();

        Ok(Self {
            path: path.to_path_buf(),
            file: Mutex::new(file),
            len,
            mode,
            read_only: false,
        })
    }

    /// Opens an existing log file for reading only.
    ///
    /// The file is never created, written or truncated; `append` and
    /// `truncate` fail with [`StorageError::ReadOnly`].
    ///
    /// # Errors
    ///
    /// Returns an error if the file does not exist or cannot be opened.
    pub fn open_read_only(path: &Path) -> StorageResult<Self> {
        let file = OpenOptions::new().read(true).open(path)?;
        let len = file.metadata()?.len();

        Ok(Self {
            path: path.to_path_buf(),
            file: Mutex::new(file),
            len,
            mode: DEFAULT_FILE_MODE,
            read_only: true,
        })
    }

    /// Returns the path to the underlying file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(unix)]
fn set_mode(options: &mut OpenOptions, mode: u32) {
    use std::os::unix::fs::OpenOptionsExt;
    options.mode(mode);
}

#[cfg(not(unix))]
fn set_mode(_options: &mut OpenOptions, _mode: u32) {}

impl LogBackend for FileLog {
    fn read_all(&self) -> StorageResult<Vec<u8>> {
        let mut file = self.file.lock();
        file.seek(SeekFrom::Start(0))?;

        let mut buffer = Vec::with_capacity(self.len as usize);
        file.read_to_end(&mut buffer)?;
        Ok(buffer)
    }

    fn append(&mut self, data: &[u8]) -> StorageResult<u64> {
        if self.read_only {
            return Err(StorageError::ReadOnly);
        }
        let offset = self.len;
        if data.is_empty() {
            return Ok(offset);
        }

        let file = self.file.get_mut();
        file.seek(SeekFrom::End(0))?;
        file.write_all(data)?;
        self.len += data.len() as u64;

        Ok(offset)
    }

    fn flush(&mut self) -> StorageResult<()> {
        self.file.get_mut().flush()?;
        Ok(())
    }

    fn sync(&mut self) -> StorageResult<()> {
        self.file.get_mut().sync_all()?;
        Ok(())
    }

    fn len(&self) -> StorageResult<u64> {
        Ok(self.len)
    }

    fn truncate(&mut self, new_len: u64) -> StorageResult<()> {
        if self.read_only {
            return Err(StorageError::ReadOnly);
        }
        if new_len > self.len {
            return Err(StorageError::TruncatePastEnd {
                requested: new_len,
                len: self.len,
            });
        }

        let file = self.file.get_mut();
        file.set_len(new_len)?;
        file.sync_all()?;
        self.len = new_len;

        Ok(())
    }

    fn replace(&mut self, data: &[u8]) -> StorageResult<()> {
        if self.read_only {
            return Err(StorageError::ReadOnly);
        }

        let mut staged = self.path.clone().into_os_string();
        staged.push(".compact");
        let staged = PathBuf::from(staged);

        {
            let mut options = OpenOptions::new();
            options.write(true).create(true).truncate(true);
            set_mode(&mut options, self.mode);
            let mut file = options.open(&staged)?;
            file.write_all(data)?;
            file.sync_all()?;
        }
        std::fs::rename(&staged, &self.path)?;
        sync_parent(&self.path)?;

        let file = OpenOptions::new().read(true).write(true).open(&self.path)?;
        *self.file.get_mut() = file;
        self.len = data.len() as u64;

        Ok(())
    }
}

#[cfg(unix)]
fn sync_parent(path: &Path) -> StorageResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        File::open(parent)?.sync_all()?;
    }
    Ok(())
}

#[cfg(not(unix))]
fn sync_parent(_path: &Path) -> StorageResult<()> {
    Ok(())
}
