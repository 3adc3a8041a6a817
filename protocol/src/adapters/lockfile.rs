//! Single-writer lock for JSON state files
//!
//! The lock is a sibling `<name>.lock` file created with `create_new`; it is
//! removed again when the guard drops. A process that dies while holding it
//! leaves the file behind, and the lock path is reported so it can be removed.

use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

pub struct FileLock {
    path: PathBuf,
}

impl FileLock {
    /// Lock file guarding `target`
    pub fn lock_path(target: &Path) -> PathBuf {
        target.with_extension("lock")
    }

    /// Take the lock, or `Ok(None)` while another writer holds it
    pub fn try_acquire(target: &Path) -> io::Result<Option<Self>> {
        let path = Self::lock_path(target);
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(_) => Ok(Some(Self { path })),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            tracing::warn!(path = %self.path.display(), error = %e, "failed to release lock file");
        }
    }
}
