//! Exclusive per-repository lock.
//!
//! Held for the whole release run so two invocations cannot interleave
//! commits on the same work tree. The lock is an OS-level advisory lock on
//! `<git-dir>/git-release.lock` and is released when the guard is dropped,
//! including when the process dies.

use std::fs::{File, OpenOptions};
use std::path::Path;

use fs2::FileExt;

use crate::error::{GitReleaseError, Result};

/// Lock file name inside the git directory
pub const LOCK_FILE_NAME: &str = "git-release.lock";

/// An exclusive lock on the repository, released on drop
#[derive(Debug)]
pub struct RepoLock {
    file: File,
}

impl RepoLock {
    /// Take the lock without blocking.
    ///
    /// # Errors
    ///
    /// - [`GitReleaseError::Locked`] if another process holds the lock
    /// - [`GitReleaseError::Io`] if the lock file cannot be opened or locked
    pub fn acquire(git_dir: &Path) -> Result<Self> {
        let path = git_dir.join(LOCK_FILE_NAME);

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;

        match file.try_lock_exclusive() {
            Ok(()) => Ok(RepoLock { file }),
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => Err(GitReleaseError::Locked),
            Err(e) => Err(GitReleaseError::Io(e)),
        }
    }
}

impl Drop for RepoLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}
