//! File-based run lock
//!
//! The lock artifact is a file containing the holder's pid as text. Creation
//! uses atomic create-if-absent semantics, so at most one live process can
//! hold a given path at any instant. The file's mtime records the
//! acquisition time and is never refreshed while the lock is held; a holder
//! that dies without releasing leaves a stale artifact behind as a witness.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::error::{Error, Result};

/// Outcome of a single acquisition attempt
#[derive(Debug)]
pub enum Acquisition {
    /// Lock acquired; released when the guard goes away
    Acquired(LockGuard),
    /// Artifact already exists. Holder liveness is not checked here.
    Busy,
}

/// Handle to a named run lock artifact
#[derive(Debug, Clone)]
pub struct RunLock {
    path: PathBuf,
}

impl RunLock {
    /// Create a handle for the lock artifact at `path`
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the lock artifact
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Attempt to acquire the lock.
    ///
    /// Atomically creates the artifact and records this process's pid in it.
    /// An existing artifact means `Busy`, whether or not its holder is
    /// alive; staleness is the timeout enforcer's concern.
    ///
    /// # Errors
    ///
    /// Returns an error if the artifact cannot be created for any reason
    /// other than already existing, or if the pid cannot be written.
    pub fn try_acquire(&self) -> Result<Acquisition> {
        let mut file = match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&self.path)
        {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => return Ok(Acquisition::Busy),
            Err(e) => {
                return Err(Error::LockFile {
                    path: self.path.clone(),
                    source: e,
                })
            }
        };

        file.write_all(std::process::id().to_string().as_bytes())
            .map_err(|e| Error::LockFile {
                path: self.path.clone(),
                source: e,
            })?;

        tracing::debug!(path = %self.path.display(), "acquired run lock");
        Ok(Acquisition::Acquired(LockGuard {
            path: self.path.clone(),
            released: false,
        }))
    }

    /// Best-effort read of the holder pid.
    ///
    /// Returns `None` when the artifact is missing or unreadable; a race
    /// with a concurrent release is expected and not an error.
    #[must_use]
    pub fn holder_pid(&self) -> Option<u32> {
        let content = fs::read_to_string(&self.path).ok()?;
        parse_pid(&content)
    }

    /// Modification time of the lock artifact.
    ///
    /// The mtime is set once at acquisition and never refreshed while held,
    /// so elapsed time since it is the time the lock has been held, not the
    /// time since the holder last made progress. `None` means the artifact
    /// disappeared, which callers treat as reclaimable rather than an error.
    #[must_use]
    pub fn artifact_mtime(&self) -> Option<SystemTime> {
        fs::metadata(&self.path).ok()?.modified().ok()
    }

    /// Remove a stale artifact left behind by a dead holder.
    ///
    /// Best effort: the artifact vanishing first is fine.
    pub(crate) fn remove_stale_artifact(&self) {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                tracing::debug!(path = %self.path.display(), "removed stale lock artifact");
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "failed to remove stale lock artifact"
                );
            }
        }
    }
}

/// Parse a pid from lock artifact content
fn parse_pid(content: &str) -> Option<u32> {
    content.trim().parse::<u32>().ok()
}

/// RAII guard for a held run lock.
///
/// Removing the artifact on drop guarantees release on every exit path of
/// the protected region, including panics in the protected code.
#[derive(Debug)]
pub struct LockGuard {
    path: PathBuf,
    released: bool,
}

impl LockGuard {
    /// Path of the held lock artifact
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Explicitly release the lock, reporting removal failures.
    ///
    /// # Errors
    ///
    /// Returns an error if the artifact exists but cannot be removed.
    pub fn release(mut self) -> Result<()> {
        self.released = true;
        match fs::remove_file(&self.path) {
            Ok(()) => {
                tracing::debug!(path = %self.path.display(), "released run lock");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::LockFile {
                path: self.path.clone(),
                source: e,
            }),
        }
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        match fs::remove_file(&self.path) {
            Ok(()) => {
                tracing::debug!(path = %self.path.display(), "released run lock");
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "failed to remove lock artifact"
                );
            }
        }
    }
}
