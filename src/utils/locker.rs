//! File-based locking to prevent concurrent runs of the same backup

use crate::error::{BackupError, Result};
use fd_lock::{RwLock, RwLockWriteGuard};
use std::fs::{File, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Advisory lock file for one named backup.
///
/// Open it, then hold the guard returned by [`BackupLock::try_hold`] for as
/// long as the run lasts. The lock file itself is left in place.
pub struct BackupLock {
    lock: RwLock<File>,
    name: String,
    lock_path: PathBuf,
}

impl BackupLock {
    /// Open (creating if needed) `<dir>/<name>.lock`
    pub fn open(dir: &Path, name: &str) -> Result<Self> {
        let lock_path = dir.join(format!("{}.lock", name));

        std::fs::create_dir_all(dir).map_err(|source| BackupError::Io {
            path: dir.to_path_buf(),
            source,
        })?;

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)
            .map_err(|source| BackupError::Io {
                path: lock_path.clone(),
                source,
            })?;

        Ok(Self {
            lock: RwLock::new(file),
            name: name.to_string(),
            lock_path,
        })
    }

    /// Take the exclusive lock without waiting.
    /// Fails with [`BackupError::Locked`] if another process holds it.
    pub fn try_hold(&mut self) -> Result<RwLockWriteGuard<'_, File>> {
        debug!("Attempting to acquire lock: {:?}", self.lock_path);

        match self.lock.try_write() {
            Ok(guard) => {
                info!("Acquired backup lock for: {}", self.name);
                Ok(guard)
            }
            Err(e) if e.kind() == ErrorKind::WouldBlock => Err(BackupError::Locked {
                name: self.name.clone(),
                path: self.lock_path.clone(),
            }),
            Err(source) => Err(BackupError::Io {
                path: self.lock_path.clone(),
                source,
            }),
        }
    }

    pub fn path(&self) -> &Path {
        &self.lock_path
    }
}
