//! Advisory lock serializing mutating operations on one project

use std::fs;
use std::path::{Path, PathBuf};

use fs2::FileExt;
use tracing::debug;

use crate::errors::DeployError;

/// Held for the duration of a mutating operation; released on drop
#[derive(Debug)]
pub struct OperationLock {
    file: fs::File,
    path: PathBuf,
}

impl OperationLock {
    /// Take the lock without waiting, failing with `Busy` if it is held elsewhere
    pub fn acquire(path: &Path) -> Result<Self, DeployError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = fs::OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(path)?;

        file.try_lock_exclusive().map_err(|_| {
            DeployError::Busy(format!(
                "{} is locked by another dockhand process",
                path.display()
            ))
        })?;

        debug!("Acquired {}", path.display());
        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }
}

impl Drop for OperationLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
        debug!("Released {}", self.path.display());
    }
}
