//! Project layout: every path dockhand reads or writes under the project root

use std::path::{Component, Path, PathBuf};

use crate::filesys::dir::Dir;
use crate::filesys::file::File;

/// Name of the persisted configuration file
pub const CONFIG_FILE_NAME: &str = ".dockhand.env";

/// Name of the rendered compose file
pub const MANIFEST_FILE_NAME: &str = "docker-compose.yml";

/// Name of the advisory lock file guarding mutating operations
pub const LOCK_FILE_NAME: &str = ".dockhand.lock";

/// Storage layout for a deployed project
#[derive(Debug, Clone)]
pub struct ProjectLayout {
    /// Project root (the git work tree that gets built)
    pub root: PathBuf,
}

impl ProjectLayout {
    /// Create a new layout rooted at `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Get the configuration file
    pub fn config_file(&self) -> File {
        File::new(self.root.join(CONFIG_FILE_NAME))
    }

    /// Get the compose manifest file
    pub fn manifest_file(&self) -> File {
        File::new(self.root.join(MANIFEST_FILE_NAME))
    }

    /// Get the lock file path
    pub fn lock_path(&self) -> PathBuf {
        self.root.join(LOCK_FILE_NAME)
    }

    /// Directory for dockhand's own operation log
    pub fn state_dir(&self) -> Dir {
        Dir::new(self.root.join(".dockhand"))
    }

    /// Resolve the configured data directory against the project root
    pub fn data_dir(&self, configured: &str) -> PathBuf {
        resolve(&self.root, configured)
    }

    /// The container log directory sits next to the data directory
    pub fn logs_dir(&self, configured_data_dir: &str) -> Dir {
        Dir::new(logs_dir_for(&self.data_dir(configured_data_dir)))
    }

    /// The logs directory, unless it lies outside the project directly under a
    /// filesystem root (`DATA_DIR=/data` gives `/logs`), which is never emptied
    pub fn purgeable_logs_dir(&self, configured_data_dir: &str) -> Option<Dir> {
        let logs = self.logs_dir(configured_data_dir);
        let top_level = logs.path().parent().is_none_or(|p| p.parent().is_none());
        (logs.path().starts_with(&self.root) || !top_level).then_some(logs)
    }
}

impl Default for ProjectLayout {
    fn default() -> Self {
        Self::new(std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
    }
}

/// Derive the logs directory from a resolved data directory (`/srv/app/data` -> `/srv/app/logs`)
pub fn logs_dir_for(data_dir: &Path) -> PathBuf {
    match data_dir.parent() {
        Some(parent) => parent.join("logs"),
        None => data_dir.join("logs"),
    }
}

/// Join `path` onto `root` unless already absolute, dropping `.` components.
fn resolve(root: &Path, path: &str) -> PathBuf {
    let candidate = Path::new(path);
    let joined = if candidate.is_absolute() {
        candidate.to_path_buf()
    } else {
        root.join(candidate)
    };

    joined
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}
