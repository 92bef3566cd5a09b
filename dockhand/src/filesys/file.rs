//! File operations

use std::path::{Path, PathBuf};

use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::errors::DeployError;

/// A file wrapper with path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct File {
    path: PathBuf,
}

impl File {
    /// Create a new file reference
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Get the file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Check if the file exists
    pub async fn exists(&self) -> bool {
        fs::metadata(&self.path).await.is_ok()
    }

    /// Read file contents as string
    pub async fn read_string(&self) -> Result<String, DeployError> {
        Ok(fs::read_to_string(&self.path).await?)
    }

    /// Read file contents, or `None` if the file does not exist
    pub async fn read_string_opt(&self) -> Result<Option<String>, DeployError> {
        match fs::read_to_string(&self.path).await {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Replace the file contents wholesale via a temp file and rename.
    ///
    /// Readers see either the old or the new contents, never a mix.
    pub async fn write_atomic(&self, contents: &[u8]) -> Result<(), DeployError> {
        self.write_atomic_with_mode(contents, None).await
    }

    /// Like [`File::write_atomic`], but the file is owner-read/write only (0o600)
    /// from the moment it appears at its final path.
    pub async fn write_private(&self, contents: &[u8]) -> Result<(), DeployError> {
        self.write_atomic_with_mode(contents, Some(0o600)).await
    }

    async fn write_atomic_with_mode(
        &self,
        contents: &[u8],
        mode: Option<u32>,
    ) -> Result<(), DeployError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        let file_name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let temp_path = self.path.with_file_name(format!(".{}.tmp", file_name));

        let mut file = fs::File::create(&temp_path).await?;
        if let Some(mode) = mode {
            set_mode(&temp_path, mode).await?;
        }
        file.write_all(contents).await?;
        file.sync_all().await?;
        drop(file);

        if let Err(e) = fs::rename(&temp_path, &self.path).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }
        Ok(())
    }

    /// Delete the file
    pub async fn delete(&self) -> Result<(), DeployError> {
        if self.exists().await {
            fs::remove_file(&self.path).await?;
        }
        Ok(())
    }
}

/// Set unix permission bits. A no-op on non-Unix platforms.
async fn set_mode(path: &Path, mode: u32) -> Result<(), DeployError> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, std::fs::Permissions::from_mode(mode)).await?;
    }
    #[cfg(not(unix))]
    let _ = (path, mode);
    Ok(())
}
