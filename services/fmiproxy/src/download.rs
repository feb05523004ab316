//! Installing downloaded grids onto the live grid path.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tokio::fs;
use tracing::{info, instrument};

use crate::upstream::UpstreamError;

pub const GRID_FILE_NAME: &str = "latest.grb";

/// Writes new grids next to the live file and renames them into place, so a
/// reader never opens a partially written grid.
#[derive(Debug, Clone)]
pub struct GridInstaller {
    grid_file: PathBuf,
}

impl GridInstaller {
    /// Installer for `<grid_dir>/latest.grb`.
    pub fn new(grid_dir: impl AsRef<Path>) -> Self {
        Self {
            grid_file: grid_dir.as_ref().join(GRID_FILE_NAME),
        }
    }

    pub fn grid_file(&self) -> &Path {
        &self.grid_file
    }

    pub fn temp_file(&self) -> PathBuf {
        let mut name = self
            .grid_file
            .file_name()
            .map(OsString::from)
            .unwrap_or_else(|| OsString::from(GRID_FILE_NAME));
        name.push(".tmp");
        self.grid_file.with_file_name(name)
    }

    /// Atomically replace the live grid with `payload`. Returns the size written.
    #[instrument(skip(self, payload), fields(bytes = payload.len()))]
    pub async fn install(&self, payload: &[u8]) -> Result<u64> {
        if payload.is_empty() {
            return Err(UpstreamError::EmptyPayload.into());
        }

        if let Some(dir) = self.grid_file.parent() {
            fs::create_dir_all(dir)
                .await
                .with_context(|| format!("Failed to create grid directory {}", dir.display()))?;
        }

        let temp = self.temp_file();
        fs::write(&temp, payload)
            .await
            .with_context(|| format!("Failed to write {}", temp.display()))?;
        fs::rename(&temp, &self.grid_file)
            .await
            .with_context(|| format!("Failed to move grid into {}", self.grid_file.display()))?;

        info!(
            path = %self.grid_file.display(),
            bytes = payload.len(),
            "Installed new grid file"
        );
        Ok(payload.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_install_creates_directory_and_replaces() {
        let dir = tempfile::tempdir().unwrap();
        let installer = GridInstaller::new(dir.path().join("gribs"));

        installer.install(b"first").await.unwrap();
        assert_eq!(std::fs::read(installer.grid_file()).unwrap(), b"first");

        let written = installer.install(b"second grid").await.unwrap();
        assert_eq!(written, 11);
        assert_eq!(std::fs::read(installer.grid_file()).unwrap(), b"second grid");
        assert!(!installer.temp_file().exists());
    }

    #[tokio::test]
    async fn test_empty_payload_is_not_written() {
        let dir = tempfile::tempdir().unwrap();
        let installer = GridInstaller::new(dir.path());
        std::fs::write(installer.grid_file(), b"live").unwrap();

        let err = installer.install(&[]).await.unwrap_err();

        assert!(matches!(
            err.downcast_ref::<UpstreamError>(),
            Some(UpstreamError::EmptyPayload)
        ));
        assert_eq!(std::fs::read(installer.grid_file()).unwrap(), b"live");
    }

    #[test]
    fn test_temp_file_name() {
        let installer = GridInstaller::new("/data/gribs");
        assert_eq!(installer.temp_file(), PathBuf::from("/data/gribs/latest.grb.tmp"));
    }
}
