//! Scoped staging directories for downloaded and extracted artifacts
//!
//! A [`StagingArea`] is created fresh for every provider invocation and is
//! removed when it is released or dropped, whichever comes first. Removal
//! failures are logged and never replace the error that is already
//! propagating out of the import.

use std::io;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, warn};

use crate::config::StagingConfig;

/// Private, uniquely named scratch directory
#[derive(Debug)]
pub struct StagingArea {
    dir: Option<TempDir>,
    root: PathBuf,
}

impl StagingArea {
    /// Create a new staging directory under the configured base
    pub fn acquire(config: &StagingConfig) -> io::Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(&config.prefix);
        let dir = match &config.base_dir {
            Some(base) => {
                std::fs::create_dir_all(base)?;
                builder.tempdir_in(base)?
            },
            None => builder.tempdir()?,
        };
        let root = dir.path().to_path_buf();
        debug!(path = %root.display(), "Staging area created");

        Ok(Self {
            dir: Some(dir),
            root,
        })
    }

    /// Root directory of this staging area
    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Location for an artifact inside the staging area
    pub fn file(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    /// Delete the staging area and everything under it
    pub fn release(mut self) {
        self.remove();
    }

    fn remove(&mut self) {
        if let Some(dir) = self.dir.take() {
            match dir.close() {
                Ok(()) => debug!(path = %self.root.display(), "Staging area removed"),
                Err(e) => warn!(
                    path = %self.root.display(),
                    error = %e,
                    "Failed to remove staging area"
                ),
            }
        }
    }
}

impl Drop for StagingArea {
    fn drop(&mut self) {
        self.remove();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn config_in(base: &Path) -> StagingConfig {
        StagingConfig {
            base_dir: Some(base.to_path_buf()),
            prefix: "geodata-test-".to_string(),
        }
    }

    #[test]
    fn test_acquire_creates_unique_directories() {
        let base = tempfile::tempdir().unwrap();
        let first = StagingArea::acquire(&config_in(base.path())).unwrap();
        let second = StagingArea::acquire(&config_in(base.path())).unwrap();

        assert!(first.path().is_dir());
        assert!(second.path().is_dir());
        assert_ne!(first.path(), second.path());
        assert!(first.path().starts_with(base.path()));
    }

    #[test]
    fn test_release_removes_contents() {
        let base = tempfile::tempdir().unwrap();
        let staging = StagingArea::acquire(&config_in(base.path())).unwrap();
        let root = staging.path().to_path_buf();
        std::fs::create_dir_all(root.join("nested")).unwrap();
        std::fs::write(root.join("nested").join("data.csv"), "a,b\n").unwrap();

        staging.release();

        assert!(!root.exists());
    }

    #[test]
    fn test_drop_removes_directory_on_early_exit() {
        let base = tempfile::tempdir().unwrap();
        let root = {
            let staging = StagingArea::acquire(&config_in(base.path())).unwrap();
            std::fs::write(staging.file("indicators.xls"), b"xls").unwrap();
            staging.path().to_path_buf()
        };
        assert!(!root.exists());
    }

    #[test]
    fn test_missing_base_is_created() {
        let base = tempfile::tempdir().unwrap();
        let nested = base.path().join("a").join("b");
        let staging = StagingArea::acquire(&config_in(&nested)).unwrap();
        assert!(staging.path().starts_with(&nested));
    }
}
