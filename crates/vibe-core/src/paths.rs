//! Preview directory management.
//!
//! Provides a consistent directory structure for preview builds so the CLI
//! and embedding applications agree on where transient artifacts live.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Directory structure for a preview workspace.
///
/// All preview-related files are stored under a `.vibe` directory inside
/// the working directory:
///
/// ```text
/// .vibe/
/// └── build/      # Per-load scratch directories (removed after each load)
/// ```
#[derive(Debug, Clone)]
pub struct PreviewDirs {
    /// The `.vibe` directory itself.
    pub vibe_dir: PathBuf,

    /// Build directory for compiled component artifacts.
    pub build_dir: PathBuf,
}

impl PreviewDirs {
    /// Create the directory structure under `root`.
    ///
    /// # Errors
    /// Returns an error if directory creation fails.
    pub fn from_root(root: &Path) -> Result<Self> {
        let vibe_dir = root.join(".vibe");
        let build_dir = vibe_dir.join("build");

        fs::create_dir_all(&build_dir)?;

        Ok(Self {
            vibe_dir,
            build_dir,
        })
    }

    /// Create the directory structure next to a component or generation file.
    pub fn from_source_path(source_path: &Path) -> Result<Self> {
        let dir = source_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        Self::from_root(dir)
    }

    /// Remove every leftover build artifact.
    ///
    /// Scratch directories are normally removed as soon as their load
    /// settles; this clears what a crashed process left behind.
    pub fn clean_build(&self) -> Result<()> {
        if self.build_dir.exists() {
            fs::remove_dir_all(&self.build_dir)?;
        }
        fs::create_dir_all(&self.build_dir)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_from_root_creates_layout() {
        let temp = TempDir::new().unwrap();
        let dirs = PreviewDirs::from_root(temp.path()).unwrap();

        assert!(dirs.build_dir.is_dir());
        assert_eq!(dirs.vibe_dir, temp.path().join(".vibe"));
    }

    #[test]
    fn test_from_source_path_uses_parent() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("component.rs");
        let dirs = PreviewDirs::from_source_path(&source).unwrap();

        assert_eq!(dirs.build_dir, temp.path().join(".vibe").join("build"));
    }

    #[test]
    fn test_clean_build_keeps_directory() {
        let temp = TempDir::new().unwrap();
        let dirs = PreviewDirs::from_root(temp.path()).unwrap();
        fs::create_dir_all(dirs.build_dir.join("stale")).unwrap();

        dirs.clean_build().unwrap();

        assert!(dirs.build_dir.is_dir());
        assert!(!dirs.build_dir.join("stale").exists());
    }
}
