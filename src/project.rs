//! Project root resolution.
//!
//! Saved artifacts live under `<project>/<module>/`; modules obtain the project
//! root through [`ProjectPath`] so tests can point them at a temporary directory.

use anyhow::Result;
use std::path::{Path, PathBuf};

/// Source of the project root directory.
pub trait ProjectPath: Send + Sync + std::fmt::Debug {
    /// Absolute project root.
    fn project_path(&self) -> Result<PathBuf>;

    /// Directory holding the saved artifacts of `module`.
    fn module_dir(&self, module: &str) -> Result<PathBuf> {
        Ok(self.project_path()?.join(module))
    }
}

/// A fixed project root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectRoot {
    root: PathBuf,
}

impl ProjectRoot {
    /// Use `root` as the project directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
        }
    }

    /// The directory containing `manifest_path`.
    #[must_use]
    pub fn from_manifest_path(manifest_path: &Path) -> Self {
        let root = manifest_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
        Self::new(root)
    }
}

impl ProjectPath for ProjectRoot {
    fn project_path(&self) -> Result<PathBuf> {
        Ok(self.root.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_manifest_path() {
        let root = ProjectRoot::from_manifest_path(Path::new("/work/app/credospell.toml"));
        assert_eq!(root.project_path().unwrap(), PathBuf::from("/work/app"));
        assert_eq!(root.module_dir("apt").unwrap(), PathBuf::from("/work/app/apt"));
    }

    #[test]
    fn test_from_bare_file_name() {
        let root = ProjectRoot::from_manifest_path(Path::new("credospell.toml"));
        assert_eq!(root.project_path().unwrap(), PathBuf::from("."));
    }
}
