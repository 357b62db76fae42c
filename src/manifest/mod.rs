//! Spell manifest (`credospell.toml`) parsing, persistence and discovery.
//!
//! The manifest is the persisted collection of committed spells, partitioned
//! per module. It is only ever mutated through
//! [`Module::commit`](crate::modules::Module::commit); resolution logic never
//! touches it directly.
//!
//! # Format
//!
//! ```toml
//! [[apt]]
//! name = "python3"
//!
//! [[apt.dependencies]]
//! name = "libpython3-stdlib"
//!
//! [[apt.dependencies]]
//! name = "python3-doc"
//! optional = true
//!
//! [[url]]
//! name = "https://example.com/file.txt"
//! output = "data/file.txt"
//! ```
//!
//! # Discovery
//!
//! Like git with `.git`, credo searches for `credospell.toml` starting from the
//! current directory and walking up to the filesystem root. The directory
//! holding the manifest is the project root that per-module download
//! directories (`<project>/<module>/`) live in.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::constants::{MANIFEST_ENV_VAR, MANIFEST_FILE_NAME};
use crate::core::CredoError;
use crate::spell::{APT_MODULE, Spell, URL_MODULE, UrlSpell};
use crate::utils::fs::atomic_write;

/// The committed spells of a project, per module.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    /// System package spells.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub apt: Vec<Spell>,

    /// URL download spells.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub url: Vec<UrlSpell>,
}

impl Manifest {
    /// Create an empty manifest.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// True when no module has committed spells.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.apt.is_empty() && self.url.is_empty()
    }

    /// Number of committed top-level spells across all modules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.apt.len() + self.url.len()
    }

    /// Committed spell count per module section, in a fixed order.
    #[must_use]
    pub fn sections(&self) -> [(&'static str, usize); 2] {
        [(APT_MODULE, self.apt.len()), (URL_MODULE, self.url.len())]
    }

    /// Load a manifest from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read manifest file: {}", path.display()))?;

        toml::from_str(&content)
            .map_err(|e| CredoError::ManifestParseError {
                file: path.display().to_string(),
                reason: e.to_string(),
            })
            .with_context(|| format!("Invalid TOML syntax in manifest file: {}", path.display()))
    }

    /// Write the manifest to disk atomically.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content =
            toml::to_string_pretty(self).context("Failed to serialize manifest data to TOML")?;

        atomic_write(path, content.as_bytes())
            .with_context(|| format!("Failed to write manifest file: {}", path.display()))
    }
}

/// Find the manifest by searching up from the current directory.
///
/// `CREDO_MANIFEST` (set from `--manifest-path`) takes precedence when present.
pub fn find_manifest() -> Result<PathBuf> {
    if let Ok(explicit) = std::env::var(MANIFEST_ENV_VAR) {
        return find_manifest_with_optional(Some(PathBuf::from(explicit)));
    }
    let current = std::env::current_dir()
        .context("Cannot determine current working directory")?;
    find_manifest_from(current)
}

/// Use `explicit_path` if given and present, otherwise search from the current directory.
pub fn find_manifest_with_optional(explicit_path: Option<PathBuf>) -> Result<PathBuf> {
    match explicit_path {
        Some(path) => {
            if path.exists() {
                Ok(path)
            } else {
                Err(CredoError::ManifestNotFound.into())
            }
        }
        None => find_manifest(),
    }
}

/// Find the manifest by searching up from `current`.
pub fn find_manifest_from(mut current: PathBuf) -> Result<PathBuf> {
    loop {
        let manifest_path = current.join(MANIFEST_FILE_NAME);
        if manifest_path.exists() {
            return Ok(manifest_path);
        }

        if !current.pop() {
            return Err(CredoError::ManifestNotFound.into());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample() -> Manifest {
        Manifest {
            apt: vec![
                Spell::new("python3")
                    .with_dependency(Spell::new("libpython3-stdlib"))
                    .with_dependency(Spell::optional("python3-doc")),
            ],
            url: vec![UrlSpell::new("https://example.com/file.txt").with_output("data/file.txt")],
        }
    }

    #[test]
    fn test_save_and_load() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(MANIFEST_FILE_NAME);

        let manifest = sample();
        manifest.save(&path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("[[apt]]"));
        assert!(content.contains("[[apt.dependencies]]"));
        assert!(content.contains("optional = true"));
        assert!(content.contains("[[url]]"));

        assert_eq!(Manifest::load(&path).unwrap(), manifest);
    }

    #[test]
    fn test_load_empty_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(MANIFEST_FILE_NAME);
        std::fs::write(&path, "# empty\n").unwrap();

        let manifest = Manifest::load(&path).unwrap();
        assert!(manifest.is_empty());
        assert_eq!(manifest.len(), 0);
        assert_eq!(manifest.sections(), [("apt", 0), ("url", 0)]);
    }

    #[test]
    fn test_load_invalid_toml() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(MANIFEST_FILE_NAME);
        std::fs::write(&path, "[[apt]\nname = ").unwrap();

        let err = Manifest::load(&path).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<CredoError>(),
            Some(CredoError::ManifestParseError { .. })
        ));
    }

    #[test]
    fn test_external_dependencies_nest() {
        let mut spell = Spell::new("r-base");
        spell.external_dependencies.url.push(UrlSpell::new("https://cran.r-project.org/x.tar.gz"));
        let manifest = Manifest {
            apt: vec![spell],
            url: vec![],
        };

        let text = toml::to_string_pretty(&manifest).unwrap();
        let back: Manifest = toml::from_str(&text).unwrap();
        assert_eq!(back, manifest);
    }

    #[test]
    fn test_find_manifest_from_parent() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join(MANIFEST_FILE_NAME), "").unwrap();
        let nested = temp.path().join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();

        let found = find_manifest_from(nested).unwrap();
        assert_eq!(found, temp.path().join(MANIFEST_FILE_NAME));
    }

    #[test]
    fn test_find_manifest_from_missing() {
        let temp = TempDir::new().unwrap();
        let err = find_manifest_from(temp.path().to_path_buf()).unwrap_err();
        assert!(matches!(err.downcast_ref::<CredoError>(), Some(CredoError::ManifestNotFound)));
    }

    #[test]
    fn test_find_manifest_with_optional_explicit_missing() {
        let temp = TempDir::new().unwrap();
        let result = find_manifest_with_optional(Some(temp.path().join("nope.toml")));
        assert!(result.is_err());
    }

    #[test]
    #[serial_test::serial]
    fn test_find_manifest_env_override() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("custom.toml");
        std::fs::write(&path, "").unwrap();

        // SAFETY: serialized with every other test touching CREDO_MANIFEST
        unsafe { std::env::set_var(MANIFEST_ENV_VAR, &path) };
        let found = find_manifest();
        unsafe { std::env::remove_var(MANIFEST_ENV_VAR) };

        assert_eq!(found.unwrap(), path);
    }
}
