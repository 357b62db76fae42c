//! Temporary projects for module and CLI tests.

use anyhow::Result;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

use crate::cache::SpellCache;
use crate::constants::MANIFEST_FILE_NAME;
use crate::manifest::Manifest;
use crate::modules::ModuleContext;
use crate::project::ProjectRoot;
use crate::suggest::Suggestions;

/// A temporary project directory with an in-memory cache and a suggestion sink.
///
/// The directory is removed when the value is dropped.
pub struct TestProject {
    temp: TempDir,
    /// Cache shared by every context handed out
    pub cache: Arc<SpellCache>,
    /// Suggestion sink shared by every context handed out
    pub suggestions: Arc<Suggestions>,
}

impl TestProject {
    /// Create an empty project.
    pub fn new() -> Result<Self> {
        Ok(Self {
            temp: TempDir::new()?,
            cache: Arc::new(SpellCache::in_memory()),
            suggestions: Arc::new(Suggestions::new()),
        })
    }

    /// Create a project using `cache`, which other projects may share.
    pub fn with_cache(cache: Arc<SpellCache>) -> Result<Self> {
        Ok(Self {
            temp: TempDir::new()?,
            cache,
            suggestions: Arc::new(Suggestions::new()),
        })
    }

    /// Create a project whose cache persists under `<project>/.cache`.
    pub fn with_durable_cache() -> Result<Self> {
        let temp = TempDir::new()?;
        let cache = Arc::new(SpellCache::open(&temp.path().join(".cache"))?);
        Ok(Self {
            temp,
            cache,
            suggestions: Arc::new(Suggestions::new()),
        })
    }

    /// Project root.
    pub fn path(&self) -> &Path {
        self.temp.path()
    }

    /// Path of the project's manifest file.
    pub fn manifest_path(&self) -> PathBuf {
        self.path().join(MANIFEST_FILE_NAME)
    }

    /// Write `manifest` to the project's manifest file.
    pub fn write_manifest(&self, manifest: &Manifest) -> Result<PathBuf> {
        let path = self.manifest_path();
        manifest.save(&path)?;
        Ok(path)
    }

    /// Module context rooted at this project.
    pub fn context(&self) -> ModuleContext {
        ModuleContext::new(
            self.cache.clone(),
            self.suggestions.clone(),
            Arc::new(ProjectRoot::new(self.path())),
        )
    }
}
