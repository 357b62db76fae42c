//! Shared plumbing for the CLI commands.
//!
//! Every command that touches spells goes through the same two steps: locate
//! and load the manifest ([`CommandContext`]), then assemble the modules
//! available on this host around a cache and a suggestion sink
//! ([`ModuleSession`]).

use anyhow::{Context, Result};
use colored::Colorize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::cache::SpellCache;
use crate::config::GlobalConfig;
use crate::core::{CredoError, ErrorContext, IntoAnyhowWithContext};
use crate::host::HostInfo;
use crate::manifest::{Manifest, find_manifest_with_optional};
use crate::modules::{Module, ModuleContext, ModuleRegistry};
use crate::project::{ProjectPath, ProjectRoot};
use crate::suggest::Suggestions;

/// A loaded manifest together with where it came from.
#[derive(Debug)]
pub struct CommandContext {
    /// Parsed manifest
    pub manifest: Manifest,
    /// Path to the manifest file
    pub manifest_path: PathBuf,
    /// Directory containing the manifest
    pub project_dir: PathBuf,
}

impl CommandContext {
    /// Load the manifest at `manifest_path`.
    pub fn from_manifest_path(manifest_path: impl AsRef<Path>) -> Result<Self> {
        let manifest_path = manifest_path.as_ref();

        if !manifest_path.exists() {
            return Err(CredoError::ManifestNotFound.into());
        }

        // Saved markers are recorded per absolute artifact location
        let project_dir = ProjectRoot::from_manifest_path(manifest_path).project_path()?;
        let project_dir = project_dir.canonicalize().with_context(|| {
            format!("Failed to resolve project directory: {}", project_dir.display())
        })?;

        let manifest = Manifest::load(manifest_path).with_context(|| {
            format!("Failed to parse manifest file: {}", manifest_path.display())
        })?;

        Ok(Self {
            manifest,
            manifest_path: manifest_path.to_path_buf(),
            project_dir,
        })
    }

    /// Use `explicit` when given, otherwise search upward from the current
    /// directory.
    pub fn discover(explicit: Option<PathBuf>) -> Result<Self> {
        let manifest_path = find_manifest_with_optional(explicit)?;
        Self::from_manifest_path(manifest_path)
    }

    /// Write the (possibly modified) manifest back to its file.
    pub fn save_manifest(&self) -> Result<()> {
        self.manifest
            .save(&self.manifest_path)
            .with_context(|| format!("Failed to save manifest: {}", self.manifest_path.display()))
    }
}

/// Modules for this host plus the collaborators they share.
pub struct ModuleSession {
    /// Effective global configuration
    pub config: GlobalConfig,
    /// Durable resolution cache
    pub cache: Arc<SpellCache>,
    /// Hints collected while resolving
    pub suggestions: Arc<Suggestions>,
    /// Modules applicable to this host
    pub registry: ModuleRegistry,
}

impl ModuleSession {
    /// Load the global config, open the cache and build the host's registry
    /// rooted at `project_dir`.
    pub async fn open(project_dir: &Path) -> Result<Self> {
        let config = GlobalConfig::load().await?;
        let cache_dir = config.cache_dir()?;
        let cache = Arc::new(
            SpellCache::open(&cache_dir)
                .with_context(|| format!("Failed to open cache in {}", cache_dir.display()))?,
        );
        let suggestions = Arc::new(Suggestions::new());
        let ctx = ModuleContext::new(
            cache.clone(),
            suggestions.clone(),
            Arc::new(ProjectRoot::new(project_dir)),
        );

        let host = HostInfo::detect()?;
        tracing::debug!("Host: {} (like: {:?})", host.distribution, host.like);
        let registry = ModuleRegistry::for_host(&host, ctx, config.command_timeout())?;

        Ok(Self {
            config,
            cache,
            suggestions,
            registry,
        })
    }

    /// Print the collected suggestions unless disabled in the config.
    pub fn print_suggestions(&self) {
        if self.config.show_suggestions {
            print_suggestions(&self.suggestions);
        }
    }
}

/// Print and drain the suggestions in `sink`.
pub fn print_suggestions(sink: &Suggestions) {
    let suggestions = sink.take();
    if suggestions.is_empty() {
        return;
    }
    println!("\n{}", "Suggestions:".cyan());
    for suggestion in suggestions {
        println!("  {suggestion}");
    }
}

/// Look up `name`, turning a miss into [`CredoError::ModuleNotFound`] with a
/// "did you mean" hint when a registered name is close.
pub fn require_module(registry: &ModuleRegistry, name: &str) -> Result<Box<dyn Module>> {
    if let Some(module) = registry.get(name) {
        return Ok(module);
    }

    let error = CredoError::ModuleNotFound {
        name: name.to_string(),
    };
    match registry.similar(name) {
        Some(candidate) => {
            let context = ErrorContext::new(error.clone())
                .with_suggestion(format!("Did you mean '{candidate}'?"));
            Err(error.into_anyhow_with_context(context))
        }
        None => Err(error.into()),
    }
}

/// Modules a bulk command acts on.
///
/// With `only`, just that module. Otherwise every module with committed
/// spells; a section whose module is unavailable here is an error.
pub fn modules_for(
    registry: &ModuleRegistry,
    manifest: &Manifest,
    only: Option<&str>,
) -> Result<Vec<Box<dyn Module>>> {
    if let Some(name) = only {
        return Ok(vec![require_module(registry, name)?]);
    }

    manifest
        .sections()
        .into_iter()
        .filter(|(_, count)| *count > 0)
        .map(|(name, _)| require_module(registry, name))
        .collect()
}
