//! System package module (`credo apt <package>...`).
//!
//! Resolution steps for one package:
//!
//! 1. Return the cached spell if `(apt, name)` was resolved before.
//! 2. Refresh the package index while holding the module's refresh lock.
//! 3. Simulate the install to make sure the package exists and is installable.
//! 4. Query direct dependencies. Descriptors of the form `<name>` are kept as
//!    optional children and reported as suggestions.
//! 5. Cache the result.
//!
//! `save` runs `apt-get download` into `<project>/apt/`; `apply` installs the
//! downloaded `.deb` and never falls back to the live repositories.

use anyhow::{Context, Result};
use async_trait::async_trait;
use clap::{Arg, ArgAction, ArgMatches};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};
use tokio::sync::Mutex;

use super::{Module, ModuleContext, bulk_order};
use crate::apt::AptClient;
use crate::core::CredoError;
use crate::host::HostInfo;
use crate::manifest::Manifest;
use crate::spell::{APT_MODULE, Spell, SpellEntry, contains};
use crate::suggest::Suggestion;
use crate::utils::fs::ensure_dir;

const ABOUT: &str = "Retrieves an apt package and its dependencies.";

const EXAMPLES: &str = "\
Examples:
  Add an apt package:
    credo apt python3

  Add several packages at once:
    credo apt curl git";

/// Distributions (by `ID` or `ID_LIKE`) that ship apt.
const SUPPORTED_DISTRIBUTIONS: &[&str] = &["debian", "ubuntu"];

static OPTIONAL_DEPENDENCY: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"<(?P<name>.+)>"));

/// Split a raw dependency descriptor into its name and whether it is optional.
pub fn parse_descriptor(descriptor: &str) -> Result<(String, bool)> {
    let re = OPTIONAL_DEPENDENCY
        .as_ref()
        .map_err(|e| anyhow::anyhow!("Invalid optional dependency pattern: {e}"))?;
    Ok(match re.captures(descriptor).and_then(|caps| caps.name("name")) {
        Some(name) => (name.as_str().to_string(), true),
        None => (descriptor.to_string(), false),
    })
}

/// Module managing the `apt` section of the manifest.
pub struct AptModule {
    ctx: ModuleContext,
    client: Arc<dyn AptClient>,
    refresh_lock: Arc<Mutex<()>>,
}

impl AptModule {
    /// A module with its own refresh lock.
    pub fn new(ctx: ModuleContext, client: Arc<dyn AptClient>) -> Self {
        Self::with_lock(ctx, client, Arc::new(Mutex::new(())))
    }

    /// A module sharing `refresh_lock` with other instances.
    pub fn with_lock(
        ctx: ModuleContext,
        client: Arc<dyn AptClient>,
        refresh_lock: Arc<Mutex<()>>,
    ) -> Self {
        Self {
            ctx,
            client,
            refresh_lock,
        }
    }

    /// Whether apt exists on `host`.
    #[must_use]
    pub fn supports(host: &HostInfo) -> bool {
        host.is_like_any(SUPPORTED_DISTRIBUTIONS)
    }

    fn download_dir(&self) -> Result<PathBuf> {
        self.ctx.project.module_dir(APT_MODULE)
    }

    async fn resolve_spell(&self, mut spell: Spell) -> Result<Spell> {
        if let Some(cached) = self.ctx.cache.retrieve::<Spell>(APT_MODULE, &spell.name) {
            tracing::debug!(target: "modules", "Using cached resolution for apt:{}", spell.name);
            return Ok(cached);
        }

        {
            let _guard = self.refresh_lock.lock().await;
            let changed = self.client.check_for_updates().await.map_err(|e| {
                CredoError::UpdateCheckFailed {
                    name: spell.name.clone(),
                    reason: format!("{e:#}"),
                }
            })?;
            tracing::debug!(target: "modules", "Package index refreshed (changed: {})", changed);
        }

        let output = self
            .client
            .install_dry(&spell.name)
            .await
            .with_context(|| format!("Dry-run install of '{}' failed", spell.name))?;
        tracing::debug!(target: "modules", "{}", output.trim());

        let descriptors = self
            .client
            .get_dependencies(&spell.name)
            .await
            .with_context(|| format!("Failed to list dependencies of '{}'", spell.name))?;

        for descriptor in descriptors {
            let (name, optional) = parse_descriptor(&descriptor)?;
            if optional {
                self.ctx.suggestions.register(Suggestion::new(APT_MODULE, &spell.name, &name));
            }
            spell.dependencies.push(Spell {
                name,
                optional,
                ..Spell::default()
            });
        }

        if let Err(e) = self.ctx.cache.insert(APT_MODULE, &spell.name, &spell).await {
            tracing::warn!(target: "cache", "Failed to cache apt:{}: {:#}", spell.name, e);
        }

        Ok(spell)
    }

    /// The `.deb` saved for `name` in `dir`, if any.
    fn find_archive(dir: &Path, name: &str) -> Option<PathBuf> {
        let pattern = format!(
            "{}/{}_*.deb",
            glob::Pattern::escape(&dir.to_string_lossy()),
            glob::Pattern::escape(name)
        );
        glob::glob(&pattern).ok().and_then(|mut paths| paths.find_map(std::result::Result::ok))
    }
}

#[async_trait]
impl Module for AptModule {
    fn name(&self) -> &'static str {
        APT_MODULE
    }

    fn cli_config(&self) -> clap::Command {
        clap::Command::new(APT_MODULE)
            .about(ABOUT)
            .after_help(EXAMPLES)
            .arg(
                Arg::new("name")
                    .help("Package name(s)")
                    .required(true)
                    .num_args(1..)
                    .action(ArgAction::Append),
            )
    }

    fn parse_stub(&self, matches: &ArgMatches) -> Result<Vec<SpellEntry>> {
        let names = matches
            .get_many::<String>("name")
            .ok_or_else(|| anyhow::anyhow!("{APT_MODULE} module requires at least one argument"))?;
        Ok(names.map(|name| SpellEntry::Apt(Spell::new(name.as_str()))).collect())
    }

    async fn resolve(&self, stub: SpellEntry) -> Result<SpellEntry> {
        let spell = stub.into_apt()?;
        Ok(SpellEntry::Apt(self.resolve_spell(spell).await?))
    }

    fn commit(&self, manifest: &mut Manifest, spell: SpellEntry) -> Result<()> {
        let spell = spell.into_apt()?;
        if contains(&manifest.apt, &spell) {
            return Err(CredoError::AlreadyPresent {
                module: APT_MODULE.to_string(),
                name: spell.name,
            }
            .into());
        }
        manifest.apt.push(spell);
        Ok(())
    }

    async fn save(&self, spell: &SpellEntry) -> Result<()> {
        let spell = spell.as_apt()?;
        let dir = self.download_dir()?;
        if self.ctx.cache.is_saved(APT_MODULE, &spell.name, &dir)
            && Self::find_archive(&dir, &spell.name).is_some()
        {
            tracing::debug!(target: "modules", "apt:{} already saved", spell.name);
            return Ok(());
        }

        ensure_dir(&dir)?;

        let output = self
            .client
            .download(&spell.name, &dir)
            .await
            .with_context(|| format!("Failed to save apt spell '{}'", spell.name))?;
        tracing::debug!(target: "modules", "{}", output.trim());

        if let Err(e) = self.ctx.cache.mark_saved(APT_MODULE, &spell.name, &dir).await {
            tracing::warn!(
                target: "cache",
                "Failed to record apt:{} as saved: {:#}",
                spell.name,
                e
            );
        }
        Ok(())
    }

    async fn apply(&self, spell: &SpellEntry) -> Result<()> {
        let spell = spell.as_apt()?;
        let dir = self.download_dir()?;
        let Some(archive) = Self::find_archive(&dir, &spell.name) else {
            return Err(CredoError::ArtifactNotFound {
                module: APT_MODULE.to_string(),
                name: spell.name.clone(),
                path: dir.display().to_string(),
            }
            .into());
        };

        let output = self
            .client
            .install(&archive.to_string_lossy())
            .await
            .with_context(|| format!("Failed to apply apt spell '{}'", spell.name))?;
        tracing::debug!(target: "modules", "{}", output.trim());
        Ok(())
    }

    async fn bulk_save(&self, manifest: &Manifest) -> Result<()> {
        for spell in bulk_order(&manifest.apt) {
            self.save(&SpellEntry::Apt(spell.clone())).await?;
        }
        Ok(())
    }

    async fn bulk_apply(&self, manifest: &Manifest) -> Result<()> {
        for spell in bulk_order(&manifest.apt) {
            self.apply(&SpellEntry::Apt(spell.clone())).await?;
        }
        Ok(())
    }
}
