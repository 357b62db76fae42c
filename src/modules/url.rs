//! URL download module (`credo url <url> [--output <path>]`).
//!
//! A url spell has no dependencies. `save` downloads the file into
//! `<project>/url/<digest>/<file name>` (see [`UrlSpell::storage_path`]),
//! verifying its SHA-256 when the manifest records one; `apply` copies it to
//! the spell's `output` path (relative to the project root) or, without one, to
//! the project root.

use anyhow::{Context, Result};
use async_trait::async_trait;
use clap::{Arg, ArgAction, ArgMatches};
use std::path::PathBuf;
use std::sync::Arc;

use super::{Module, ModuleContext};
use crate::core::CredoError;
use crate::download::Downloader;
use crate::host::HostInfo;
use crate::manifest::Manifest;
use crate::spell::{SpellEntry, URL_MODULE, UrlSpell, contains};
use crate::utils::fs::{ensure_dir, sha256_file};

const ABOUT: &str = "Downloads a file from a URL.";

const EXAMPLES: &str = "\
Examples:
  Download a file from a URL:
    credo url https://example.com/file.txt

  Download a file from a URL and save it to a specific path:
    credo url https://example.com/file.txt --output /path/to/save/file.txt";

/// Module managing the `url` section of the manifest.
pub struct UrlModule {
    ctx: ModuleContext,
    downloader: Arc<dyn Downloader>,
}

impl UrlModule {
    /// Create the module.
    pub fn new(ctx: ModuleContext, downloader: Arc<dyn Downloader>) -> Self {
        Self {
            ctx,
            downloader,
        }
    }

    /// Downloads work everywhere.
    #[must_use]
    pub const fn supports(_host: &HostInfo) -> bool {
        true
    }

    fn validate(spell: &UrlSpell) -> Result<(), CredoError> {
        let invalid = |reason: String| CredoError::InvalidUrl {
            url: spell.name.clone(),
            reason,
        };
        let url = reqwest::Url::parse(&spell.name).map_err(|e| invalid(e.to_string()))?;
        if spell.has_dot_segments() {
            return Err(invalid("path contains '.' or '..' segments".to_string()));
        }
        match url.scheme() {
            "http" | "https" => Ok(()),
            other => Err(invalid(format!("unsupported scheme '{other}'"))),
        }
    }

    fn saved_path(&self, spell: &UrlSpell) -> Result<PathBuf> {
        Ok(self.ctx.project.module_dir(URL_MODULE)?.join(spell.storage_path()))
    }

    fn apply_target(&self, spell: &UrlSpell) -> Result<PathBuf> {
        let root = self.ctx.project.project_path()?;
        Ok(match &spell.output {
            Some(output) if output.is_absolute() => output.clone(),
            Some(output) => root.join(output),
            None => root.join(spell.file_name()),
        })
    }
}

#[async_trait]
impl Module for UrlModule {
    fn name(&self) -> &'static str {
        URL_MODULE
    }

    fn cli_config(&self) -> clap::Command {
        clap::Command::new(URL_MODULE)
            .about(ABOUT)
            .after_help(EXAMPLES)
            .arg(
                Arg::new("name")
                    .help("URL(s) to download")
                    .required(true)
                    .num_args(1..)
                    .action(ArgAction::Append),
            )
            .arg(
                Arg::new("output")
                    .long("output")
                    .short('o')
                    .value_name("PATH")
                    .help("Where 'credo apply' places the file (single URL only)"),
            )
            .arg(
                Arg::new("sha256")
                    .long("sha256")
                    .value_name("HEX")
                    .help("Expected SHA-256 of the file (single URL only)"),
            )
    }

    fn parse_stub(&self, matches: &ArgMatches) -> Result<Vec<SpellEntry>> {
        let names: Vec<&String> = matches
            .get_many::<String>("name")
            .ok_or_else(|| anyhow::anyhow!("{URL_MODULE} module requires at least one argument"))?
            .collect();
        let output = matches.get_one::<String>("output");
        let sha256 = matches.get_one::<String>("sha256");

        if names.len() > 1 && (output.is_some() || sha256.is_some()) {
            anyhow::bail!("--output and --sha256 can only be used with a single URL");
        }

        Ok(names
            .into_iter()
            .map(|name| {
                let mut spell = UrlSpell::new(name.as_str());
                spell.output = output.map(PathBuf::from);
                spell.sha256 = sha256.map(|s| s.to_lowercase());
                SpellEntry::Url(spell)
            })
            .collect())
    }

    async fn resolve(&self, stub: SpellEntry) -> Result<SpellEntry> {
        let stub = stub.into_url()?;

        // Only the validated URL is cached; output and checksum always come
        // from this invocation.
        if self.ctx.cache.retrieve::<UrlSpell>(URL_MODULE, &stub.name).is_some() {
            tracing::debug!(target: "modules", "Using cached resolution for url:{}", stub.name);
            return Ok(SpellEntry::Url(stub));
        }

        Self::validate(&stub)?;

        let validated = UrlSpell::new(stub.name.as_str());
        if let Err(e) = self.ctx.cache.insert(URL_MODULE, &stub.name, &validated).await {
            tracing::warn!(target: "cache", "Failed to cache url:{}: {:#}", stub.name, e);
        }
        Ok(SpellEntry::Url(stub))
    }

    fn commit(&self, manifest: &mut Manifest, spell: SpellEntry) -> Result<()> {
        let spell = spell.into_url()?;
        if contains(&manifest.url, &spell) {
            return Err(CredoError::AlreadyPresent {
                module: URL_MODULE.to_string(),
                name: spell.name,
            }
            .into());
        }
        manifest.url.push(spell);
        Ok(())
    }

    async fn save(&self, spell: &SpellEntry) -> Result<()> {
        let spell = spell.as_url()?;
        Self::validate(spell)?;

        let dest = self.saved_path(spell)?;
        if self.ctx.cache.is_saved(URL_MODULE, &spell.name, &dest) && dest.exists() {
            tracing::debug!(target: "modules", "url:{} already saved", spell.name);
            return Ok(());
        }

        if let Some(parent) = dest.parent() {
            ensure_dir(parent)?;
        }

        let bytes = self
            .downloader
            .download(&spell.name, &dest)
            .await
            .with_context(|| format!("Failed to save url spell '{}'", spell.name))?;
        tracing::debug!(target: "modules", "Saved {} ({} bytes)", dest.display(), bytes);

        if let Some(expected) = &spell.sha256 {
            let actual = sha256_file(&dest)?;
            if !actual.eq_ignore_ascii_case(expected) {
                if let Err(e) = std::fs::remove_file(&dest) {
                    tracing::warn!(target: "modules", "Failed to remove {}: {}", dest.display(), e);
                }
                return Err(CredoError::ChecksumMismatch {
                    name: spell.name.clone(),
                    expected: expected.clone(),
                    actual,
                }
                .into());
            }
        }

        if let Err(e) = self.ctx.cache.mark_saved(URL_MODULE, &spell.name, &dest).await {
            tracing::warn!(
                target: "cache",
                "Failed to record url:{} as saved: {:#}",
                spell.name,
                e
            );
        }
        Ok(())
    }

    async fn apply(&self, spell: &SpellEntry) -> Result<()> {
        let spell = spell.as_url()?;
        let source = self.saved_path(spell)?;
        if !source.exists() {
            return Err(CredoError::ArtifactNotFound {
                module: URL_MODULE.to_string(),
                name: spell.name.clone(),
                path: source.display().to_string(),
            }
            .into());
        }

        let target = self.apply_target(spell)?;
        if let Some(parent) = target.parent() {
            ensure_dir(parent)?;
        }
        tokio::fs::copy(&source, &target).await.with_context(|| {
            format!("Failed to copy {} to {}", source.display(), target.display())
        })?;

        tracing::debug!(target: "modules", "Applied url:{} to {}", spell.name, target.display());
        Ok(())
    }

    async fn bulk_save(&self, manifest: &Manifest) -> Result<()> {
        for spell in &manifest.url {
            self.save(&SpellEntry::Url(spell.clone())).await?;
        }
        Ok(())
    }

    async fn bulk_apply(&self, manifest: &Manifest) -> Result<()> {
        for spell in &manifest.url {
            self.apply(&SpellEntry::Url(spell.clone())).await?;
        }
        Ok(())
    }
}
