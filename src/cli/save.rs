//! Download the artifacts of every committed spell into the project.
//!
//! Each module stores its artifacts in `<project>/<module>/`. Spells that are
//! already saved are skipped, and the command stops at the first failure.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;

use super::common::{CommandContext, ModuleSession, modules_for};
use crate::manifest::Manifest;
use crate::modules::ModuleRegistry;

/// Command to save committed spells.
#[derive(Args)]
pub struct SaveCommand {
    /// Only save the spells of this module
    #[arg(short, long)]
    module: Option<String>,
}

impl SaveCommand {
    /// Run against the manifest at `manifest_path` or the discovered one.
    pub async fn execute_with_manifest_path(self, manifest_path: Option<PathBuf>) -> Result<()> {
        let ctx = CommandContext::discover(manifest_path)?;
        if ctx.manifest.is_empty() {
            println!("No spells to save");
            return Ok(());
        }

        let session = ModuleSession::open(&ctx.project_dir).await?;
        let saved = save_all(&session.registry, &ctx.manifest, self.module.as_deref()).await?;

        for name in saved {
            println!("{} Saved {} spells", "✓".green(), name.bright_white());
        }
        Ok(())
    }
}

/// Bulk-save the selected modules in order, returning their names.
pub async fn save_all(
    registry: &ModuleRegistry,
    manifest: &Manifest,
    only: Option<&str>,
) -> Result<Vec<&'static str>> {
    let mut saved = Vec::new();
    for module in modules_for(registry, manifest, only)? {
        tracing::info!("Saving {} spells", module.name());
        module
            .bulk_save(manifest)
            .await
            .with_context(|| format!("Failed to save {} spells", module.name()))?;
        saved.push(module.name());
    }
    Ok(saved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::HostInfo;
    use crate::spell::{Spell, UrlSpell};
    use crate::test_utils::{MockAptClient, MockDownloader, TestProject};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_save_all_modules() {
        let project = TestProject::new().unwrap();
        let apt = Arc::new(MockAptClient::new().with_package("curl", &[]));
        let downloader =
            Arc::new(MockDownloader::new().with_file("https://example.com/a.txt", b"hello"));
        let registry = ModuleRegistry::for_host_with(
            &HostInfo::new("debian", Vec::<String>::new()),
            project.context(),
            apt.clone(),
            downloader.clone(),
        );

        let mut manifest = Manifest::new();
        manifest.apt.push(Spell::new("curl"));
        manifest.url.push(UrlSpell::new("https://example.com/a.txt"));

        let saved = save_all(&registry, &manifest, None).await.unwrap();
        assert_eq!(saved, vec!["apt", "url"]);
        assert_eq!(apt.downloaded(), vec!["curl".to_string()]);
        let stored = UrlSpell::new("https://example.com/a.txt").storage_path();
        assert!(project.path().join("url").join(stored).exists());

        // Only the selected module runs
        let saved = save_all(&registry, &manifest, Some("url")).await.unwrap();
        assert_eq!(saved, vec!["url"]);
        assert_eq!(downloader.calls(), 1);
    }

    #[tokio::test]
    async fn test_save_stops_at_first_failure() {
        let project = TestProject::new().unwrap();
        let apt = Arc::new(MockAptClient::new().with_package("curl", &[]).fail_download("curl"));
        let downloader = Arc::new(MockDownloader::new());
        let registry = ModuleRegistry::for_host_with(
            &HostInfo::new("ubuntu", Vec::<String>::new()),
            project.context(),
            apt,
            downloader.clone(),
        );

        let mut manifest = Manifest::new();
        manifest.apt.push(Spell::new("curl"));
        manifest.url.push(UrlSpell::new("https://example.com/a.txt"));

        let err = save_all(&registry, &manifest, None).await.unwrap_err();
        assert!(err.to_string().contains("Failed to save apt spells"));
        assert_eq!(downloader.calls(), 0);
    }
}
