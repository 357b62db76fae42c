//! Install the previously saved artifacts of every committed spell.
//!
//! `credo apply` never downloads anything; run `credo save` first. Installing
//! system packages normally requires root.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;

use super::common::{CommandContext, ModuleSession, modules_for};
use crate::manifest::Manifest;
use crate::modules::ModuleRegistry;

/// Command to apply saved spells.
#[derive(Args)]
pub struct ApplyCommand {
    /// Only apply the spells of this module
    #[arg(short, long)]
    module: Option<String>,
}

impl ApplyCommand {
    /// Run against the manifest at `manifest_path` or the discovered one.
    pub async fn execute_with_manifest_path(self, manifest_path: Option<PathBuf>) -> Result<()> {
        let ctx = CommandContext::discover(manifest_path)?;
        if ctx.manifest.is_empty() {
            println!("No spells to apply");
            return Ok(());
        }

        let session = ModuleSession::open(&ctx.project_dir).await?;
        let applied = apply_all(&session.registry, &ctx.manifest, self.module.as_deref()).await?;

        for name in applied {
            println!("{} Applied {} spells", "✓".green(), name.bright_white());
        }
        Ok(())
    }
}

/// Bulk-apply the selected modules in order, returning their names.
pub async fn apply_all(
    registry: &ModuleRegistry,
    manifest: &Manifest,
    only: Option<&str>,
) -> Result<Vec<&'static str>> {
    let mut applied = Vec::new();
    for module in modules_for(registry, manifest, only)? {
        tracing::info!("Applying {} spells", module.name());
        module
            .bulk_apply(manifest)
            .await
            .with_context(|| format!("Failed to apply {} spells", module.name()))?;
        applied.push(module.name());
    }
    Ok(applied)
}
