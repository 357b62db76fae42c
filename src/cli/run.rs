//! `credo <module> <item>...`: resolve items and commit them to the manifest.
//!
//! Any subcommand clap does not know is treated as a module name and looked up
//! in the host's registry. The module's own command definition parses the
//! remaining arguments, so `credo apt` without a package is a usage error and
//! `credo apt --help` shows the module's help.

use anyhow::{Result, anyhow};
use clap::ArgMatches;
use colored::Colorize;
use std::path::PathBuf;

use super::common::{CommandContext, ModuleSession, require_module};
use crate::manifest::Manifest;
use crate::modules::{Module, ModuleRegistry, RunSummary};

/// Dispatch `args` (module name first) to the registered module.
pub async fn execute(args: Vec<String>, manifest_path: Option<PathBuf>) -> Result<()> {
    let Some(name) = args.first() else {
        return Err(anyhow!("No module given"));
    };

    let mut ctx = CommandContext::discover(manifest_path)?;
    let session = ModuleSession::open(&ctx.project_dir).await?;

    let summary = match run_module(&session.registry, &mut ctx.manifest, &args).await {
        Ok(summary) => summary,
        // Usage errors print clap's help text and exit with its code
        Err(e) => match e.downcast::<clap::Error>() {
            Ok(usage) => usage.exit(),
            Err(e) => return Err(e),
        },
    };

    if !summary.committed.is_empty() {
        ctx.save_manifest()?;
    }
    report(name, &summary);
    session.print_suggestions();

    Ok(())
}

/// Parse `args` (module name first) with the module's command definition.
pub fn parse_args(module: &dyn Module, args: &[String]) -> Result<ArgMatches, clap::Error> {
    module.cli_config().try_get_matches_from(args)
}

/// Resolve and commit the items in `args` (module name first) into `manifest`.
pub async fn run_module(
    registry: &ModuleRegistry,
    manifest: &mut Manifest,
    args: &[String],
) -> Result<RunSummary> {
    let name = args.first().ok_or_else(|| anyhow!("No module given"))?;
    let module = require_module(registry, name)?;
    let matches = parse_args(module.as_ref(), args)?;
    module.run(manifest, &matches).await
}

fn report(module: &str, summary: &RunSummary) {
    for name in &summary.committed {
        println!("{} Added {} to {}", "✓".green(), name.bright_white(), module.cyan());
    }
    for name in &summary.already_present {
        println!("{} {} is already in {}", "-".yellow(), name, module.cyan());
    }
}
