//! List the modules available on this host.

use anyhow::Result;
use colored::Colorize;

use super::common::ModuleSession;
use crate::modules::ModuleRegistry;

/// Print every registered module with its one-line description.
pub async fn execute() -> Result<()> {
    let project_dir = std::env::current_dir()?;
    let session = ModuleSession::open(&project_dir).await?;
    print!("{}", render(&session.registry));
    Ok(())
}

/// One `name  about` line per registered module.
#[must_use]
pub fn render(registry: &ModuleRegistry) -> String {
    let modules = registry.all();
    let width = modules.iter().map(|m| m.name().len()).max().unwrap_or(0);

    modules
        .iter()
        .map(|module| {
            let about =
                module.cli_config().get_about().map(ToString::to_string).unwrap_or_default();
            let name = format!("{:width$}", module.name());
            format!("{}  {}\n", name.bold(), about)
        })
        .collect()
}
