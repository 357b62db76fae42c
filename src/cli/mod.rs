//! Command-line interface for credo.
//!
//! # Available Commands
//!
//! - `init` - Create a `credospell.toml` in a project directory
//! - `<module> <item>...` - Resolve items through a module and commit them
//! - `save` - Download the artifacts of all committed spells
//! - `apply` - Install the saved artifacts
//! - `list` - Show the committed spells
//! - `modules` - Show the modules available on this host
//!
//! # Basic Workflow
//!
//! ```bash
//! credo init
//! credo apt python3
//! credo url https://example.com/file.txt --output data/file.txt
//! credo save
//! sudo credo apply
//! ```
//!
//! # Global Options
//!
//! - `--verbose` / `--quiet` - Log level (`RUST_LOG` applies otherwise)
//! - `--config` - Path to the global config file
//! - `--manifest-path` - Path to `credospell.toml`, skipping discovery

mod apply;
pub mod common;
mod init;
mod list;
mod modules;
mod run;
mod save;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::constants::{CONFIG_ENV_VAR, MANIFEST_ENV_VAR};

/// Settings derived from the global flags and shared with command handlers
/// through the environment.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    /// Path to the global config file (`--config`)
    pub config_path: Option<PathBuf>,
    /// Path to the manifest (`--manifest-path`)
    pub manifest_path: Option<PathBuf>,
}

impl CliConfig {
    /// Create a config with no overrides.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Export the overrides as `CREDO_CONFIG` / `CREDO_MANIFEST`.
    pub fn apply_to_env(&self) {
        // SAFETY: called once from the main task before any other task or
        // thread reads the environment.
        unsafe {
            if let Some(path) = &self.config_path {
                std::env::set_var(CONFIG_ENV_VAR, path);
            }
            if let Some(path) = &self.manifest_path {
                std::env::set_var(MANIFEST_ENV_VAR, path);
            }
        }
    }
}

/// Main CLI structure for credo.
#[derive(Parser)]
#[command(
    name = "credo",
    about = "credo - Record project dependencies as spells and materialize them anywhere",
    version,
    long_about = "credo resolves system packages and downloads into a committed credospell.toml, \
                  saves their artifacts into the project and installs them on any compatible host."
)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Path to the global config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Path to credospell.toml (skips the upward search)
    #[arg(long, global = true)]
    manifest_path: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new credospell.toml
    Init(init::InitCommand),

    /// Download the artifacts of every committed spell
    Save(save::SaveCommand),

    /// Install the saved artifacts of every committed spell
    Apply(apply::ApplyCommand),

    /// Show the committed spells
    List(list::ListCommand),

    /// Show the modules available on this host
    Modules,

    /// Resolve items with a module, e.g. `credo apt python3`
    #[command(external_subcommand)]
    Module(Vec<String>),
}

impl Cli {
    /// Execute the parsed command.
    pub async fn execute(self) -> Result<()> {
        let config = self.build_config();
        self.execute_with_config(config).await
    }

    /// Collect the global flags.
    #[must_use]
    pub fn build_config(&self) -> CliConfig {
        CliConfig {
            config_path: self.config.clone(),
            manifest_path: self.manifest_path.clone(),
        }
    }

    /// Default log filter for the global flags; `None` defers to `RUST_LOG`.
    #[must_use]
    pub const fn log_filter(&self) -> Option<&'static str> {
        if self.verbose {
            Some("debug")
        } else if self.quiet {
            Some("error")
        } else {
            None
        }
    }

    /// Execute with an explicit configuration.
    pub async fn execute_with_config(self, config: CliConfig) -> Result<()> {
        config.apply_to_env();

        match self.command {
            Commands::Init(cmd) => cmd.execute().await,
            Commands::Save(cmd) => cmd.execute_with_manifest_path(self.manifest_path).await,
            Commands::Apply(cmd) => cmd.execute_with_manifest_path(self.manifest_path).await,
            Commands::List(cmd) => cmd.execute_with_manifest_path(self.manifest_path).await,
            Commands::Modules => modules::execute().await,
            Commands::Module(args) => run::execute(args, self.manifest_path).await,
        }
    }
}
