//! credo - record project dependencies as spells and materialize them anywhere
//!
//! A project lists what it needs in `credospell.toml`. Each section of the
//! manifest belongs to a *module* (system packages through `apt`, plain files
//! through `url`) that knows how to resolve an item into a spell, commit it,
//! download its artifacts into the project (`save`) and install them
//! (`apply`).
//!
//! # Layout
//!
//! - [`spell`] - The spell data model and structural equality
//! - [`manifest`] - `credospell.toml` parsing, persistence and discovery
//! - [`modules`] - The module contract, the apt and url modules, the registry
//! - [`cache`] - Memoized resolutions and saved markers
//! - [`apt`] / [`download`] - External sources behind async traits
//! - [`host`] - Host distribution detection for module gating
//! - [`suggest`] - Optional-dependency hints collected while resolving
//! - [`config`] - Global user configuration
//! - [`cli`] - Command-line interface
//!
//! # Example
//!
//! ```rust,no_run
//! use credo_cli::cache::SpellCache;
//! use credo_cli::host::HostInfo;
//! use credo_cli::manifest::Manifest;
//! use credo_cli::modules::{ModuleContext, ModuleRegistry};
//! use credo_cli::project::ProjectRoot;
//! use credo_cli::suggest::Suggestions;
//! use std::sync::Arc;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let ctx = ModuleContext::new(
//!     Arc::new(SpellCache::in_memory()),
//!     Arc::new(Suggestions::new()),
//!     Arc::new(ProjectRoot::new(".")),
//! );
//! let registry = ModuleRegistry::for_host(&HostInfo::detect()?, ctx, None)?;
//! let mut manifest = Manifest::new();
//! if let Some(url) = registry.get("url") {
//!     let matches = url.cli_config().try_get_matches_from(["url", "https://example.com/a.txt"])?;
//!     url.run(&mut manifest, &matches).await?;
//! }
//! # Ok(())
//! # }
//! ```

pub mod apt;
pub mod cache;
pub mod cli;
pub mod config;
pub mod constants;
pub mod core;
pub mod download;
pub mod host;
pub mod manifest;
pub mod modules;
pub mod project;
pub mod spell;
pub mod suggest;
pub mod utils;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
