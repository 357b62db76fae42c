//! Pluggable dependency modules.
//!
//! A module owns one section of the [`Manifest`] and knows how to resolve,
//! commit, save and apply the spells of that section through its external
//! source. Modules are created from the [`ModuleRegistry`], which only lists the
//! kinds that are applicable to the current host.
//!
//! # Lifecycle
//!
//! ```text
//! credo apt python3      resolve ─► commit ─► credospell.toml
//! credo save             bulk_save  (downloads into <project>/<module>/)
//! credo apply            bulk_apply (installs the saved artifacts)
//! ```
//!
//! Bulk operations visit every committed spell, acting first on each direct
//! non-optional dependency and then on the spell itself. They stop at the first
//! error.
//!
//! # Shared collaborators
//!
//! All modules receive a [`ModuleContext`] with the memoization cache, the
//! suggestion sink and the project root. The apt module additionally owns a
//! refresh lock shared by every instance the registry hands out, so package
//! index refreshes never overlap.

pub mod apt;
pub mod registry;
pub mod url;

pub use apt::AptModule;
pub use registry::{ModuleFactory, ModuleRegistry};
pub use url::UrlModule;

use anyhow::{Context, Result};
use async_trait::async_trait;
use clap::ArgMatches;
use std::sync::Arc;

use crate::cache::SpellCache;
use crate::core::is_already_present;
use crate::manifest::Manifest;
use crate::project::ProjectPath;
use crate::spell::{Spell, SpellEntry};
use crate::suggest::Suggestions;

/// Collaborators shared by every module instance.
#[derive(Debug, Clone)]
pub struct ModuleContext {
    /// Memoized resolutions and saved markers
    pub cache: Arc<SpellCache>,
    /// Sink for optional-dependency hints
    pub suggestions: Arc<Suggestions>,
    /// Root the per-module download directories live under
    pub project: Arc<dyn ProjectPath>,
}

impl ModuleContext {
    /// Bundle the collaborators.
    pub fn new(
        cache: Arc<SpellCache>,
        suggestions: Arc<Suggestions>,
        project: Arc<dyn ProjectPath>,
    ) -> Self {
        Self {
            cache,
            suggestions,
            project,
        }
    }
}

/// Outcome of [`Module::run`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Names appended to the manifest
    pub committed: Vec<String>,
    /// Names skipped because an equal spell was already committed
    pub already_present: Vec<String>,
}

/// The six-operation contract every dependency module implements.
#[async_trait]
pub trait Module: Send + Sync {
    /// Module name; also the manifest section and the CLI subcommand.
    fn name(&self) -> &'static str;

    /// Subcommand definition: `credo <name> <item>...`.
    fn cli_config(&self) -> clap::Command;

    /// Turn parsed CLI arguments into stub spells.
    fn parse_stub(&self, matches: &ArgMatches) -> Result<Vec<SpellEntry>>;

    /// Resolve a stub into a full spell, consulting the cache first.
    async fn resolve(&self, stub: SpellEntry) -> Result<SpellEntry>;

    /// Append `spell` to the module's manifest section unless an equal spell
    /// is already there.
    fn commit(&self, manifest: &mut Manifest, spell: SpellEntry) -> Result<()>;

    /// Materialize one spell into the project.
    async fn save(&self, spell: &SpellEntry) -> Result<()>;

    /// Install one previously saved spell.
    async fn apply(&self, spell: &SpellEntry) -> Result<()>;

    /// Save every committed spell of this module.
    async fn bulk_save(&self, manifest: &Manifest) -> Result<()>;

    /// Apply every committed spell of this module.
    async fn bulk_apply(&self, manifest: &Manifest) -> Result<()>;

    /// CLI entry point: resolve and commit each requested item.
    ///
    /// An already committed item is logged and skipped; every other error is
    /// returned.
    async fn run(&self, manifest: &mut Manifest, matches: &ArgMatches) -> Result<RunSummary> {
        let stubs = self.parse_stub(matches)?;
        let mut summary = RunSummary::default();

        for stub in stubs {
            let name = stub.name().to_string();
            let spell = self
                .resolve(stub)
                .await
                .with_context(|| format!("Failed to resolve {} spell '{}'", self.name(), name))?;

            match self.commit(manifest, spell) {
                Ok(()) => {
                    tracing::info!(target: "modules", "Committed {}:{}", self.name(), name);
                    summary.committed.push(name);
                }
                Err(e) if is_already_present(&e) => {
                    tracing::info!(target: "modules", "{}", e);
                    summary.already_present.push(name);
                }
                Err(e) => return Err(e),
            }
        }

        Ok(summary)
    }
}

/// Traversal order of bulk operations: for each spell, its direct non-optional
/// dependencies followed by the spell itself.
pub fn bulk_order(spells: &[Spell]) -> Vec<&Spell> {
    let mut order = Vec::new();
    for spell in spells {
        order.extend(spell.required_dependencies());
        order.push(spell);
    }
    order
}
