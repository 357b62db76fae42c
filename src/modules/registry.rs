//! Name → factory table of the modules available on this host.

use anyhow::Result;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use super::{AptModule, Module, ModuleContext, UrlModule};
use crate::apt::{AptClient, SystemApt};
use crate::constants::MODULE_SUGGESTION_THRESHOLD;
use crate::download::{Downloader, HttpDownloader};
use crate::host::HostInfo;

/// Creates a fresh module instance.
pub type ModuleFactory = Box<dyn Fn() -> Box<dyn Module> + Send + Sync>;

/// Registry of module factories keyed by module name.
///
/// Registration is explicit: [`ModuleRegistry::for_host`] consults each known
/// module kind once and registers the applicable ones.
#[derive(Default)]
pub struct ModuleRegistry {
    factories: BTreeMap<String, ModuleFactory>,
}

impl std::fmt::Debug for ModuleRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleRegistry").field("modules", &self.names()).finish()
    }
}

impl ModuleRegistry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry for the running host, backed by the real apt binaries and an
    /// HTTP client.
    pub fn for_host(
        host: &HostInfo,
        ctx: ModuleContext,
        command_timeout: Option<Duration>,
    ) -> Result<Self> {
        let apt: Arc<dyn AptClient> = Arc::new(SystemApt::new().with_timeout(command_timeout));
        let downloader: Arc<dyn Downloader> = Arc::new(HttpDownloader::new()?);
        Ok(Self::for_host_with(host, ctx, apt, downloader))
    }

    /// Registry for `host` using the given external clients.
    pub fn for_host_with(
        host: &HostInfo,
        ctx: ModuleContext,
        apt: Arc<dyn AptClient>,
        downloader: Arc<dyn Downloader>,
    ) -> Self {
        let mut registry = Self::new();

        if AptModule::supports(host) {
            // One refresh lock for every apt instance handed out
            let refresh_lock = Arc::new(tokio::sync::Mutex::new(()));
            let ctx = ctx.clone();
            registry.register(crate::spell::APT_MODULE, move || {
                Box::new(AptModule::with_lock(ctx.clone(), apt.clone(), refresh_lock.clone()))
            });
        } else {
            tracing::debug!(
                target: "modules",
                "apt module not available on '{}' (like: {:?})",
                host.distribution,
                host.like
            );
        }

        if UrlModule::supports(host) {
            registry.register(crate::spell::URL_MODULE, move || {
                Box::new(UrlModule::new(ctx.clone(), downloader.clone()))
            });
        }

        registry
    }

    /// Register `factory` under `name`, replacing any previous factory.
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn() -> Box<dyn Module> + Send + Sync + 'static,
    {
        let name = name.into();
        if self.factories.insert(name.clone(), Box::new(factory)).is_some() {
            tracing::debug!(target: "modules", "Replaced module factory '{}'", name);
        }
    }

    /// A new instance of the module registered under `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Box<dyn Module>> {
        self.factories.get(name).map(|factory| factory())
    }

    /// True if `name` is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Registered names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }

    /// Instances of every registered module, in name order.
    #[must_use]
    pub fn all(&self) -> Vec<Box<dyn Module>> {
        self.factories.values().map(|factory| factory()).collect()
    }

    /// Number of registered modules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.factories.len()
    }

    /// True if no module is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    /// The registered name closest to `name`, if it is close enough to be a
    /// likely typo.
    #[must_use]
    pub fn similar(&self, name: &str) -> Option<&str> {
        self.factories
            .keys()
            .map(|candidate| (candidate, strsim::jaro_winkler(name, candidate)))
            .filter(|(_, score)| *score >= MODULE_SUGGESTION_THRESHOLD)
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(candidate, _)| candidate.as_str())
    }
}
