//! Memoization store for resolutions and materializations.
//!
//! Resolving a dependency means asking an external package manager for its
//! dependency list, which is slow and takes locks on shared system state. The
//! [`SpellCache`] remembers, per `(module, item)` key:
//!
//! - the **resolved value** produced by a module (an opaque JSON value, typed at
//!   the module boundary with serde), read before any external query, and
//! - the **saved locations**, the places the item's artifact has been
//!   downloaded to. One cache serves every project of a user, so a marker only
//!   counts for the location it was recorded with.
//!
//! Entries are never invalidated: the cache is trusted for the process lifetime
//! and, when opened on a directory, across invocations.
//!
//! # Persistence
//!
//! [`SpellCache::open`] loads `{cache_dir}/spells.json` and writes every insert
//! through to it. Writes inside one process are serialized with an async mutex
//! and across processes with a [`CacheLock`].
//!
//! ```rust,no_run
//! use credo_cli::cache::SpellCache;
//! use credo_cli::spell::Spell;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let cache = SpellCache::open(&std::path::PathBuf::from("/tmp/credo"))?;
//! cache.insert("apt", "curl", &Spell::new("curl")).await?;
//! let hit: Option<Spell> = cache.retrieve("apt", "curl");
//! assert!(hit.is_some());
//! # Ok(())
//! # }
//! ```

pub mod lock;

pub use lock::CacheLock;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

use crate::constants::CACHE_FILE_NAME;
use crate::utils::fs::{atomic_write, ensure_dir};

/// Cache key: `(module name, item name)`.
pub type CacheKey = (String, String);

/// Everything remembered about one `(module, item)` key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheRecord {
    /// Module-defined resolution result.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved: Option<serde_json::Value>,

    /// Where the item's artifact has been saved.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub saved_in: BTreeSet<PathBuf>,

    /// Last time the record changed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// On-disk shape of one record.
#[derive(Debug, Serialize, Deserialize)]
struct PersistedEntry {
    module: String,
    item: String,
    #[serde(flatten)]
    record: CacheRecord,
}

/// `(module, item)`-keyed memoization store.
#[derive(Debug)]
pub struct SpellCache {
    entries: DashMap<CacheKey, CacheRecord>,
    /// Directory holding the cache file; `None` for an in-memory cache.
    dir: Option<PathBuf>,
    write_guard: Mutex<()>,
}

impl Default for SpellCache {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl SpellCache {
    /// A cache that lives only as long as the process.
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            entries: DashMap::new(),
            dir: None,
            write_guard: Mutex::new(()),
        }
    }

    /// Open (or create) a durable cache in `dir`.
    ///
    /// An unreadable or corrupt cache file is logged and ignored; the cache then
    /// starts empty and overwrites it on the next insert.
    pub fn open(dir: &Path) -> Result<Self> {
        ensure_dir(dir)?;
        let cache = Self {
            entries: DashMap::new(),
            dir: Some(dir.to_path_buf()),
            write_guard: Mutex::new(()),
        };

        let path = dir.join(CACHE_FILE_NAME);
        if path.exists() {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read cache file: {}", path.display()))?;
            match serde_json::from_str::<Vec<PersistedEntry>>(&content) {
                Ok(persisted) => {
                    for entry in persisted {
                        cache.entries.insert((entry.module, entry.item), entry.record);
                    }
                    tracing::debug!(
                        target: "cache",
                        "Loaded {} entries from {}",
                        cache.entries.len(),
                        path.display()
                    );
                }
                Err(e) => {
                    tracing::warn!(
                        target: "cache",
                        "Ignoring corrupt cache file {}: {}",
                        path.display(),
                        e
                    );
                }
            }
        }

        Ok(cache)
    }

    /// Previously stored resolution for `(module, item)`.
    ///
    /// Returns `None` when absent or when the stored value does not
    /// deserialize as `T`.
    #[must_use]
    pub fn retrieve<T: DeserializeOwned>(&self, module: &str, item: &str) -> Option<T> {
        let value = self
            .entries
            .get(&(module.to_string(), item.to_string()))
            .and_then(|record| record.resolved.clone())?;

        match serde_json::from_value(value) {
            Ok(typed) => {
                tracing::debug!(target: "cache", "Cache hit for {module}/{item}");
                Some(typed)
            }
            Err(e) => {
                tracing::debug!(
                    target: "cache",
                    "Cached value for {module}/{item} has an unexpected shape: {e}"
                );
                None
            }
        }
    }

    /// Store the resolution for `(module, item)`.
    pub async fn insert<T: Serialize>(&self, module: &str, item: &str, value: &T) -> Result<()> {
        let value = serde_json::to_value(value)
            .with_context(|| format!("Failed to serialize cache value for {module}/{item}"))?;
        {
            let mut record =
                self.entries.entry((module.to_string(), item.to_string())).or_default();
            record.resolved = Some(value);
            record.updated_at = Some(Utc::now());
        }
        self.persist().await
    }

    /// Whether `(module, item)` has been saved to `location` before.
    #[must_use]
    pub fn is_saved(&self, module: &str, item: &str, location: &Path) -> bool {
        self.entries
            .get(&(module.to_string(), item.to_string()))
            .is_some_and(|record| record.saved_in.contains(location))
    }

    /// Record that `(module, item)` has been saved to `location`.
    pub async fn mark_saved(&self, module: &str, item: &str, location: &Path) -> Result<()> {
        {
            let mut record =
                self.entries.entry((module.to_string(), item.to_string())).or_default();
            record.saved_in.insert(location.to_path_buf());
            record.updated_at = Some(Utc::now());
        }
        self.persist().await
    }

    /// Number of keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if no key is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    async fn persist(&self) -> Result<()> {
        let Some(dir) = &self.dir else {
            return Ok(());
        };

        let _guard = self.write_guard.lock().await;
        let _lock = CacheLock::acquire(dir, "spells").await?;

        let mut persisted: Vec<PersistedEntry> = self
            .entries
            .iter()
            .map(|entry| PersistedEntry {
                module: entry.key().0.clone(),
                item: entry.key().1.clone(),
                record: entry.value().clone(),
            })
            .collect();
        persisted.sort_by(|a, b| (&a.module, &a.item).cmp(&(&b.module, &b.item)));

        let content =
            serde_json::to_vec_pretty(&persisted).context("Failed to serialize spell cache")?;
        let path = dir.join(CACHE_FILE_NAME);
        atomic_write(&path, &content)?;

        tracing::trace!(target: "cache", "Wrote {} entries to {}", persisted.len(), path.display());
        Ok(())
    }
}
