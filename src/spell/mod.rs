//! The spell data model.
//!
//! A [`Spell`] is one dependency together with its direct dependencies as
//! reported by the external source that resolved it. Spells are grouped per
//! module inside the [`Manifest`](crate::manifest::Manifest); each module only
//! ever sees its own spell type, carried through the module contract as a
//! [`SpellEntry`].
//!
//! # Structural equality
//!
//! Deduplication on commit uses [`Equatable::equals`]. For package spells this
//! compares the *shape* of the dependency tree (child count and recursively
//! each child), not the `name`/`optional` fields of the nodes themselves:
//!
//! ```rust
//! use credo_cli::spell::{Equatable, Spell};
//!
//! let a = Spell::new("python3").with_dependency(Spell::new("libc6"));
//! let b = Spell::new("perl").with_dependency(Spell::new("zlib1g"));
//! assert!(a.equals(&b));
//! ```

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::PathBuf;

use crate::core::CredoError;
use crate::manifest::Manifest;

/// Module name of system package spells.
pub const APT_MODULE: &str = "apt";

/// Module name of URL download spells.
pub const URL_MODULE: &str = "url";

/// Dedup comparison used by [`Module::commit`](crate::modules::Module::commit).
pub trait Equatable {
    /// Returns true when `other` should be treated as the same manifest entry.
    fn equals(&self, other: &Self) -> bool;
}

/// Returns true if any entry of `entries` equals `candidate`.
pub fn contains<T: Equatable>(entries: &[T], candidate: &T) -> bool {
    entries.iter().any(|entry| entry.equals(candidate))
}

/// A node in a package dependency tree.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Spell {
    /// Identifier within the module's namespace.
    pub name: String,

    /// Soft/recommended dependency; skipped by `save`/`apply` traversal.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub optional: bool,

    /// Direct dependencies, in the order the external source reported them.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<Spell>,

    /// Dependencies resolved by other modules.
    #[serde(default, skip_serializing_if = "Manifest::is_empty")]
    pub external_dependencies: Manifest,
}

impl Spell {
    /// Create a stub spell with only a name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Create a stub for an optional dependency.
    #[must_use]
    pub fn optional(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            optional: true,
            ..Self::default()
        }
    }

    /// Append a direct dependency.
    #[must_use]
    pub fn with_dependency(mut self, dependency: Spell) -> Self {
        self.dependencies.push(dependency);
        self
    }

    /// Direct dependencies that `save`/`apply` act upon.
    pub fn required_dependencies(&self) -> impl Iterator<Item = &Spell> {
        self.dependencies.iter().filter(|dep| !dep.optional)
    }
}

impl Equatable for Spell {
    // Only the dependency tree shape is compared; names and the optional flag
    // are ignored at every level.
    fn equals(&self, other: &Self) -> bool {
        self.dependencies.len() == other.dependencies.len()
            && self.dependencies.iter().zip(&other.dependencies).all(|(a, b)| a.equals(b))
    }
}

/// A file downloaded from a URL.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlSpell {
    /// The URL to download.
    pub name: String,

    /// Where `apply` places the file. Relative paths are resolved against the
    /// project root; defaults to the file name derived from the URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,

    /// Expected SHA-256 (hex) of the downloaded file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
}

impl UrlSpell {
    /// Create a url spell without output path or checksum.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            name: url.into(),
            ..Self::default()
        }
    }

    /// Set the output path used by `apply`.
    #[must_use]
    pub fn with_output(mut self, output: impl Into<PathBuf>) -> Self {
        self.output = Some(output.into());
        self
    }

    /// Set the expected checksum.
    #[must_use]
    pub fn with_sha256(mut self, sha256: impl Into<String>) -> Self {
        self.sha256 = Some(sha256.into());
        self
    }

    /// Non-empty path segments of the URL, ignoring scheme, host, query and
    /// fragment.
    fn path_segments(&self) -> impl Iterator<Item = &str> {
        let without_query = self.name.split(['?', '#']).next().unwrap_or_default();
        let without_scheme =
            without_query.split_once("://").map_or(without_query, |(_, rest)| rest);
        without_scheme.split('/').skip(1).filter(|segment| !segment.is_empty())
    }

    /// Whether the URL path contains a `.` or `..` segment.
    #[must_use]
    pub fn has_dot_segments(&self) -> bool {
        self.path_segments().any(|segment| segment == "." || segment == "..")
    }

    /// File name the download is stored under.
    ///
    /// Uses the last path segment of the URL that is not `.` or `..`, and
    /// falls back to `download` when there is none.
    #[must_use]
    pub fn file_name(&self) -> String {
        self.path_segments()
            .filter(|segment| *segment != "." && *segment != "..")
            .last()
            .unwrap_or("download")
            .to_string()
    }

    /// Location of the download relative to the url module directory.
    ///
    /// Each URL gets its own directory named after the first 16 hex digits of
    /// the SHA-256 of the URL, so URLs ending in the same file name do not
    /// overwrite each other.
    #[must_use]
    pub fn storage_path(&self) -> PathBuf {
        let digest = hex::encode(Sha256::digest(self.name.as_bytes()));
        PathBuf::from(&digest[..16]).join(self.file_name())
    }
}

impl Equatable for UrlSpell {
    fn equals(&self, other: &Self) -> bool {
        self == other
    }
}

/// A spell tagged with the module family it belongs to.
///
/// Module operations accept a `SpellEntry` and reject variants owned by other
/// modules with [`CredoError::Converting`](crate::core::CredoError::Converting).
#[derive(Debug, Clone, PartialEq)]
pub enum SpellEntry {
    /// A system package spell.
    Apt(Spell),
    /// A url download spell.
    Url(UrlSpell),
}

impl SpellEntry {
    /// Name of the module owning this spell.
    #[must_use]
    pub const fn module(&self) -> &'static str {
        match self {
            Self::Apt(_) => APT_MODULE,
            Self::Url(_) => URL_MODULE,
        }
    }

    /// Name of the spell.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Apt(spell) => &spell.name,
            Self::Url(spell) => &spell.name,
        }
    }

    /// The package spell, or [`CredoError::Converting`] for any other variant.
    pub fn into_apt(self) -> Result<Spell, CredoError> {
        match self {
            Self::Apt(spell) => Ok(spell),
            other => Err(converting(APT_MODULE, other.module())),
        }
    }

    /// Borrowing form of [`into_apt`](Self::into_apt).
    pub fn as_apt(&self) -> Result<&Spell, CredoError> {
        match self {
            Self::Apt(spell) => Ok(spell),
            other => Err(converting(APT_MODULE, other.module())),
        }
    }

    /// The url spell, or [`CredoError::Converting`] for any other variant.
    pub fn into_url(self) -> Result<UrlSpell, CredoError> {
        match self {
            Self::Url(spell) => Ok(spell),
            other => Err(converting(URL_MODULE, other.module())),
        }
    }

    /// Borrowing form of [`into_url`](Self::into_url).
    pub fn as_url(&self) -> Result<&UrlSpell, CredoError> {
        match self {
            Self::Url(spell) => Ok(spell),
            other => Err(converting(URL_MODULE, other.module())),
        }
    }
}

fn converting(expected: &str, found: &str) -> CredoError {
    CredoError::Converting {
        expected: expected.to_string(),
        found: found.to_string(),
    }
}

impl From<Spell> for SpellEntry {
    fn from(spell: Spell) -> Self {
        Self::Apt(spell)
    }
}

impl From<UrlSpell> for SpellEntry {
    fn from(spell: UrlSpell) -> Self {
        Self::Url(spell)
    }
}

impl fmt::Display for SpellEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.module(), self.name())
    }
}
