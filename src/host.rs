//! Host operating system identity.
//!
//! Modules decide whether they can run on the current machine from the
//! distribution id and its `ID_LIKE` family, read from `/etc/os-release`.

use anyhow::{Context, Result};
use std::path::Path;

/// Standard location of the os-release file.
pub const OS_RELEASE_PATH: &str = "/etc/os-release";

/// Fallback location used by some minimal images.
pub const OS_RELEASE_FALLBACK_PATH: &str = "/usr/lib/os-release";

/// Distribution id plus the ids it declares itself similar to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostInfo {
    /// `ID` (e.g. `ubuntu`), lowercased
    pub distribution: String,
    /// `ID_LIKE` entries (e.g. `["debian"]`), lowercased
    pub like: Vec<String>,
}

impl HostInfo {
    /// Build a host identity by hand.
    pub fn new<I, S>(distribution: impl Into<String>, like: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            distribution: distribution.into(),
            like: like.into_iter().map(Into::into).collect(),
        }
    }

    /// Detect the running host.
    ///
    /// Non-Linux hosts (or Linux hosts without an os-release file) yield the
    /// value of `std::env::consts::OS` as the distribution and no family.
    pub fn detect() -> Result<Self> {
        for candidate in [OS_RELEASE_PATH, OS_RELEASE_FALLBACK_PATH] {
            let path = Path::new(candidate);
            if path.exists() {
                return Self::from_file(path);
            }
        }
        tracing::debug!("No os-release file found, using {}", std::env::consts::OS);
        Ok(Self::new(std::env::consts::OS, Vec::<String>::new()))
    }

    /// Read and parse an os-release file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Ok(parse_os_release(&content))
    }

    /// True if the distribution or any of its family matches one of `ids`.
    #[must_use]
    pub fn is_like_any(&self, ids: &[&str]) -> bool {
        ids.iter().any(|id| self.distribution == *id || self.like.iter().any(|like| like == id))
    }
}

/// Parse the `ID` and `ID_LIKE` keys of an os-release file.
#[must_use]
pub fn parse_os_release(content: &str) -> HostInfo {
    let mut info = HostInfo::default();
    for line in content.lines() {
        let Some((key, value)) = line.trim().split_once('=') else {
            continue;
        };
        let value = value.trim().trim_matches(|c| c == '"' || c == '\'').to_lowercase();
        match key.trim() {
            "ID" => info.distribution = value,
            "ID_LIKE" => info.like = value.split_whitespace().map(str::to_string).collect(),
            _ => {}
        }
    }
    info
}
