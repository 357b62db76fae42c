//! System package access through `apt-get` and `apt-cache`.
//!
//! The apt module never shells out directly; it talks to an [`AptClient`]. The
//! production implementation, [`SystemApt`], runs the apt binaries through
//! [`AptCommand`](command_builder::AptCommand). Tests substitute a mock that
//! records calls.
//!
//! # Operations
//!
//! | Method | Command |
//! |---|---|
//! | [`check_for_updates`](AptClient::check_for_updates) | `apt-get update` |
//! | [`install_dry`](AptClient::install_dry) | `apt-get install --dry-run -y <name>` |
//! | [`get_dependencies`](AptClient::get_dependencies) | `apt-cache depends <name>` |
//! | [`download`](AptClient::download) | `apt-get download <name>` (in the destination) |
//! | [`install`](AptClient::install) | `apt-get install -y <deb>` |

pub mod command_builder;

use anyhow::Result;
use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;

use crate::core::CredoError;
use command_builder::AptCommand;

/// Interface to the system package manager.
#[async_trait]
pub trait AptClient: Send + Sync {
    /// Refresh the package index. Returns whether anything changed.
    async fn check_for_updates(&self) -> Result<bool>;

    /// Simulate installing `name`; returns the raw simulation output.
    async fn install_dry(&self, name: &str) -> Result<String>;

    /// Direct dependency descriptors of `name`, in reported order.
    ///
    /// Descriptors wrapped in angle brackets (`<name>`) denote dependencies
    /// the caller treats as optional.
    async fn get_dependencies(&self, name: &str) -> Result<Vec<String>>;

    /// Download the `.deb` of `name` into `dest`; returns the command output.
    async fn download(&self, name: &str, dest: &Path) -> Result<String>;

    /// Install `target` (a package name or a `.deb` path); returns the output.
    async fn install(&self, target: &str) -> Result<String>;
}

/// [`AptClient`] backed by the host's apt binaries.
#[derive(Debug, Clone)]
pub struct SystemApt {
    timeout: Option<Duration>,
}

impl Default for SystemApt {
    fn default() -> Self {
        Self {
            timeout: Some(crate::constants::DEFAULT_COMMAND_TIMEOUT),
        }
    }
}

impl SystemApt {
    /// Create a client using the default command timeout.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the per-command timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Fail with [`CredoError::AptNotFound`] unless both apt binaries are in PATH.
    pub fn ensure_available() -> Result<()> {
        if which::which("apt-get").is_err() || which::which("apt-cache").is_err() {
            return Err(CredoError::AptNotFound.into());
        }
        Ok(())
    }

    async fn run(&self, command: AptCommand, context: &str) -> Result<String> {
        Self::ensure_available()?;
        let output = command.with_timeout(self.timeout).with_context(context).execute().await?;
        Ok(output.stdout)
    }
}

#[async_trait]
impl AptClient for SystemApt {
    async fn check_for_updates(&self) -> Result<bool> {
        let output = self.run(AptCommand::update(), "update").await?;
        Ok(index_changed(&output))
    }

    async fn install_dry(&self, name: &str) -> Result<String> {
        self.run(AptCommand::install_dry(name), name).await
    }

    async fn get_dependencies(&self, name: &str) -> Result<Vec<String>> {
        let output = self.run(AptCommand::depends(name), name).await?;
        Ok(parse_depends(&output))
    }

    async fn download(&self, name: &str, dest: &Path) -> Result<String> {
        self.run(AptCommand::download(name, dest), name).await
    }

    async fn install(&self, target: &str) -> Result<String> {
        self.run(AptCommand::install(target), target).await
    }
}

/// Whether `apt-get update` output reports a fetched index (`Get:` lines).
#[must_use]
pub fn index_changed(update_output: &str) -> bool {
    update_output.lines().any(|line| line.trim_start().starts_with("Get:"))
}

/// Extract direct dependency descriptors from `apt-cache depends` output.
///
/// Keeps `Depends:` and `PreDepends:` lines (including `|` alternatives), in
/// order, without duplicates. Recommends/Suggests/Conflicts and the indented
/// provider lines below virtual packages are ignored.
///
/// ```rust
/// use credo_cli::apt::parse_depends;
///
/// let output = "python3\n  PreDepends: python3-minimal\n  \
///               Depends: <python3:any>\n  Suggests: python3-doc\n";
/// assert_eq!(parse_depends(output), vec!["python3-minimal", "<python3:any>"]);
/// ```
#[must_use]
pub fn parse_depends(output: &str) -> Vec<String> {
    let mut deps: Vec<String> = Vec::new();
    for line in output.lines() {
        let line = line.trim().trim_start_matches('|');
        let Some((kind, descriptor)) = line.split_once(':') else {
            continue;
        };
        if kind != "Depends" && kind != "PreDepends" {
            continue;
        }
        let descriptor = descriptor.trim();
        if descriptor.is_empty() || deps.iter().any(|d| d == descriptor) {
            continue;
        }
        deps.push(descriptor.to_string());
    }
    deps
}

#[cfg(test)]
mod tests {
    use super::*;

    const PYTHON3_DEPENDS: &str = "\
python3
  PreDepends: python3-minimal
  Depends: python3.12
  Depends: libpython3-stdlib
  Depends: <python3:any>
    python3
 |Depends: media-types
  Depends: python3.12
  Suggests: python3-doc
  Suggests: python3-tk
  Replaces: python3-minimal
";

    #[test]
    fn test_parse_depends_keeps_order_and_dedups() {
        assert_eq!(
            parse_depends(PYTHON3_DEPENDS),
            vec![
                "python3-minimal",
                "python3.12",
                "libpython3-stdlib",
                "<python3:any>",
                "media-types",
            ]
        );
    }

    #[test]
    fn test_parse_depends_empty_output() {
        assert!(parse_depends("").is_empty());
        assert!(parse_depends("libc6\n").is_empty());
    }

    #[test]
    fn test_index_changed() {
        let unchanged =
            "Hit:1 http://deb.debian.org/debian bookworm InRelease\nReading package lists...";
        assert!(!index_changed(unchanged));

        let changed = "Hit:1 http://deb.debian.org/debian bookworm InRelease\n\
                       Get:2 http://deb.debian.org/debian bookworm-updates InRelease [55.4 kB]\n";
        assert!(index_changed(changed));
    }
}
