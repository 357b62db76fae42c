//! In-process stand-ins for the external sources.

use anyhow::Result;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use crate::apt::AptClient;
use crate::core::CredoError;
use crate::download::Downloader;

/// [`AptClient`] answering from an in-memory package table.
///
/// Every call is counted. `check_for_updates` also records how many refreshes
/// ran at the same time, so tests can assert the refresh lock works.
#[derive(Debug, Default)]
pub struct MockAptClient {
    packages: HashMap<String, Vec<String>>,
    fail_update: bool,
    fail_download: HashSet<String>,
    fail_install: HashSet<String>,
    update_delay: Option<Duration>,

    updates: AtomicUsize,
    dry_runs: AtomicUsize,
    depends: AtomicUsize,
    downloads: AtomicUsize,
    installs: AtomicUsize,
    active_updates: AtomicUsize,
    max_active_updates: AtomicUsize,
    index_fetched: AtomicBool,
    downloaded: Mutex<Vec<String>>,
    installed: Mutex<Vec<String>>,
}

impl MockAptClient {
    /// A client that knows no packages.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `name` installable with the given raw dependency descriptors.
    #[must_use]
    pub fn with_package(mut self, name: &str, deps: &[&str]) -> Self {
        self.packages.insert(name.to_string(), deps.iter().map(|d| (*d).to_string()).collect());
        self
    }

    /// Make every refresh fail.
    #[must_use]
    pub fn fail_update(mut self) -> Self {
        self.fail_update = true;
        self
    }

    /// Make downloading `name` fail.
    #[must_use]
    pub fn fail_download(mut self, name: &str) -> Self {
        self.fail_download.insert(name.to_string());
        self
    }

    /// Make installing `name` (or any archive of it) fail.
    #[must_use]
    pub fn fail_install(mut self, name: &str) -> Self {
        self.fail_install.insert(name.to_string());
        self
    }

    /// Hold each refresh for `delay`.
    #[must_use]
    pub const fn with_update_delay(mut self, delay: Duration) -> Self {
        self.update_delay = Some(delay);
        self
    }

    /// Number of `check_for_updates` calls.
    pub fn update_calls(&self) -> usize {
        self.updates.load(Ordering::SeqCst)
    }

    /// Number of `get_dependencies` calls.
    pub fn depends_calls(&self) -> usize {
        self.depends.load(Ordering::SeqCst)
    }

    /// Number of `download` calls.
    pub fn download_calls(&self) -> usize {
        self.downloads.load(Ordering::SeqCst)
    }

    /// Number of `install` calls, failed ones included.
    pub fn install_calls(&self) -> usize {
        self.installs.load(Ordering::SeqCst)
    }

    /// Number of calls of any kind.
    pub fn total_calls(&self) -> usize {
        self.update_calls()
            + self.dry_runs.load(Ordering::SeqCst)
            + self.depends_calls()
            + self.download_calls()
            + self.install_calls()
    }

    /// Highest number of refreshes observed running at once.
    pub fn max_concurrent_updates(&self) -> usize {
        self.max_active_updates.load(Ordering::SeqCst)
    }

    /// Names successfully downloaded, in call order.
    pub fn downloaded(&self) -> Vec<String> {
        self.downloaded.lock().map(|v| v.clone()).unwrap_or_default()
    }

    /// Targets successfully installed, in call order.
    pub fn installed(&self) -> Vec<String> {
        self.installed.lock().map(|v| v.clone()).unwrap_or_default()
    }

    fn unknown(operation: &str, name: &str) -> anyhow::Error {
        CredoError::AptCommandError {
            operation: operation.to_string(),
            stderr: format!("E: Unable to locate package {name}"),
        }
        .into()
    }
}

#[async_trait]
impl AptClient for MockAptClient {
    async fn check_for_updates(&self) -> Result<bool> {
        self.updates.fetch_add(1, Ordering::SeqCst);
        let active = self.active_updates.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active_updates.fetch_max(active, Ordering::SeqCst);

        if let Some(delay) = self.update_delay {
            tokio::time::sleep(delay).await;
        }
        self.active_updates.fetch_sub(1, Ordering::SeqCst);

        if self.fail_update {
            return Err(CredoError::AptCommandError {
                operation: "update".to_string(),
                stderr: "E: Could not resolve 'deb.debian.org'".to_string(),
            }
            .into());
        }
        // Only the first refresh fetches anything
        Ok(!self.index_fetched.swap(true, Ordering::SeqCst))
    }

    async fn install_dry(&self, name: &str) -> Result<String> {
        self.dry_runs.fetch_add(1, Ordering::SeqCst);
        if !self.packages.contains_key(name) {
            return Err(Self::unknown("install", name));
        }
        Ok(format!(
            "Inst {name} (1.0 Debian:stable [amd64])\nConf {name} (1.0 Debian:stable [amd64])"
        ))
    }

    async fn get_dependencies(&self, name: &str) -> Result<Vec<String>> {
        self.depends.fetch_add(1, Ordering::SeqCst);
        self.packages.get(name).cloned().ok_or_else(|| Self::unknown("depends", name))
    }

    async fn download(&self, name: &str, dest: &Path) -> Result<String> {
        self.downloads.fetch_add(1, Ordering::SeqCst);
        if self.fail_download.contains(name) {
            return Err(Self::unknown("download", name));
        }
        let file_name = format!("{name}_1.0_amd64.deb");
        tokio::fs::write(dest.join(&file_name), b"!<arch>\n").await?;
        if let Ok(mut downloaded) = self.downloaded.lock() {
            downloaded.push(name.to_string());
        }
        Ok(format!("Get:1 http://deb.debian.org/debian stable/main amd64 {name} amd64 1.0"))
    }

    async fn install(&self, target: &str) -> Result<String> {
        self.installs.fetch_add(1, Ordering::SeqCst);
        let package = Path::new(target)
            .file_name()
            .and_then(|f| f.to_str())
            .map_or(target, |f| f.split('_').next().unwrap_or(f));
        if self.fail_install.contains(package) {
            return Err(CredoError::AptCommandError {
                operation: "install".to_string(),
                stderr: format!(
                    "E: Sub-process /usr/bin/dpkg returned an error code (1) for {package}"
                ),
            }
            .into());
        }
        if let Ok(mut installed) = self.installed.lock() {
            installed.push(target.to_string());
        }
        Ok(format!("Setting up {package} (1.0) ..."))
    }
}

/// [`Downloader`] serving fixed content per URL.
#[derive(Debug, Default)]
pub struct MockDownloader {
    files: HashMap<String, Vec<u8>>,
    requested: Mutex<Vec<String>>,
}

impl MockDownloader {
    /// A downloader that knows no URLs.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `content` for `url`.
    #[must_use]
    pub fn with_file(mut self, url: &str, content: &[u8]) -> Self {
        self.files.insert(url.to_string(), content.to_vec());
        self
    }

    /// Number of download calls.
    pub fn calls(&self) -> usize {
        self.requested().len()
    }

    /// URLs requested, in call order.
    pub fn requested(&self) -> Vec<String> {
        self.requested.lock().map(|v| v.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Downloader for MockDownloader {
    async fn download(&self, url: &str, dest: &Path) -> Result<u64> {
        if let Ok(mut requested) = self.requested.lock() {
            requested.push(url.to_string());
        }
        let content = self.files.get(url).ok_or_else(|| CredoError::DownloadFailed {
            url: url.to_string(),
            reason: "HTTP 404 Not Found".to_string(),
        })?;
        tokio::fs::write(dest, content).await?;
        Ok(content.len() as u64)
    }
}
